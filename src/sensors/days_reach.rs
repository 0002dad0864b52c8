use tracing::debug;

use crate::coordinator::CoordinatorState;
use crate::sensors::Sensor;
use crate::state::{PersistedState, SensorValue};

/// Estimated days of supply remaining.
pub struct DaysReachSensor {
    hwid: String,
    value: Option<i64>,
}

impl DaysReachSensor {
    pub fn new(hwid: &str) -> Self {
        Self {
            hwid: hwid.to_string(),
            value: None,
        }
    }
}

impl Sensor for DaysReachSensor {
    fn metric(&self) -> &'static str {
        "daysReach"
    }

    fn hwid(&self) -> &str {
        &self.hwid
    }

    fn value(&self) -> SensorValue {
        match self.value {
            Some(v) => SensorValue::Integer(v),
            None => SensorValue::None,
        }
    }

    fn restore(&mut self, stored: PersistedState) {
        match stored.value {
            SensorValue::Integer(v) => {
                self.value = Some(v);
                debug!(value = v, "Restored value for daysReach");
            }
            SensorValue::None => self.value = None,
            other => {
                self.value = None;
                debug!(?other, "Invalid stored value for daysReach");
            }
        }
    }

    fn persisted(&self) -> PersistedState {
        PersistedState {
            value: self.value(),
            ..Default::default()
        }
    }

    fn handle_update(&mut self, state: &CoordinatorState) {
        if !state.needs_update(&self.hwid) {
            return;
        }

        match state.get_data(&self.hwid).and_then(|d| d.days_reach) {
            None => {
                self.value = None;
                debug!("Data for daysReach not available");
            }
            Some(days) => {
                self.value = Some(days);
                debug!(hwid = %self.hwid, value = days, "Update daysReach");
            }
        }
    }
}
