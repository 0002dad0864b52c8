use tracing::debug;

use crate::coordinator::CoordinatorState;
use crate::sensors::Sensor;
use crate::state::{PersistedState, SensorValue};

/// Fill level as a 0-100 percentage.
pub struct FillLevelPercentSensor {
    hwid: String,
    value: Option<i64>,
}

impl FillLevelPercentSensor {
    pub fn new(hwid: &str) -> Self {
        Self {
            hwid: hwid.to_string(),
            value: None,
        }
    }
}

impl Sensor for FillLevelPercentSensor {
    fn metric(&self) -> &'static str {
        "fillLevelPercent"
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
                debug!(value = v, "Restored value for fillLevelPercent");
            }
            SensorValue::None => self.value = None,
            other => {
                self.value = None;
                debug!(?other, "Invalid stored value for fillLevelPercent");
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

        match state.get_data(&self.hwid).and_then(|d| d.fill_level_percent) {
            None => {
                self.value = None;
                debug!("Data for fillLevelPercent not available");
            }
            Some(percent) => {
                self.value = Some(percent);
                debug!(hwid = %self.hwid, value = percent, "Update fillLevelPercent");
            }
        }
    }
}
