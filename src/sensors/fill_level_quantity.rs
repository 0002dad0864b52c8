use tracing::debug;

use crate::coordinator::CoordinatorState;
use crate::sensors::Sensor;
use crate::state::{PersistedState, SensorValue};

/// Absolute fill quantity in the device's native unit ("l" or "kg").
pub struct FillLevelQuantitySensor {
    hwid: String,
    value: Option<i64>,
}

impl FillLevelQuantitySensor {
    pub fn new(hwid: &str) -> Self {
        Self {
            hwid: hwid.to_string(),
            value: None,
        }
    }
}

impl Sensor for FillLevelQuantitySensor {
    fn metric(&self) -> &'static str {
        "fillLevelQuantity"
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
                debug!(value = v, "Restored value for fillLevelQuantity");
            }
            SensorValue::None => self.value = None,
            other => {
                self.value = None;
                debug!(?other, "Invalid stored value for fillLevelQuantity");
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

        match state.get_data(&self.hwid).and_then(|d| d.fill_level_quantity) {
            None => {
                self.value = None;
                debug!("Data for fillLevelQuantity not available");
            }
            Some(quantity) => {
                self.value = Some(quantity);
                debug!(
                    hwid = %self.hwid,
                    value = quantity,
                    "Update fillLevelQuantity"
                );
            }
        }
    }
}
