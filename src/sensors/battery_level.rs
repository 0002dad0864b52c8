use tracing::debug;

use crate::coordinator::CoordinatorState;
use crate::sensors::Sensor;
use crate::state::{PersistedState, SensorValue};

/// Battery charge as a percentage, mapped from the device's coarse level code.
pub struct BatteryLevelSensor {
    hwid: String,
    value: Option<i64>,
}

/// Strict table: an unknown code is a failed mapping, not a passthrough.
fn battery_mapping(code: &str) -> Option<i64> {
    match code {
        "FULL" => Some(100),
        "GOOD" => Some(70),
        "MEDIUM" => Some(50),
        "WARNING" => Some(20),
        "CRITICAL" => Some(0),
        _ => None,
    }
}

impl BatteryLevelSensor {
    pub fn new(hwid: &str) -> Self {
        Self {
            hwid: hwid.to_string(),
            value: None,
        }
    }
}

impl Sensor for BatteryLevelSensor {
    fn metric(&self) -> &'static str {
        "batteryLevel"
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
                debug!(value = v, "Restored value for batteryLevel");
            }
            SensorValue::None => self.value = None,
            other => {
                self.value = None;
                debug!(?other, "Invalid stored value for batteryLevel");
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

        let code = state
            .get_data(&self.hwid)
            .and_then(|d| d.battery_level.clone());
        match code {
            None => {
                self.value = None;
                debug!("Data for batteryLevel not available");
            }
            Some(code) => match battery_mapping(&code) {
                Some(percent) => {
                    self.value = Some(percent);
                    debug!(hwid = %self.hwid, value = percent, "Update batteryLevel");
                }
                None => {
                    // Unknown code: leave the displayed value alone.
                    debug!(hwid = %self.hwid, code, "Invalid value for batteryLevel");
                }
            },
        }
    }
}
