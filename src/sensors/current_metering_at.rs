use chrono::{DateTime, FixedOffset};
use tracing::debug;

use crate::coordinator::CoordinatorState;
use crate::sensors::Sensor;
use crate::state::{PersistedState, SensorValue};

/// Timestamp of the last metering reported by the device.
pub struct CurrentMeteringAtSensor {
    hwid: String,
    value: Option<DateTime<FixedOffset>>,
}

impl CurrentMeteringAtSensor {
    pub fn new(hwid: &str) -> Self {
        Self {
            hwid: hwid.to_string(),
            value: None,
        }
    }
}

impl Sensor for CurrentMeteringAtSensor {
    fn metric(&self) -> &'static str {
        "lastMeasurement"
    }

    fn hwid(&self) -> &str {
        &self.hwid
    }

    fn value(&self) -> SensorValue {
        match self.value {
            Some(ts) => SensorValue::Timestamp(ts),
            None => SensorValue::None,
        }
    }

    fn restore(&mut self, stored: PersistedState) {
        match stored.value {
            SensorValue::Timestamp(ts) => {
                self.value = Some(ts);
                debug!(value = %ts, "Restored value for currentMeteringAt");
            }
            SensorValue::None => self.value = None,
            other => {
                self.value = None;
                debug!(?other, "Invalid stored value for currentMeteringAt");
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

        let raw = state
            .get_data(&self.hwid)
            .and_then(|d| d.current_metering_at.clone());
        match raw {
            None => {
                self.value = None;
                debug!("Data for currentMeteringAt not available");
            }
            Some(raw) => match DateTime::parse_from_rfc3339(&raw) {
                Ok(ts) => {
                    self.value = Some(ts);
                    debug!(hwid = %self.hwid, value = %ts, "Update currentMeteringAt");
                }
                Err(e) => {
                    debug!(hwid = %self.hwid, raw, %e, "Invalid value for currentMeteringAt");
                }
            },
        }
    }
}
