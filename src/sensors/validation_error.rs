use tracing::debug;

use crate::coordinator::CoordinatorState;
use crate::sensors::Sensor;
use crate::state::{PersistedState, SensorValue};

/// Human-readable validation status of the last metering.
pub struct ValidationErrorSensor {
    hwid: String,
    value: Option<String>,
}

const NO_ERROR: &str = "No error";

/// Codes not in this table are displayed verbatim, so new upstream codes
/// surface instead of being rejected.
fn validation_error_mapping(code: &str) -> Option<&'static str> {
    match code {
        "NO_ERROR" => Some(NO_ERROR),
        "NO_METERING" => Some("No measurement yet"),
        "EMPTY_METERING" => Some("Incorrect Measurement"),
        "NO_EXTRACTED_VALUE" => Some("No fill level detected"),
        "SENSOR_CONFIG" => Some("Faulty measurement"),
        "MISSING_STORAGE_CONFIG" => Some("Storage configuration missing"),
        "INVALID_STORAGE_CONFIG" => Some("Incorrect storage configuration"),
        "DISTANCE_TOO_SHORT" => Some("Measured distance too small"),
        "ABOVE_STORAGE_MAX" => Some("Storage full"),
        "BELOW_STORAGE_MIN" => Some("Calculated filling level implausible"),
        _ => None,
    }
}

impl ValidationErrorSensor {
    pub fn new(hwid: &str) -> Self {
        Self {
            hwid: hwid.to_string(),
            value: None,
        }
    }
}

impl Sensor for ValidationErrorSensor {
    fn metric(&self) -> &'static str {
        "validationError"
    }

    fn hwid(&self) -> &str {
        &self.hwid
    }

    fn value(&self) -> SensorValue {
        match &self.value {
            Some(text) => SensorValue::Text(text.clone()),
            None => SensorValue::None,
        }
    }

    fn restore(&mut self, stored: PersistedState) {
        match stored.value {
            SensorValue::Text(text) => {
                debug!(value = %text, "Restored value for validationError");
                self.value = Some(text);
            }
            SensorValue::None => self.value = None,
            other => {
                self.value = None;
                debug!(?other, "Invalid stored value for validationError");
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
            .and_then(|d| d.validation_error.clone());
        match code {
            None => {
                // No validation error reported means the metering was fine.
                self.value = Some(NO_ERROR.to_string());
                debug!("Data for validationError not available");
            }
            Some(code) => match validation_error_mapping(&code) {
                Some(text) => {
                    self.value = Some(text.to_string());
                    debug!(hwid = %self.hwid, value = text, "Update validationError");
                }
                None => {
                    debug!(hwid = %self.hwid, code, "Unknown value for validationError");
                    self.value = Some(code);
                }
            },
        }
    }
}
