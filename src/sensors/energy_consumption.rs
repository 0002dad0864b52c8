use tracing::debug;

use crate::coordinator::CoordinatorState;
use crate::sensors::Sensor;
use crate::state::{PersistedState, SensorValue};

/// Calorific value of extra-light heating oil. Applied to the raw quantity
/// delta even when the device reports in kg, so totals stay comparable with
/// previously recorded values.
pub const KWH_PER_L_HEATING_OIL_EXTRA_LIGHT: f64 = 10.08;

/// Cumulative energy equivalent of the consumed material, in kWh.
pub struct EnergyConsumptionSensor {
    hwid: String,
    value: Option<f64>,
    previous_value: i64,
    current_value: i64,
}

impl EnergyConsumptionSensor {
    pub fn new(hwid: &str) -> Self {
        Self {
            hwid: hwid.to_string(),
            value: None,
            previous_value: 0,
            current_value: 0,
        }
    }
}

impl Sensor for EnergyConsumptionSensor {
    fn metric(&self) -> &'static str {
        "energyConsumption"
    }

    fn hwid(&self) -> &str {
        &self.hwid
    }

    fn value(&self) -> SensorValue {
        match self.value {
            Some(v) => SensorValue::Number(v),
            None => SensorValue::None,
        }
    }

    /// See MaterialConsumptionSensor: running totals ignore outages.
    fn available(&self, _state: &CoordinatorState) -> bool {
        true
    }

    fn restore(&mut self, stored: PersistedState) {
        match stored.value {
            SensorValue::Number(v) => {
                self.value = Some(v);
                debug!(value = v, "Restored value for energyConsumption");
            }
            SensorValue::None => self.value = None,
            other => {
                self.value = None;
                debug!(?other, "Invalid stored value for energyConsumption");
            }
        }
        self.previous_value = stored.previous_value.unwrap_or(0);
        self.current_value = stored.current_value.unwrap_or(0);
    }

    fn persisted(&self) -> PersistedState {
        PersistedState {
            value: self.value(),
            previous_value: Some(self.previous_value),
            current_value: Some(self.current_value),
        }
    }

    fn handle_update(&mut self, state: &CoordinatorState) {
        if !state.needs_update(&self.hwid) {
            return;
        }

        match state.get_data(&self.hwid).and_then(|d| d.fill_level_quantity) {
            None => {
                self.value = Some(0.0);
                debug!("Data for energyConsumption not available");
            }
            Some(quantity) => {
                self.previous_value = self.current_value;
                self.current_value = quantity;

                let mut total = self.value.unwrap_or(0.0);
                if self.previous_value > self.current_value {
                    let diff = (self.previous_value - self.current_value) as f64;
                    total += KWH_PER_L_HEATING_OIL_EXTRA_LIGHT * diff;
                }
                self.value = Some(total);

                debug!(hwid = %self.hwid, value = total, "Update energyConsumption");
            }
        }
    }
}
