use tracing::debug;

use crate::coordinator::CoordinatorState;
use crate::sensors::Sensor;
use crate::state::{PersistedState, SensorValue};

/// Cumulative consumption of the stored material, derived from drops in the
/// fill quantity. A rise is a refill and never subtracts from the total.
pub struct MaterialConsumptionSensor {
    hwid: String,
    value: Option<i64>,
    previous_value: i64,
    current_value: i64,
}

impl MaterialConsumptionSensor {
    pub fn new(hwid: &str) -> Self {
        Self {
            hwid: hwid.to_string(),
            value: None,
            previous_value: 0,
            current_value: 0,
        }
    }
}

impl Sensor for MaterialConsumptionSensor {
    fn metric(&self) -> &'static str {
        "materialConsumption"
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

    /// The running total must never appear to reset or go stale on a
    /// transient fetch failure.
    fn available(&self, _state: &CoordinatorState) -> bool {
        true
    }

    fn restore(&mut self, stored: PersistedState) {
        match stored.value {
            SensorValue::Integer(v) => {
                self.value = Some(v);
                debug!(value = v, "Restored value for materialConsumption");
            }
            SensorValue::None => self.value = None,
            other => {
                self.value = None;
                debug!(?other, "Invalid stored value for materialConsumption");
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
                self.value = Some(0);
                debug!("Data for materialConsumption not available");
            }
            Some(quantity) => {
                self.previous_value = self.current_value;
                self.current_value = quantity;

                let mut total = self.value.unwrap_or(0);
                if self.previous_value > self.current_value {
                    total += self.previous_value - self.current_value;
                }
                self.value = Some(total);

                debug!(hwid = %self.hwid, value = total, "Update materialConsumption");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::testutil::{coordinator, metered_device, TestCoordinator};

    async fn accept_reading(
        coordinator: &mut TestCoordinator,
        sensor: &mut MaterialConsumptionSensor,
        step: u32,
        quantity: i64,
    ) {
        let mut dev = metered_device("FX1", step);
        dev.fill_level_quantity = Some(quantity);
        let state = coordinator.tick(vec![dev]).await;
        sensor.handle_update(state);
    }

    #[tokio::test]
    async fn accumulates_only_on_drops() {
        let mut coordinator = coordinator();
        let mut sensor = MaterialConsumptionSensor::new("FX1");

        let readings = [100, 80, 80, 95, 60];
        let expected_totals = [0, 20, 20, 20, 55];

        for (step, (quantity, expected)) in
            readings.iter().zip(expected_totals.iter()).enumerate()
        {
            accept_reading(&mut coordinator, &mut sensor, step as u32 + 1, *quantity).await;
            assert_eq!(
                sensor.value(),
                SensorValue::Integer(*expected),
                "total after reading {quantity}"
            );
        }
    }

    #[tokio::test]
    async fn refill_does_not_subtract() {
        let mut coordinator = coordinator();
        let mut sensor = MaterialConsumptionSensor::new("FX1");

        accept_reading(&mut coordinator, &mut sensor, 1, 50).await;
        accept_reading(&mut coordinator, &mut sensor, 2, 3000).await;
        assert_eq!(sensor.value(), SensorValue::Integer(0));
    }

    #[tokio::test]
    async fn ignores_updates_when_change_flag_is_down() {
        let mut coordinator = coordinator();
        let mut sensor = MaterialConsumptionSensor::new("FX1");

        accept_reading(&mut coordinator, &mut sensor, 1, 100).await;

        // Same metering timestamp with a lower quantity: no accepted update,
        // so the ring must not shift and no consumption is recorded.
        let mut dev = metered_device("FX1", 1);
        dev.fill_level_quantity = Some(10);
        let state = coordinator.tick(vec![dev]).await;
        sensor.handle_update(state);
        assert_eq!(sensor.value(), SensorValue::Integer(0));

        accept_reading(&mut coordinator, &mut sensor, 2, 90).await;
        assert_eq!(sensor.value(), SensorValue::Integer(10));
    }

    #[test]
    fn restore_reproduces_full_triple() {
        let mut sensor = MaterialConsumptionSensor::new("FX1");
        sensor.restore(PersistedState {
            value: SensorValue::Integer(55),
            previous_value: Some(80),
            current_value: Some(60),
        });

        assert_eq!(sensor.value(), SensorValue::Integer(55));
        assert_eq!(
            sensor.persisted(),
            PersistedState {
                value: SensorValue::Integer(55),
                previous_value: Some(80),
                current_value: Some(60),
            }
        );
    }

    #[tokio::test]
    async fn restored_ring_feeds_the_next_delta() {
        let mut coordinator = coordinator();
        let mut sensor = MaterialConsumptionSensor::new("FX1");
        sensor.restore(PersistedState {
            value: SensorValue::Integer(55),
            previous_value: Some(80),
            current_value: Some(60),
        });

        accept_reading(&mut coordinator, &mut sensor, 1, 40).await;
        assert_eq!(sensor.value(), SensorValue::Integer(75));
    }

    #[test]
    fn empty_restore_starts_from_zero_state() {
        let mut sensor = MaterialConsumptionSensor::new("FX1");
        sensor.restore(PersistedState::default());
        assert_eq!(sensor.value(), SensorValue::None);
        assert_eq!(sensor.persisted().previous_value, Some(0));
        assert_eq!(sensor.persisted().current_value, Some(0));
    }
}
