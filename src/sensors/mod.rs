pub mod battery_level;
pub mod current_metering_at;
pub mod days_reach;
pub mod energy_consumption;
pub mod fill_level_percent;
pub mod fill_level_quantity;
pub mod material_consumption;
pub mod next_metering_at;
pub mod validation_error;

use crate::coordinator::CoordinatorState;
use crate::state::{PersistedState, SensorValue};
use crate::NAME;

/// One derived metric for one device.
///
/// Sensors hold their own state between ticks and only react when the
/// coordinator flags the device as changed; otherwise the last value keeps
/// being displayed.
pub trait Sensor {
    /// Stable metric key, used in the unique id and as the persistence key.
    fn metric(&self) -> &'static str;

    fn hwid(&self) -> &str;

    fn unique_id(&self) -> String {
        format!("{}-{}-{}", NAME, self.hwid(), self.metric())
    }

    /// Currently displayed value.
    fn value(&self) -> SensorValue;

    /// Most sensors go unavailable with the coordinator. The cumulative
    /// consumption sensors override this: a running total must never appear
    /// to reset or go stale on a transient fetch failure.
    fn available(&self, state: &CoordinatorState) -> bool {
        !state.is_unavailable()
    }

    /// Apply previously persisted state, before any poll result is seen.
    fn restore(&mut self, stored: PersistedState);

    /// State to persist after an update.
    fn persisted(&self) -> PersistedState;

    /// Consume the latest coordinator snapshot for this device.
    fn handle_update(&mut self, state: &CoordinatorState);
}

/// The fixed set of nine metrics tracked per device.
pub fn build_sensors(hwid: &str) -> Vec<Box<dyn Sensor>> {
    vec![
        Box::new(fill_level_quantity::FillLevelQuantitySensor::new(hwid)),
        Box::new(fill_level_percent::FillLevelPercentSensor::new(hwid)),
        Box::new(battery_level::BatteryLevelSensor::new(hwid)),
        Box::new(current_metering_at::CurrentMeteringAtSensor::new(hwid)),
        Box::new(next_metering_at::NextMeteringAtSensor::new(hwid)),
        Box::new(material_consumption::MaterialConsumptionSensor::new(hwid)),
        Box::new(energy_consumption::EnergyConsumptionSensor::new(hwid)),
        Box::new(days_reach::DaysReachSensor::new(hwid)),
        Box::new(validation_error::ValidationErrorSensor::new(hwid)),
    ]
}


#[cfg(test)]
mod tests {
    use super::testutil::{coordinator, metered_device};
    use super::*;
    use crate::db;
    use crate::state::{load_state, save_state};

    #[test]
    fn nine_sensors_per_device_with_stable_ids() {
        let sensors = build_sensors("FX1234567890");
        assert_eq!(sensors.len(), 9);

        let ids: Vec<String> = sensors.iter().map(|s| s.unique_id()).collect();
        assert!(ids.contains(&"OilFox-FX1234567890-fillLevelQuantity".to_string()));
        assert!(ids.contains(&"OilFox-FX1234567890-materialConsumption".to_string()));
        assert!(ids.contains(&"OilFox-FX1234567890-energyConsumption".to_string()));

        let mut unique = ids.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), 9);
    }

    #[tokio::test]
    async fn non_cumulative_sensors_follow_coordinator_availability() {
        let mut coordinator = coordinator();
        let mut sensors = build_sensors("FX1");

        let mut dev = metered_device("FX1", 15);
        dev.fill_level_quantity = Some(100);
        let state = coordinator.tick(vec![dev]).await;
        for sensor in &mut sensors {
            sensor.handle_update(state);
            assert!(sensor.available(state), "{} unavailable", sensor.metric());
        }

        let state = coordinator.fail_tick().await;
        for sensor in &sensors {
            let cumulative = matches!(
                sensor.metric(),
                "materialConsumption" | "energyConsumption"
            );
            assert_eq!(
                sensor.available(state),
                cumulative,
                "{} availability wrong during outage",
                sensor.metric()
            );
        }
    }

    #[tokio::test]
    async fn failed_tick_leaves_every_value_unchanged() {
        let mut coordinator = coordinator();
        let mut sensors = build_sensors("FX1");

        let mut dev = metered_device("FX1", 15);
        dev.fill_level_quantity = Some(100);
        dev.fill_level_percent = Some(80);
        dev.battery_level = Some("GOOD".to_string());
        let state = coordinator.tick(vec![dev]).await;
        for sensor in &mut sensors {
            sensor.handle_update(state);
        }
        let before: Vec<_> = sensors.iter().map(|s| s.value()).collect();

        let state = coordinator.fail_tick().await;
        for sensor in &mut sensors {
            sensor.handle_update(state);
        }
        let after: Vec<_> = sensors.iter().map(|s| s.value()).collect();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn persisted_state_survives_a_restart() {
        let dir = tempfile::tempdir().unwrap();
        let pool = db::create_pool(&dir.path().join("test.sqlite")).unwrap();
        db::init_db(&pool).unwrap();

        let mut coordinator = coordinator();
        let mut sensors = build_sensors("FX1");

        let mut dev = metered_device("FX1", 15);
        dev.fill_level_quantity = Some(100);
        dev.days_reach = Some(120);
        let state = coordinator.tick(vec![dev.clone()]).await;
        for sensor in &mut sensors {
            sensor.handle_update(state);
        }
        dev.current_metering_at = Some("2024-01-16T06:00:00Z".to_string());
        dev.fill_level_quantity = Some(80);
        let state = coordinator.tick(vec![dev]).await;
        for sensor in &mut sensors {
            sensor.handle_update(state);
            save_state(&pool, sensor.hwid(), sensor.metric(), &sensor.persisted()).unwrap();
        }

        // "Restart": fresh sensors restored from the store, before any poll.
        let mut restored = build_sensors("FX1");
        for sensor in &mut restored {
            if let Some(stored) = load_state(&pool, sensor.hwid(), sensor.metric()).unwrap() {
                sensor.restore(stored);
            }
        }

        for (old, new) in sensors.iter().zip(restored.iter()) {
            assert_eq!(
                old.value(),
                new.value(),
                "{} did not survive restart",
                old.metric()
            );
            assert_eq!(old.persisted(), new.persisted());
        }
    }
}
