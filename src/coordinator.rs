use std::collections::HashMap;

use tracing::{debug, error, warn};

use crate::api::{ApiError, DeviceSource};
use crate::types::device::{Device, DeviceCollection};

/// Snapshot state shared with the metric sensors.
///
/// A failed poll never clears `data`; `unavailable` gates the queries instead,
/// so consumers see staleness without the history being discarded.
#[derive(Debug, Default)]
pub struct CoordinatorState {
    data: DeviceCollection,
    update_datetime: HashMap<String, Option<String>>,
    update_flag: HashMap<String, bool>,
    unavailable: bool,
}

impl CoordinatorState {
    pub fn is_unavailable(&self) -> bool {
        self.unavailable
    }

    /// Whether the device reported a new metering on the last poll.
    /// Always false while unavailable or for unknown ids.
    pub fn needs_update(&self, hwid: &str) -> bool {
        !self.unavailable && self.update_flag.get(hwid).copied().unwrap_or(false)
    }

    /// Latest snapshot for a device. None while unavailable or for unknown ids.
    pub fn get_data(&self, hwid: &str) -> Option<&Device> {
        if self.unavailable {
            return None;
        }
        self.data.get(hwid)
    }

    pub fn device_ids(&self) -> impl Iterator<Item = &str> {
        self.data.keys().map(String::as_str)
    }

    fn apply_collection(&mut self, devices: DeviceCollection) {
        for device in devices.values() {
            let current = device.current_metering_at.clone();
            let previous = self.update_datetime.get(&device.hwid).cloned().flatten();

            let changed = match &previous {
                None => true,
                Some(prev) => current.as_deref() != Some(prev.as_str()),
            };

            if changed {
                debug!(
                    hwid = %device.hwid,
                    previous = ?previous,
                    current = ?current,
                    "Update required"
                );
            } else {
                debug!(
                    hwid = %device.hwid,
                    previous = ?previous,
                    current = ?current,
                    "No update required"
                );
            }

            self.update_flag.insert(device.hwid.clone(), changed);
            self.update_datetime.insert(device.hwid.clone(), current);
        }

        self.data = devices;
    }
}

/// Owns the polling contract: one refresh per tick, change detection on
/// `currentMeteringAt`, and downgrade of every fetch failure to
/// `unavailable = true` plus a log line.
pub struct Coordinator<A: DeviceSource> {
    api: A,
    state: CoordinatorState,
}

impl<A: DeviceSource> Coordinator<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            state: CoordinatorState::default(),
        }
    }

    pub fn state(&self) -> &CoordinatorState {
        &self.state
    }

    /// Run one poll tick. A fetch failure is never propagated; the last good
    /// snapshot stays in place and the state is marked unavailable so that a
    /// single transient network blip cannot blank out every sensor.
    pub async fn refresh(&mut self) {
        self.state.unavailable = false;

        match self.api.fetch_devices().await {
            Ok(devices) => self.state.apply_collection(devices),
            Err(e) => {
                match &e {
                    ApiError::Authentication(_) => error!("{e}"),
                    ApiError::Connection(_) => warn!("{e}"),
                    ApiError::Api(_) => error!("Unexpected API failure: {e:?}"),
                }
                self.state.unavailable = true;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    struct ScriptedSource {
        results: RefCell<VecDeque<Result<DeviceCollection, ApiError>>>,
    }

    impl ScriptedSource {
        fn new(results: Vec<Result<DeviceCollection, ApiError>>) -> Self {
            Self {
                results: RefCell::new(results.into()),
            }
        }
    }

    impl DeviceSource for ScriptedSource {
        async fn fetch_devices(&self) -> Result<DeviceCollection, ApiError> {
            self.results
                .borrow_mut()
                .pop_front()
                .expect("no scripted result left")
        }
    }

    fn device(hwid: &str, metering_at: Option<&str>) -> Device {
        Device {
            hwid: hwid.to_string(),
            current_metering_at: metering_at.map(str::to_string),
            next_metering_at: None,
            days_reach: None,
            validation_error: None,
            battery_level: None,
            fill_level_percent: None,
            fill_level_quantity: None,
            quantity_unit: Some("l".to_string()),
        }
    }

    fn collection(devices: Vec<Device>) -> DeviceCollection {
        devices.into_iter().map(|d| (d.hwid.clone(), d)).collect()
    }

    #[tokio::test]
    async fn first_poll_marks_device_changed() {
        let source = ScriptedSource::new(vec![Ok(collection(vec![device(
            "FX1",
            Some("2024-01-15T06:00:00Z"),
        )]))]);
        let mut coordinator = Coordinator::new(source);
        coordinator.refresh().await;

        assert!(!coordinator.state().is_unavailable());
        assert!(coordinator.state().needs_update("FX1"));
        assert!(coordinator.state().get_data("FX1").is_some());
    }

    #[tokio::test]
    async fn unchanged_metering_clears_update_flag() {
        let source = ScriptedSource::new(vec![
            Ok(collection(vec![device("FX1", Some("2024-01-15T06:00:00Z"))])),
            Ok(collection(vec![device("FX1", Some("2024-01-15T06:00:00Z"))])),
        ]);
        let mut coordinator = Coordinator::new(source);
        coordinator.refresh().await;
        coordinator.refresh().await;

        assert!(!coordinator.state().needs_update("FX1"));
        assert!(coordinator.state().get_data("FX1").is_some());
    }

    #[tokio::test]
    async fn changed_metering_sets_flag_exactly_once() {
        let source = ScriptedSource::new(vec![
            Ok(collection(vec![device("FX1", Some("2024-01-15T06:00:00Z"))])),
            Ok(collection(vec![device("FX1", Some("2024-01-16T06:00:00Z"))])),
            Ok(collection(vec![device("FX1", Some("2024-01-16T06:00:00Z"))])),
        ]);
        let mut coordinator = Coordinator::new(source);
        coordinator.refresh().await;
        assert!(coordinator.state().needs_update("FX1"));
        coordinator.refresh().await;
        assert!(coordinator.state().needs_update("FX1"));
        coordinator.refresh().await;
        assert!(!coordinator.state().needs_update("FX1"));
    }

    #[tokio::test]
    async fn missing_metering_timestamp_always_reads_as_changed() {
        let source = ScriptedSource::new(vec![
            Ok(collection(vec![device("FX1", None)])),
            Ok(collection(vec![device("FX1", None)])),
        ]);
        let mut coordinator = Coordinator::new(source);
        coordinator.refresh().await;
        coordinator.refresh().await;
        assert!(coordinator.state().needs_update("FX1"));
    }

    #[tokio::test]
    async fn fetch_failure_marks_unavailable_and_hides_data() {
        let source = ScriptedSource::new(vec![
            Ok(collection(vec![device("FX1", Some("2024-01-15T06:00:00Z"))])),
            Err(ApiError::Connection("timeout".to_string())),
        ]);
        let mut coordinator = Coordinator::new(source);
        coordinator.refresh().await;
        coordinator.refresh().await;

        assert!(coordinator.state().is_unavailable());
        assert!(coordinator.state().get_data("FX1").is_none());
        assert!(!coordinator.state().needs_update("FX1"));
    }

    #[tokio::test]
    async fn snapshot_survives_outage_and_recovers() {
        let source = ScriptedSource::new(vec![
            Ok(collection(vec![device("FX1", Some("2024-01-15T06:00:00Z"))])),
            Err(ApiError::Authentication("bad credentials".to_string())),
            Ok(collection(vec![device("FX1", Some("2024-01-15T06:00:00Z"))])),
        ]);
        let mut coordinator = Coordinator::new(source);
        coordinator.refresh().await;
        coordinator.refresh().await;
        assert!(coordinator.state().is_unavailable());

        coordinator.refresh().await;
        assert!(!coordinator.state().is_unavailable());
        // The previous metering value survived the outage, so no change fired.
        assert!(!coordinator.state().needs_update("FX1"));
        assert!(coordinator.state().get_data("FX1").is_some());
    }

    #[test]
    fn unknown_ids_default_to_no_update_and_no_data() {
        let state = CoordinatorState::default();
        assert!(!state.needs_update("missing"));
        assert!(state.get_data("missing").is_none());
    }
}
