use std::collections::HashMap;
use std::time::Duration;

use tracing::{info, warn};

use tankwatch::api::{DeviceSource, OilfoxApi};
use tankwatch::config::Config;
use tankwatch::coordinator::Coordinator;
use tankwatch::db::{self, DbPool};
use tankwatch::sensors::{self, Sensor};
use tankwatch::state::{load_state, save_state};

type SensorSets = HashMap<String, Vec<Box<dyn Sensor>>>;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tankwatch::init_tracing();

    info!("Starting tankwatch");

    let config = Config::from_env()?;
    info!("Configuration loaded successfully");
    info!("Poll interval: {}s", config.poll_interval_secs);

    let db_path = config.data_dir.join("state").join("tankwatch.sqlite");
    let pool = db::create_pool(&db_path)?;
    db::init_db(&pool)?;
    info!(path = %db_path.display(), "State database ready");

    let api = OilfoxApi::new(&config.api_url, &config.email, &config.password);
    let mut coordinator = Coordinator::new(api);
    let mut sensors: SensorSets = HashMap::new();

    let mut interval = tokio::time::interval(Duration::from_secs(config.poll_interval_secs));
    let sig = tokio::signal::ctrl_c();
    tokio::pin!(sig);

    loop {
        tokio::select! {
            biased;
            _ = &mut sig => {
                info!("shutdown requested");
                break;
            }
            _ = interval.tick() => {
                run_tick(&mut coordinator, &mut sensors, &pool).await;
            }
        }
    }

    Ok(())
}

/// One poll tick: refresh the coordinator, pick up newly discovered devices
/// (restoring their sensors from the store first), then let every sensor
/// consume the snapshot and persist its state.
async fn run_tick<A: DeviceSource>(
    coordinator: &mut Coordinator<A>,
    sensors: &mut SensorSets,
    pool: &DbPool,
) {
    coordinator.refresh().await;
    let state = coordinator.state();

    let new_ids: Vec<String> = state
        .device_ids()
        .filter(|id| !sensors.contains_key(*id))
        .map(str::to_string)
        .collect();
    for hwid in new_ids {
        let mut set = sensors::build_sensors(&hwid);
        for sensor in &mut set {
            match load_state(pool, sensor.hwid(), sensor.metric()) {
                Ok(Some(stored)) => sensor.restore(stored),
                Ok(None) => {}
                Err(e) => warn!(
                    hwid = %hwid,
                    metric = sensor.metric(),
                    "Failed to load stored state: {e}"
                ),
            }
        }
        info!(hwid = %hwid, "Tracking new device");
        sensors.insert(hwid, set);
    }

    for set in sensors.values_mut() {
        for sensor in set.iter_mut() {
            sensor.handle_update(state);
            if let Err(e) = save_state(pool, sensor.hwid(), sensor.metric(), &sensor.persisted()) {
                warn!(
                    hwid = sensor.hwid(),
                    metric = sensor.metric(),
                    "Failed to persist state: {e}"
                );
            }
        }
    }

    let changed = state
        .device_ids()
        .filter(|id| state.needs_update(id))
        .count();
    info!(
        devices = sensors.len(),
        changed,
        unavailable = state.is_unavailable(),
        "Poll tick complete"
    );
}
