use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::db::DbPool;

/// A sensor's displayed value. Semantic type depends on the metric.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum SensorValue {
    #[default]
    None,
    Integer(i64),
    Number(f64),
    Text(String),
    Timestamp(DateTime<FixedOffset>),
}

impl SensorValue {
    pub fn is_none(&self) -> bool {
        matches!(self, SensorValue::None)
    }
}

/// Restart-safe sensor state. The two raw-reading slots are only used by the
/// cumulative consumption sensors; every other sensor persists just `value`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistedState {
    pub value: SensorValue,
    pub previous_value: Option<i64>,
    pub current_value: Option<i64>,
}

/// Upsert the state for one (hwid, metric) pair.
pub fn save_state(
    pool: &DbPool,
    hwid: &str,
    metric: &str,
    state: &PersistedState,
) -> Result<(), String> {
    let json = serde_json::to_string(state).map_err(|e| e.to_string())?;
    let conn = pool.get().map_err(|e| e.to_string())?;
    conn.execute(
        "INSERT INTO sensor_state (hwid, metric, state) VALUES (?1, ?2, ?3)
         ON CONFLICT(hwid, metric) DO UPDATE SET state = ?3, updated_at = datetime('now')",
        [hwid, metric, json.as_str()],
    )
    .map_err(|e| e.to_string())?;
    Ok(())
}

/// Load the state for one (hwid, metric) pair. Returns None when nothing was
/// stored or the stored row no longer parses; sensors then start from empty
/// state rather than failing startup.
pub fn load_state(
    pool: &DbPool,
    hwid: &str,
    metric: &str,
) -> Result<Option<PersistedState>, String> {
    let conn = pool.get().map_err(|e| e.to_string())?;
    let json: Option<String> = match conn.query_row(
        "SELECT state FROM sensor_state WHERE hwid = ?1 AND metric = ?2",
        [hwid, metric],
        |row| row.get(0),
    ) {
        Ok(json) => Some(json),
        Err(rusqlite::Error::QueryReturnedNoRows) => None,
        Err(e) => return Err(e.to_string()),
    };

    match json {
        Some(json) => match serde_json::from_str(&json) {
            Ok(state) => Ok(Some(state)),
            Err(e) => {
                debug!(hwid, metric, %e, "Invalid stored state; starting empty");
                Ok(None)
            }
        },
        None => Ok(None),
    }
}
