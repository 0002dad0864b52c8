use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// One OilFox device's reported state at a point in time.
///
/// `hwid` is the stable join key across polls; every other field may be
/// absent on any given poll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub hwid: String,
    pub current_metering_at: Option<String>,
    pub next_metering_at: Option<String>,
    pub days_reach: Option<i64>,
    pub validation_error: Option<String>,
    pub battery_level: Option<String>,
    pub fill_level_percent: Option<i64>,
    pub fill_level_quantity: Option<i64>,
    pub quantity_unit: Option<String>,
}

/// Device list keyed by hwid, built fresh from every successful poll.
pub type DeviceCollection = HashMap<String, Device>;

/// Wire format of the `GET device` endpoint.
#[derive(Debug, Deserialize)]
pub struct DeviceListResponse {
    pub items: Vec<Device>,
}

impl DeviceListResponse {
    /// Re-key the flat item list by hwid.
    pub fn into_collection(self) -> DeviceCollection {
        self.items
            .into_iter()
            .map(|device| (device.hwid.clone(), device))
            .collect()
    }
}
