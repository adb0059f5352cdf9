// Device status wire types
//
// Models for the `GET /status.json` document every device serves. Fields
// use `#[serde(default)]` where older device firmware omits them.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};

// ── Status document ──────────────────────────────────────────────────

/// Full status document from `status.json`.
///
/// ```json
/// {
///   "device_configs": { "name": "attic", "update_interval": 1, "sensors": [] },
///   "data_details": { "file_size": "1.21 KiB", "n_rows": 42 },
///   "latest_reading": { "time": "2021-06-01 12:00:00", "air": 12 }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub device_configs: DeviceConfigs,
    pub data_details: DataDetails,
    /// Most recent row keyed by column header, in column order.
    #[serde(default)]
    pub latest_reading: IndexMap<String, serde_json::Value>,
}

/// Identity and sampling settings the device was configured with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfigs {
    pub name: String,
    /// Seconds between sensor reads on the device.
    #[serde(default)]
    pub update_interval: u64,
    /// Sensor definitions; opaque to the hub.
    #[serde(default)]
    pub sensors: Vec<serde_json::Value>,
}

/// Size of the device's data file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataDetails {
    /// Bytes. Devices may report either an integer or a humanized string
    /// such as `"1.21 KiB"`.
    #[serde(deserialize_with = "deserialize_file_size")]
    pub file_size: u64,
    /// Line count of the data file, header included.
    pub n_rows: u64,
}

fn deserialize_file_size<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Bytes(u64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Bytes(n) => Ok(n),
        Raw::Text(text) => text
            .trim()
            .parse::<bytesize::ByteSize>()
            .map(|size| size.as_u64())
            .map_err(|e| serde::de::Error::custom(format!("invalid file_size {text:?}: {e}"))),
    }
}
