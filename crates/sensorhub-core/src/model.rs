// ── Domain model ──
//
// Canonical fleet types shared by every component. Wire types from
// `sensorhub-api` are converted into these at the transport boundary.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Literal that stands for the hub's own, locally attached device.
pub const LOCAL_ADDRESS: &str = "self";

// ── DeviceAddress ────────────────────────────────────────────────

/// A fleet member: either a network address, or the hub itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DeviceAddress {
    /// Reached over HTTP (`ip`, `ip:port`, or hostname).
    Remote(String),
    /// The hub's own device; never touches the network.
    Local,
}

impl DeviceAddress {
    pub fn is_local(&self) -> bool {
        matches!(self, Self::Local)
    }
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Remote(addr) => f.write_str(addr),
            Self::Local => f.write_str(LOCAL_ADDRESS),
        }
    }
}

impl FromStr for DeviceAddress {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(CoreError::Config {
                message: "device address is empty".into(),
            });
        }
        if s == LOCAL_ADDRESS {
            return Ok(Self::Local);
        }
        if s.chars().any(char::is_whitespace) {
            return Err(CoreError::Config {
                message: format!("device address '{s}' contains whitespace"),
            });
        }
        Ok(Self::Remote(s.to_owned()))
    }
}

impl Serialize for DeviceAddress {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DeviceAddress {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

// ── DeviceStatus ─────────────────────────────────────────────────

/// Snapshot of one device, produced fresh on every status request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceStatus {
    /// Fleet-wide unique key; names the hub's local copy of the data.
    pub name: String,
    /// Seconds between sensor reads on the device.
    pub update_interval_secs: u64,
    pub data_size_bytes: u64,
    /// Lines in the data file, header included.
    pub row_count: u64,
    /// Most recent row, keyed by column header, in column order.
    pub latest_reading: IndexMap<String, serde_json::Value>,
}

impl From<sensorhub_api::StatusResponse> for DeviceStatus {
    fn from(raw: sensorhub_api::StatusResponse) -> Self {
        Self {
            name: raw.device_configs.name,
            update_interval_secs: raw.device_configs.update_interval,
            data_size_bytes: raw.data_details.file_size,
            row_count: raw.data_details.n_rows,
            latest_reading: raw.latest_reading,
        }
    }
}

/// Check that a device name can key a file in the storage directory.
pub fn validate_device_name(name: &str) -> Result<(), CoreError> {
    let reason = if name.trim().is_empty() {
        Some("name is empty")
    } else if name == "." || name == ".." {
        Some("name is a relative path component")
    } else if name.contains(['/', '\\', '\0']) {
        Some("name contains a path separator")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(CoreError::InvalidName {
            name: name.to_owned(),
            reason: reason.into(),
        }),
        None => Ok(()),
    }
}

// ── Sync reporting ───────────────────────────────────────────────

/// Outcome of one successful reconcile pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub address: DeviceAddress,
    pub name: String,
    pub bytes_written: u64,
    pub rows: u64,
    /// Row count of the replaced copy, if there was one.
    pub previous_rows: Option<u64>,
}

impl SyncReport {
    /// Rows gained since the previous sync.
    pub fn new_rows(&self) -> u64 {
        self.rows.saturating_sub(self.previous_rows.unwrap_or(0))
    }
}

// ── Poll state ───────────────────────────────────────────────────

/// Lifecycle of a single device poller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PollState {
    Idle,
    Polling,
    /// Last attempt failed; retried on the next tick.
    Failed,
    /// Cancelled; no further polls.
    Stopped,
}

/// Observable scheduling state of one remote device.
#[derive(Debug, Clone, Serialize)]
pub struct PollTask {
    pub address: DeviceAddress,
    pub state: PollState,
    pub last_poll: Option<DateTime<Utc>>,
    pub last_status: Option<DeviceStatus>,
    pub last_sync: Option<SyncReport>,
    pub last_error: Option<String>,
    /// Completed poll attempts, successful or not.
    pub attempts: u64,
}

impl PollTask {
    pub fn new(address: DeviceAddress) -> Self {
        Self {
            address,
            state: PollState::Idle,
            last_poll: None,
            last_status: None,
            last_sync: None,
            last_error: None,
            attempts: 0,
        }
    }
}
