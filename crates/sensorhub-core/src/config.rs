// ── Runtime hub configuration ──
//
// These types describe *where* the hub keeps its data and *how often* it
// polls. They never touch disk themselves: the CLI builds a `HubConfig`
// (usually via `sensorhub-config`) and hands it to `Hub::new`.

use std::path::PathBuf;
use std::time::Duration;

use sensorhub_api::{DEFAULT_DEVICE_PORT, TransportConfig};

/// Default recurrence between two syncs of the same device.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// The device attached to the hub itself (the `self` address).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalDeviceConfig {
    /// Name reported for the local device.
    pub name: String,
    /// Seconds between sensor reads of the local sensor loop.
    pub update_interval_secs: u64,
    /// Authoritative CSV written by the local sensor loop.
    pub data_path: PathBuf,
}

/// Configuration for one hub process.
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Root of the per-device CSV copies (`<root>/<name>.csv`).
    pub storage_dir: PathBuf,
    /// Time between two syncs of the same device.
    pub poll_interval: Duration,
    /// Status request timeout.
    pub timeout: Duration,
    /// Port used for device addresses that name none.
    pub device_port: u16,
    /// Present when `self` is part of the fleet.
    pub local_device: Option<LocalDeviceConfig>,
}

impl HubConfig {
    pub fn new(storage_dir: impl Into<PathBuf>) -> Self {
        Self {
            storage_dir: storage_dir.into(),
            ..Self::default()
        }
    }

    pub fn with_local_device(mut self, local: LocalDeviceConfig) -> Self {
        self.local_device = Some(local);
        self
    }

    /// Transport settings derived from this config.
    pub fn transport(&self) -> TransportConfig {
        TransportConfig::default().with_timeout(self.timeout)
    }
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            storage_dir: PathBuf::from("data"),
            poll_interval: DEFAULT_POLL_INTERVAL,
            timeout: Duration::from_secs(30),
            device_port: DEFAULT_DEVICE_PORT,
            local_device: None,
        }
    }
}
