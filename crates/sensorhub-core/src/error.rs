// ── Core error types ──
//
// Fleet-level errors from sensorhub-core. Consumers never see raw HTTP
// or JSON failures: `CoreError::from_api` folds them into `Unreachable`,
// `Malformed` or `Io`, attributed to the device that produced them.

use std::path::PathBuf;

use thiserror::Error;

use crate::model::DeviceAddress;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Transport errors ─────────────────────────────────────────────
    /// No connection could be established, or it dropped mid-response.
    #[error("Device {address} is unreachable: {reason}")]
    Unreachable { address: String, reason: String },

    /// The device answered, but not with something we understand.
    #[error("Malformed response from {address}: {message}")]
    Malformed { address: String, message: String },

    // ── Storage errors ───────────────────────────────────────────────
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Sync errors ──────────────────────────────────────────────────
    /// Fetching the data stream failed; the backup is left in place.
    #[error("Sync from {address} failed: {reason}")]
    SyncFailed { address: String, reason: String },

    /// The refreshed copy has fewer rows than the one it replaced.
    #[error("Data regression for '{name}': {old_rows} rows before sync, {new_rows} after")]
    DataRegression {
        name: String,
        old_rows: u64,
        new_rows: u64,
    },

    // ── Fleet identity errors ────────────────────────────────────────
    #[error("Device name '{name}' is reported by more than one device: {}", .addresses.join(", "))]
    DuplicateName { name: String, addresses: Vec<String> },

    #[error("Devices did not answer: {}", .addresses.join(", "))]
    FleetUnreachable { addresses: Vec<String> },

    #[error("Invalid device name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CoreError {
    /// Translate a transport-layer error, attributing it to `address`.
    pub fn from_api(address: &DeviceAddress, err: sensorhub_api::Error) -> Self {
        let address = address.to_string();
        match err {
            sensorhub_api::Error::Io { path, source } => CoreError::Io { path, source },
            sensorhub_api::Error::InvalidAddress { address, reason } => CoreError::Config {
                message: format!("invalid device address '{address}': {reason}"),
            },
            sensorhub_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("invalid device URL for {address}: {e}"),
            },
            ref e if e.is_malformed() => CoreError::Malformed {
                address,
                message: e.to_string(),
            },
            _ => CoreError::Unreachable {
                address,
                reason: err.to_string(),
            },
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Returns `true` for routine transport failures worth waiting out.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Unreachable { .. } | Self::SyncFailed { .. } | Self::FleetUnreachable { .. }
        )
    }

    /// Short machine-readable tag for this error's kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Unreachable { .. } => "unreachable",
            Self::Malformed { .. } => "malformed",
            Self::Io { .. } => "io",
            Self::SyncFailed { .. } => "sync_failed",
            Self::DataRegression { .. } => "data_regression",
            Self::DuplicateName { .. } => "duplicate_name",
            Self::FleetUnreachable { .. } => "fleet_unreachable",
            Self::InvalidName { .. } => "invalid_name",
            Self::Config { .. } => "config",
        }
    }
}
