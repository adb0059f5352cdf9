//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use sensorhub_config::ConfigError;
use sensorhub_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const CONFLICT: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const DATA_REGRESSION: i32 = 9;
}

#[derive(Debug, Error, Diagnostic)]
#[allow(unused_assignments)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────

    #[error("Device {address} is unreachable")]
    #[diagnostic(
        code(sensorhub::unreachable),
        help(
            "Check that the device is powered and serving on the expected port.\n\
             Reason: {reason}"
        )
    )]
    Unreachable { address: String, reason: String },

    #[error("Devices did not answer: {}", .addresses.join(", "))]
    #[diagnostic(
        code(sensorhub::fleet_unreachable),
        help("Retry once they are back, or pass --allow-partial to proceed without them.")
    )]
    FleetUnreachable { addresses: Vec<String> },

    #[error("Unexpected response from {address}")]
    #[diagnostic(
        code(sensorhub::malformed),
        help("The device answered, but not with a status document: {message}")
    )]
    Malformed { address: String, message: String },

    #[error("Sync from {address} failed")]
    #[diagnostic(
        code(sensorhub::sync_failed),
        help(
            "The previous copy is kept in the backup directory and will be the\n\
             baseline of the next sync. Reason: {reason}"
        )
    )]
    SyncFailed { address: String, reason: String },

    // ── Fleet integrity ──────────────────────────────────────────────

    #[error("Device name '{name}' is used by several devices: {}", .addresses.join(", "))]
    #[diagnostic(
        code(sensorhub::duplicate_name),
        help("Give every device a distinct name, then run: sensorhub validate")
    )]
    DuplicateName { name: String, addresses: Vec<String> },

    #[error("Data for '{name}' shrank from {old_rows} to {new_rows} rows")]
    #[diagnostic(
        code(sensorhub::data_regression),
        help(
            "The new copy was kept and the previous one left at backup/{name}.csv.\n\
             Check whether the device was reset before removing the backup."
        )
    )]
    DataRegression {
        name: String,
        old_rows: u64,
        new_rows: u64,
    },

    #[error("{failed} of {total} devices failed to sync")]
    #[diagnostic(code(sensorhub::sync_incomplete), help("Run with -v for details."))]
    SyncIncomplete { failed: usize, total: usize },

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(sensorhub::validation))]
    Validation { field: String, reason: String },

    #[error("No device addresses configured")]
    #[diagnostic(
        code(sensorhub::no_addresses),
        help(
            "Store an address list with: sensorhub addresses set <FILE>\n\
             Config file: {path}"
        )
    )]
    NoAddresses { path: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error(transparent)]
    #[diagnostic(code(sensorhub::config))]
    Config(Box<ConfigError>),

    // ── Interactive ──────────────────────────────────────────────────

    #[error("Destructive operation '{action}' requires confirmation")]
    #[diagnostic(
        code(sensorhub::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── IO ───────────────────────────────────────────────────────────

    #[error("I/O error on {path}")]
    #[diagnostic(code(sensorhub::io))]
    Storage {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            ConfigError::Address {
                line,
                value,
                reason,
            } => Self::Validation {
                field: format!("address on line {line}"),
                reason: format!("'{value}': {reason}"),
            },
            other => Self::Config(Box::new(other)),
        }
    }
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Unreachable { .. } | Self::FleetUnreachable { .. } | Self::SyncFailed { .. } => {
                exit_code::CONNECTION
            }
            Self::DuplicateName { .. } => exit_code::CONFLICT,
            Self::DataRegression { .. } => exit_code::DATA_REGRESSION,
            Self::Validation { .. }
            | Self::NoAddresses { .. }
            | Self::Config(_)
            | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Unreachable { address, reason } => CliError::Unreachable { address, reason },

            CoreError::Malformed { address, message } => CliError::Malformed { address, message },

            CoreError::Io { path, source } => CliError::Storage {
                path: path.display().to_string(),
                source,
            },

            CoreError::SyncFailed { address, reason } => CliError::SyncFailed { address, reason },

            CoreError::DataRegression {
                name,
                old_rows,
                new_rows,
            } => CliError::DataRegression {
                name,
                old_rows,
                new_rows,
            },

            CoreError::DuplicateName { name, addresses } => {
                CliError::DuplicateName { name, addresses }
            }

            CoreError::FleetUnreachable { addresses } => CliError::FleetUnreachable { addresses },

            CoreError::InvalidName { name, reason } => CliError::Validation {
                field: format!("device name '{name}'"),
                reason,
            },

            CoreError::Config { message } => CliError::Validation {
                field: "configuration".into(),
                reason: message,
            },
        }
    }
}
