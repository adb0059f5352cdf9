//! Fleet synchronization engine between `sensorhub-api` and the CLI.
//!
//! This crate owns the hub-side logic for a fleet of sensor devices:
//!
//! - **[`Hub`]** — Facade over the components below. [`Hub::start_fleet`]
//!   spawns the pollers; [`Hub::statuses`], [`Hub::validate_names`] and
//!   [`Hub::sync_device`] serve one-shot CLI invocations.
//!
//! - **[`FleetTransport`]** — Uniform status/data access for every
//!   [`DeviceAddress`]. Remote devices go over HTTP; the hub's own device
//!   (`self`) is answered in-process by [`LocalDevice`].
//!
//! - **[`Reconciler`]** — Crash-safe refresh of one device's local CSV:
//!   backup by rename, fetch, row-count check, commit. A shrinking copy is
//!   rejected with [`CoreError::DataRegression`].
//!
//! - **[`Fleet`] / [`Poller`]** — One cancellable task per remote device,
//!   polling on a fixed interval. Failures are logged and retried on the
//!   next tick; they never stop the poller.
//!
//! - **[`validate_names`] / [`get_all_statuses`]** — Concurrent fan-out of
//!   status requests, strict and partial-failure flavored respectively.

pub mod aggregate;
pub mod config;
pub mod error;
pub mod fleet;
pub mod hub;
pub mod local;
pub mod model;
pub mod poller;
pub mod reconcile;
pub mod storage;
pub mod transport;
pub mod validate;

// ── Primary re-exports ──────────────────────────────────────────────
pub use aggregate::{StatusEntry, StatusOutcome, get_all_statuses};
pub use config::{DEFAULT_POLL_INTERVAL, HubConfig, LocalDeviceConfig};
pub use error::CoreError;
pub use fleet::{Fleet, FleetHandle};
pub use hub::Hub;
pub use local::LocalDevice;
pub use model::{
    DeviceAddress, DeviceStatus, LOCAL_ADDRESS, PollState, PollTask, SyncReport,
    validate_device_name,
};
pub use poller::Poller;
pub use reconcile::Reconciler;
pub use storage::{Storage, count_rows};
pub use transport::FleetTransport;
pub use validate::{DeviceIdentity, NameTolerance, UNREACHABLE_NAME, validate_names};

pub use sensorhub_api::DEFAULT_DEVICE_PORT;
