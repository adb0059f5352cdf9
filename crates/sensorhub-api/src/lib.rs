// sensorhub-api: Async Rust client for sensor device endpoints (status + data)

pub mod device;
pub mod error;
pub mod models;
pub mod transport;

pub use device::{DEFAULT_DEVICE_PORT, DeviceClient, DevicePool};
pub use error::Error;
pub use models::{DataDetails, DeviceConfigs, StatusResponse};
pub use transport::TransportConfig;
