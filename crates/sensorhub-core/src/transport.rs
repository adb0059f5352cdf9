// ── Fleet transport ──
//
// One entry point for talking to any fleet member. Remote addresses go
// over HTTP through `sensorhub-api`; the local device is answered
// in-process. Callers never branch on which kind of address they hold.

use std::path::Path;

use sensorhub_api::DevicePool;
use tracing::debug;

use crate::config::HubConfig;
use crate::error::CoreError;
use crate::local::LocalDevice;
use crate::model::{DeviceAddress, DeviceStatus};

/// Status and data access for every fleet member.
#[derive(Debug, Clone)]
pub struct FleetTransport {
    pool: DevicePool,
    local: Option<LocalDevice>,
}

impl FleetTransport {
    pub fn new(config: &HubConfig) -> Result<Self, CoreError> {
        let pool = DevicePool::new(config.transport(), config.device_port).map_err(|e| {
            CoreError::Config {
                message: format!("failed to build HTTP client: {e}"),
            }
        })?;
        Ok(Self {
            pool,
            local: config.local_device.clone().map(LocalDevice::new),
        })
    }

    /// The local device, if the hub has one.
    pub fn local(&self) -> Option<&LocalDevice> {
        self.local.as_ref()
    }

    fn local_or_err(&self) -> Result<&LocalDevice, CoreError> {
        self.local.as_ref().ok_or_else(|| CoreError::Config {
            message: "address 'self' is listed but no local device is configured".into(),
        })
    }

    /// Fetch a fresh status snapshot from `address`.
    pub async fn fetch_status(&self, address: &DeviceAddress) -> Result<DeviceStatus, CoreError> {
        match address {
            DeviceAddress::Local => self.local_or_err()?.status().await,
            DeviceAddress::Remote(host) => {
                let client = self
                    .pool
                    .client_for(host)
                    .map_err(|e| CoreError::from_api(address, e))?;
                let raw = client
                    .get_status()
                    .await
                    .map_err(|e| CoreError::from_api(address, e))?;
                Ok(DeviceStatus::from(raw))
            }
        }
    }

    /// Write the device's raw data stream to `destination`, returning the
    /// number of bytes written.
    pub async fn stream_data(
        &self,
        address: &DeviceAddress,
        destination: &Path,
    ) -> Result<u64, CoreError> {
        match address {
            DeviceAddress::Local => self.local_or_err()?.copy_data_to(destination).await,
            DeviceAddress::Remote(host) => {
                let client = self
                    .pool
                    .client_for(host)
                    .map_err(|e| CoreError::from_api(address, e))?;
                let written = client
                    .stream_data_to(destination)
                    .await
                    .map_err(|e| CoreError::from_api(address, e))?;
                debug!(address = %address, bytes = written, "data stream complete");
                Ok(written)
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::local::test_device;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn remote(server: &MockServer) -> DeviceAddress {
        DeviceAddress::Remote(server.address().to_string())
    }

    #[tokio::test]
    async fn remote_status_goes_over_http() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/status.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "device_configs": { "name": "porch", "update_interval": 3 },
                "data_details": { "file_size": 99, "n_rows": 4 },
                "latest_reading": { "time": "t", "air": 1 }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let transport = FleetTransport::new(&HubConfig::new(dir.path())).unwrap();
        let status = transport.fetch_status(&remote(&server)).await.unwrap();

        assert_eq!(status.name, "porch");
        assert_eq!(status.update_interval_secs, 3);
        assert_eq!(status.data_size_bytes, 99);
        assert_eq!(status.row_count, 4);
    }

    #[tokio::test]
    async fn local_status_and_data_skip_the_network() {
        let dir = tempfile::tempdir().unwrap();
        let device = test_device(dir.path(), "hub", "time,air\n1,2\n");
        let config = HubConfig {
            local_device: Some(crate::config::LocalDeviceConfig {
                name: device.name().into(),
                update_interval_secs: 1,
                data_path: device.data_path().to_path_buf(),
            }),
            // An unroutable port: any network use would fail.
            device_port: 1,
            ..HubConfig::new(dir.path())
        };
        let transport = FleetTransport::new(&config).unwrap();

        let status = transport.fetch_status(&DeviceAddress::Local).await.unwrap();
        assert_eq!(status.name, "hub");
        assert_eq!(status.row_count, 2);

        let dest = dir.path().join("copy.csv");
        let written = transport
            .stream_data(&DeviceAddress::Local, &dest)
            .await
            .unwrap();
        assert_eq!(written, 13);
    }

    #[tokio::test]
    async fn local_without_config_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let transport = FleetTransport::new(&HubConfig::new(dir.path())).unwrap();
        let err = transport.fetch_status(&DeviceAddress::Local).await.unwrap_err();
        assert!(matches!(err, CoreError::Config { .. }));
    }

    #[tokio::test]
    async fn closed_port_is_unreachable() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let dir = tempfile::tempdir().unwrap();
        let transport = FleetTransport::new(&HubConfig::new(dir.path())).unwrap();
        let err = transport
            .fetch_status(&DeviceAddress::Remote(addr.to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Unreachable { .. }), "got {err:?}");
    }
}
