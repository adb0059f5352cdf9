// ── Hub facade ──
//
// Owns the shared transport, storage and reconciler, and exposes the
// operations the CLI needs. Cheaply cloneable.

use std::sync::Arc;

use futures_util::future::join_all;
use tracing::info;

use crate::aggregate::{StatusEntry, get_all_statuses};
use crate::config::HubConfig;
use crate::error::CoreError;
use crate::fleet::{Fleet, FleetHandle};
use crate::model::{DeviceAddress, SyncReport};
use crate::reconcile::Reconciler;
use crate::storage::Storage;
use crate::transport::FleetTransport;
use crate::validate::{DeviceIdentity, NameTolerance, validate_names};

/// Entry point for fleet operations.
#[derive(Debug, Clone)]
pub struct Hub {
    inner: Arc<HubInner>,
}

#[derive(Debug)]
struct HubInner {
    config: HubConfig,
    transport: Arc<FleetTransport>,
    reconciler: Reconciler,
}

impl Hub {
    pub fn new(config: HubConfig) -> Result<Self, CoreError> {
        let transport = Arc::new(FleetTransport::new(&config)?);
        let storage = Storage::new(&config.storage_dir);
        let reconciler = Reconciler::new(storage, Arc::clone(&transport));
        Ok(Self {
            inner: Arc::new(HubInner {
                config,
                transport,
                reconciler,
            }),
        })
    }

    pub fn config(&self) -> &HubConfig {
        &self.inner.config
    }

    pub fn storage(&self) -> &Storage {
        self.inner.reconciler.storage()
    }

    pub fn transport(&self) -> &FleetTransport {
        &self.inner.transport
    }

    /// Check that every device reports a distinct name.
    pub async fn validate_names(
        &self,
        addresses: &[DeviceAddress],
        tolerance: NameTolerance,
    ) -> Result<Vec<DeviceIdentity>, CoreError> {
        validate_names(&self.inner.transport, addresses, tolerance).await
    }

    /// Fresh status of every address, in input order.
    pub async fn statuses(&self, addresses: &[DeviceAddress]) -> Vec<StatusEntry> {
        get_all_statuses(&self.inner.transport, addresses).await
    }

    /// Learn the device's name, then reconcile its local copy once.
    pub async fn sync_device(&self, address: &DeviceAddress) -> Result<SyncReport, CoreError> {
        let status = self.inner.transport.fetch_status(address).await?;
        self.inner.reconciler.sync_once(address, &status.name).await
    }

    /// One reconcile pass over every address, concurrently.
    pub async fn sync_all(
        &self,
        addresses: &[DeviceAddress],
    ) -> Vec<(DeviceAddress, Result<SyncReport, CoreError>)> {
        let results = join_all(addresses.iter().map(|a| self.sync_device(a))).await;
        addresses.iter().cloned().zip(results).collect()
    }

    /// Prepare storage and spawn one poller per remote address.
    pub async fn start_fleet(&self, addresses: &[DeviceAddress]) -> Result<FleetHandle, CoreError> {
        let storage = self.storage();
        storage.ensure_layout().await?;
        storage.report_pending_backups().await;
        info!(storage = %storage.root().display(), "storage ready");

        let fleet = Fleet::new(self.inner.reconciler.clone(), self.inner.config.poll_interval);
        Ok(fleet.start(addresses))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn device(name: &str, body: &str) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/status.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "device_configs": { "name": name, "update_interval": 1 },
                "data_details": { "file_size": body.len(), "n_rows": body.lines().count() },
                "latest_reading": {}
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/data"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body.to_owned()))
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn sync_all_stores_one_file_per_name() {
        let dir = tempfile::tempdir().unwrap();
        let a = device("north", "time,air\n1,2\n").await;
        let b = device("south", "time,air\n1,2\n3,4\n").await;
        let hub = Hub::new(HubConfig::new(dir.path())).unwrap();
        let addresses = [
            DeviceAddress::Remote(a.address().to_string()),
            DeviceAddress::Remote(b.address().to_string()),
        ];

        let results = hub.sync_all(&addresses).await;

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].1.as_ref().unwrap().rows, 2);
        assert_eq!(results[1].1.as_ref().unwrap().rows, 3);
        assert_eq!(
            hub.storage().stored_devices().await.unwrap(),
            ["north", "south"]
        );
    }

    #[tokio::test]
    async fn start_fleet_prepares_storage() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("hub");
        let hub = Hub::new(HubConfig::new(&root)).unwrap();

        let handle = hub.start_fleet(&[DeviceAddress::Local]).await.unwrap();

        assert_eq!(handle.poller_count(), 0);
        assert!(root.join("backup").is_dir());
        handle.shutdown().await;
    }
}
