// ── Reconciler ──
//
// Crash-safe refresh of one device's local copy:
//
//   1. rename `<name>.csv` to `backup/<name>.csv`
//   2. fetch the device's data into `<name>.csv`
//   3. compare row counts of the new copy and the backup
//   4. delete the backup only if no rows were lost
//
// Any failure leaves the backup on disk. Its presence is the marker that
// the last sync of that device did not complete cleanly.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::error::CoreError;
use crate::local::LocalDevice;
use crate::model::{DeviceAddress, SyncReport};
use crate::storage::{Storage, count_rows, exists};
use crate::transport::FleetTransport;

/// Performs backup → fetch → verify → commit for a single device.
#[derive(Debug, Clone)]
pub struct Reconciler {
    storage: Storage,
    transport: Arc<FleetTransport>,
}

impl Reconciler {
    pub fn new(storage: Storage, transport: Arc<FleetTransport>) -> Self {
        Self { storage, transport }
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub fn transport(&self) -> &FleetTransport {
        &self.transport
    }

    /// Refresh the local copy of `name` from `address`.
    ///
    /// On `DataRegression` the shorter new copy stays in place and the
    /// backup is kept next to it for inspection; nothing is rolled back.
    pub async fn sync_once(
        &self,
        address: &DeviceAddress,
        name: &str,
    ) -> Result<SyncReport, CoreError> {
        let data_path = self.storage.data_path(name)?;
        let backup_path = self.storage.backup_path(name)?;
        self.storage.ensure_layout().await?;

        if address.is_local() {
            let device = self.local_device()?;
            if same_file(device.data_path(), &data_path).await {
                // The sensor loop writes straight into storage.
                let rows = count_rows(&data_path).await?;
                return Ok(SyncReport {
                    address: address.clone(),
                    name: name.to_owned(),
                    bytes_written: 0,
                    rows,
                    previous_rows: None,
                });
            }
        }

        stash_backup(&data_path, &backup_path).await?;

        let fetched = match address {
            DeviceAddress::Local => link_local(self.local_device()?, &data_path).await,
            DeviceAddress::Remote(_) => self.transport.stream_data(address, &data_path).await,
        };
        let bytes_written = match fetched {
            Ok(n) => n,
            Err(e) => {
                warn!(
                    address = %address,
                    name,
                    error = %e,
                    "sync failed, backup kept"
                );
                return Err(match e {
                    CoreError::Io { .. } | CoreError::Config { .. } => e,
                    other => CoreError::SyncFailed {
                        address: address.to_string(),
                        reason: other.to_string(),
                    },
                });
            }
        };

        let new_rows = count_rows(&data_path).await?;
        let previous_rows = if exists(&backup_path).await? {
            Some(count_rows(&backup_path).await?)
        } else {
            None
        };

        if let Some(old_rows) = previous_rows {
            if new_rows < old_rows {
                error!(
                    address = %address,
                    name,
                    old_rows,
                    new_rows,
                    "row count went backwards, backup kept for inspection"
                );
                return Err(CoreError::DataRegression {
                    name: name.to_owned(),
                    old_rows,
                    new_rows,
                });
            }
            tokio::fs::remove_file(&backup_path)
                .await
                .map_err(|e| CoreError::io(&backup_path, e))?;
        }

        let report = SyncReport {
            address: address.clone(),
            name: name.to_owned(),
            bytes_written,
            rows: new_rows,
            previous_rows,
        };
        info!(
            address = %address,
            name,
            rows = report.rows,
            new_rows = report.new_rows(),
            bytes = report.bytes_written,
            "sync complete"
        );
        Ok(report)
    }

    fn local_device(&self) -> Result<&LocalDevice, CoreError> {
        self.transport.local().ok_or_else(|| CoreError::Config {
            message: "address 'self' is listed but no local device is configured".into(),
        })
    }
}

/// Move the current copy aside.
///
/// A backup left by an interrupted sync is the better baseline unless the
/// current copy has grown past it.
async fn stash_backup(data_path: &Path, backup_path: &Path) -> Result<(), CoreError> {
    if !exists(data_path).await? {
        return Ok(());
    }

    if exists(backup_path).await? {
        let data_rows = count_rows(data_path).await?;
        let backup_rows = count_rows(backup_path).await?;
        if data_rows <= backup_rows {
            warn!(
                path = %backup_path.display(),
                backup_rows,
                data_rows,
                "keeping backup from an interrupted sync as baseline"
            );
            // The copy may be a link to a live file; never write through it.
            return remove_if_exists(data_path).await;
        }
        debug!(backup_rows, data_rows, "current copy supersedes stale backup");
    }

    tokio::fs::rename(data_path, backup_path)
        .await
        .map_err(|e| CoreError::io(data_path, e))
}

/// Point `data_path` at the local device's file, copying when a hard link
/// is not possible.
async fn link_local(device: &LocalDevice, data_path: &Path) -> Result<u64, CoreError> {
    remove_if_exists(data_path).await?;

    let source = device.data_path();
    match tokio::fs::hard_link(source, data_path).await {
        Ok(()) => tokio::fs::metadata(data_path)
            .await
            .map(|m| m.len())
            .map_err(|e| CoreError::io(data_path, e)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(CoreError::io(source, e)),
        Err(e) => {
            debug!(error = %e, "hard link failed, copying local data instead");
            device.copy_data_to(data_path).await
        }
    }
}

async fn remove_if_exists(path: &Path) -> Result<(), CoreError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(CoreError::io(path, e)),
    }
}

async fn same_file(a: &Path, b: &Path) -> bool {
    match (tokio::fs::canonicalize(a).await, tokio::fs::canonicalize(b).await) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::{HubConfig, LocalDeviceConfig};
    use crate::local::test_device;
    use pretty_assertions::assert_eq;
    use tokio::io::AsyncWriteExt;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn csv(rows: usize) -> String {
        let mut body = String::from("time,air,temp\n");
        for i in 1..rows {
            body.push_str(&format!("2021-06-01 12:00:{:02},{i},21.5\n", i % 60));
        }
        body
    }

    fn reconciler(dir: &Path, config: HubConfig) -> Reconciler {
        let transport = FleetTransport::new(&config).unwrap();
        Reconciler::new(Storage::new(dir), Arc::new(transport))
    }

    async fn serve_data(body: String) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;
        server
    }

    fn remote(server: &MockServer) -> DeviceAddress {
        DeviceAddress::Remote(server.address().to_string())
    }

    #[tokio::test]
    async fn first_sync_creates_copy_without_backup() {
        let dir = tempfile::tempdir().unwrap();
        let server = serve_data(csv(3)).await;
        let rec = reconciler(dir.path(), HubConfig::new(dir.path()));

        let report = rec.sync_once(&remote(&server), "attic").await.unwrap();

        assert_eq!(report.rows, 3);
        assert_eq!(report.previous_rows, None);
        assert_eq!(report.new_rows(), 3);
        let storage = rec.storage();
        assert_eq!(
            std::fs::read_to_string(storage.data_path("attic").unwrap()).unwrap(),
            csv(3)
        );
        assert!(!storage.backup_path("attic").unwrap().exists());
    }

    #[tokio::test]
    async fn repeated_sync_is_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let server = serve_data(csv(10)).await;
        let rec = reconciler(dir.path(), HubConfig::new(dir.path()));
        let addr = remote(&server);
        let data_path = rec.storage().data_path("attic").unwrap();

        rec.sync_once(&addr, "attic").await.unwrap();
        let first = std::fs::read(&data_path).unwrap();
        let report = rec.sync_once(&addr, "attic").await.unwrap();
        let second = std::fs::read(&data_path).unwrap();

        assert_eq!(first, second);
        assert_eq!(report.previous_rows, Some(10));
        assert_eq!(report.new_rows(), 0);
        assert!(!rec.storage().backup_path("attic").unwrap().exists());
    }

    #[tokio::test]
    async fn row_count_never_decreases_while_device_grows() {
        let dir = tempfile::tempdir().unwrap();
        let rec = reconciler(dir.path(), HubConfig::new(dir.path()));
        let server = MockServer::start().await;
        let addr = remote(&server);

        let mut last = 0;
        for rows in [1, 2, 2, 5, 40] {
            server.reset().await;
            Mock::given(method("GET"))
                .and(path("/data"))
                .respond_with(ResponseTemplate::new(200).set_body_string(csv(rows)))
                .mount(&server)
                .await;

            let report = rec.sync_once(&addr, "porch").await.unwrap();
            assert!(report.rows >= last);
            last = report.rows;
        }
        assert_eq!(last, 40);
    }

    #[tokio::test]
    async fn regression_is_rejected_and_new_copy_kept() {
        let dir = tempfile::tempdir().unwrap();
        let rec = reconciler(dir.path(), HubConfig::new(dir.path()));
        let data_path = rec.storage().data_path("d1").unwrap();
        std::fs::write(&data_path, csv(100)).unwrap();
        let server = serve_data(csv(95)).await;

        let err = rec.sync_once(&remote(&server), "d1").await.unwrap_err();

        assert!(
            matches!(
                err,
                CoreError::DataRegression { ref name, old_rows: 100, new_rows: 95 } if name == "d1"
            ),
            "got {err:?}"
        );
        assert_eq!(std::fs::read_to_string(&data_path).unwrap(), csv(95));
        assert_eq!(
            std::fs::read_to_string(rec.storage().backup_path("d1").unwrap()).unwrap(),
            csv(100)
        );
    }

    #[tokio::test]
    async fn http_error_keeps_backup() {
        let dir = tempfile::tempdir().unwrap();
        let rec = reconciler(dir.path(), HubConfig::new(dir.path()));
        let data_path = rec.storage().data_path("attic").unwrap();
        std::fs::write(&data_path, csv(4)).unwrap();

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = rec.sync_once(&remote(&server), "attic").await.unwrap_err();

        assert!(matches!(err, CoreError::SyncFailed { .. }), "got {err:?}");
        assert!(!data_path.exists());
        assert_eq!(
            std::fs::read_to_string(rec.storage().backup_path("attic").unwrap()).unwrap(),
            csv(4)
        );
    }

    #[tokio::test]
    async fn mid_stream_cutoff_keeps_backup() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = tokio::io::AsyncReadExt::read(&mut socket, &mut buf).await;
            socket
                .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 4096\r\n\r\ntime,air,temp\n")
                .await
                .unwrap();
            socket.shutdown().await.unwrap();
        });

        let dir = tempfile::tempdir().unwrap();
        let rec = reconciler(dir.path(), HubConfig::new(dir.path()));
        let data_path = rec.storage().data_path("attic").unwrap();
        let backup_path = rec.storage().backup_path("attic").unwrap();
        std::fs::write(&data_path, csv(7)).unwrap();

        let err = rec
            .sync_once(&DeviceAddress::Remote(addr.to_string()), "attic")
            .await
            .unwrap_err();

        assert!(matches!(err, CoreError::SyncFailed { .. }), "got {err:?}");
        assert_eq!(std::fs::read_to_string(&backup_path).unwrap(), csv(7));
        assert!(data_path.exists());
    }

    #[tokio::test]
    async fn interrupted_backup_stays_baseline() {
        let dir = tempfile::tempdir().unwrap();
        let rec = reconciler(dir.path(), HubConfig::new(dir.path()));
        let storage = rec.storage().clone();
        storage.ensure_layout().await.unwrap();
        std::fs::write(storage.backup_path("attic").unwrap(), csv(20)).unwrap();
        // Partial copy from the interrupted sync.
        std::fs::write(storage.data_path("attic").unwrap(), csv(2)).unwrap();
        let server = serve_data(csv(22)).await;

        let report = rec.sync_once(&remote(&server), "attic").await.unwrap();

        assert_eq!(report.previous_rows, Some(20));
        assert_eq!(report.rows, 22);
        assert!(!storage.backup_path("attic").unwrap().exists());
    }

    #[tokio::test]
    async fn larger_copy_replaces_stale_backup() {
        let dir = tempfile::tempdir().unwrap();
        let rec = reconciler(dir.path(), HubConfig::new(dir.path()));
        let storage = rec.storage().clone();
        storage.ensure_layout().await.unwrap();
        std::fs::write(storage.backup_path("attic").unwrap(), csv(3)).unwrap();
        std::fs::write(storage.data_path("attic").unwrap(), csv(9)).unwrap();
        let server = serve_data(csv(5)).await;

        let err = rec.sync_once(&remote(&server), "attic").await.unwrap_err();

        assert!(matches!(
            err,
            CoreError::DataRegression { old_rows: 9, new_rows: 5, .. }
        ));
    }

    #[tokio::test]
    async fn local_device_is_linked_not_streamed() {
        let dir = tempfile::tempdir().unwrap();
        let sensor_dir = dir.path().join("sensor");
        std::fs::create_dir_all(&sensor_dir).unwrap();
        let device = test_device(&sensor_dir, "hub", &csv(3));
        let storage_dir = dir.path().join("storage");
        let config = HubConfig::new(&storage_dir).with_local_device(LocalDeviceConfig {
            name: "hub".into(),
            update_interval_secs: 1,
            data_path: device.data_path().to_path_buf(),
        });
        let rec = reconciler(&storage_dir, config);

        let report = rec.sync_once(&DeviceAddress::Local, "hub").await.unwrap();
        assert_eq!(report.rows, 3);

        let mut file = tokio::fs::OpenOptions::new()
            .append(true)
            .open(device.data_path())
            .await
            .unwrap();
        file.write_all(b"2021-06-01 13:00:00,9,22.0\n").await.unwrap();
        drop(file);

        let report = rec.sync_once(&DeviceAddress::Local, "hub").await.unwrap();
        assert_eq!(report.previous_rows, Some(4));
        assert_eq!(report.rows, 4);
        assert_eq!(
            std::fs::read(rec.storage().data_path("hub").unwrap()).unwrap(),
            std::fs::read(device.data_path()).unwrap()
        );
    }

    #[tokio::test]
    async fn baseline_backup_never_truncates_linked_sensor_file() {
        let dir = tempfile::tempdir().unwrap();
        let sensor_dir = dir.path().join("sensor");
        std::fs::create_dir_all(&sensor_dir).unwrap();
        let device = test_device(&sensor_dir, "hub", &csv(50));
        let storage_dir = dir.path().join("storage");
        let config = HubConfig::new(&storage_dir).with_local_device(LocalDeviceConfig {
            name: "hub".into(),
            update_interval_secs: 1,
            data_path: device.data_path().to_path_buf(),
        });
        let rec = reconciler(&storage_dir, config);
        rec.sync_once(&DeviceAddress::Local, "hub").await.unwrap();

        // Leftover backup, then a remote device reporting the same name.
        let backup_path = rec.storage().backup_path("hub").unwrap();
        std::fs::write(&backup_path, csv(100)).unwrap();
        let server = serve_data(csv(2)).await;

        let err = rec.sync_once(&remote(&server), "hub").await.unwrap_err();

        assert!(matches!(
            err,
            CoreError::DataRegression { old_rows: 100, new_rows: 2, .. }
        ));
        assert_eq!(std::fs::read_to_string(device.data_path()).unwrap(), csv(50));
        assert_eq!(std::fs::read_to_string(&backup_path).unwrap(), csv(100));
    }

    #[tokio::test]
    async fn invalid_name_touches_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let rec = reconciler(dir.path(), HubConfig::new(dir.path()));
        let err = rec
            .sync_once(&DeviceAddress::Remote("127.0.0.1:1".into()), "../escape")
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidName { .. }));
        assert!(!rec.storage().backup_dir().exists());
    }
}
