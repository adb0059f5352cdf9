// ── Status aggregation ──

use futures_util::future::join_all;
use serde::Serialize;

use crate::model::{DeviceAddress, DeviceStatus};
use crate::transport::FleetTransport;

/// Status of one address, or why it could not be fetched.
#[derive(Debug, Clone, Serialize)]
pub struct StatusEntry {
    pub address: DeviceAddress,
    #[serde(flatten)]
    pub outcome: StatusOutcome,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StatusOutcome {
    Ok { status: DeviceStatus },
    Failed { kind: String, error: String },
}

impl StatusEntry {
    pub fn status(&self) -> Option<&DeviceStatus> {
        match &self.outcome {
            StatusOutcome::Ok { status } => Some(status),
            StatusOutcome::Failed { .. } => None,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status().is_some()
    }
}

/// Fetch every address's status concurrently.
///
/// Results come back in input order; a failed address holds an error
/// marker in its slot and never affects the others.
pub async fn get_all_statuses(
    transport: &FleetTransport,
    addresses: &[DeviceAddress],
) -> Vec<StatusEntry> {
    let results = join_all(addresses.iter().map(|a| transport.fetch_status(a))).await;

    addresses
        .iter()
        .zip(results)
        .map(|(address, result)| StatusEntry {
            address: address.clone(),
            outcome: match result {
                Ok(status) => StatusOutcome::Ok { status },
                Err(e) => StatusOutcome::Failed {
                    kind: e.kind().to_owned(),
                    error: e.to_string(),
                },
            },
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::{HubConfig, LocalDeviceConfig};
    use crate::local::test_device;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn device(name: &str, rows: u64) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/status.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "device_configs": { "name": name, "update_interval": 5 },
                "data_details": { "file_size": 512, "n_rows": rows },
                "latest_reading": { "time": "2021-06-01 12:00:00", "air": 3 }
            })))
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn one_unreachable_of_three_keeps_order() {
        let a = device("kitchen", 10).await;
        let c = device("cellar", 30).await;
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let dead = listener.local_addr().unwrap();
        drop(listener);

        let addresses = [
            DeviceAddress::Remote(a.address().to_string()),
            DeviceAddress::Remote(dead.to_string()),
            DeviceAddress::Remote(c.address().to_string()),
        ];
        let transport = FleetTransport::new(&HubConfig::default()).unwrap();

        let entries = get_all_statuses(&transport, &addresses).await;

        assert_eq!(entries.len(), 3);
        assert_eq!(entries.iter().filter(|e| !e.is_ok()).count(), 1);
        assert_eq!(entries[0].status().unwrap().name, "kitchen");
        assert!(matches!(
            entries[1].outcome,
            StatusOutcome::Failed { ref kind, .. } if kind == "unreachable"
        ));
        assert_eq!(entries[2].status().unwrap().row_count, 30);
        for (entry, address) in entries.iter().zip(&addresses) {
            assert_eq!(&entry.address, address);
        }
    }

    #[tokio::test]
    async fn local_device_is_included() {
        let dir = tempfile::tempdir().unwrap();
        let device = test_device(dir.path(), "hub", "time,air\n1,2\n");
        let config = HubConfig::new(dir.path()).with_local_device(LocalDeviceConfig {
            name: "hub".into(),
            update_interval_secs: 2,
            data_path: device.data_path().to_path_buf(),
        });
        let transport = FleetTransport::new(&config).unwrap();

        let entries = get_all_statuses(&transport, &[DeviceAddress::Local]).await;

        assert_eq!(entries[0].status().unwrap().name, "hub");
    }

    #[test]
    fn failed_entry_serializes_flat() {
        let entry = StatusEntry {
            address: DeviceAddress::Remote("10.0.0.9".into()),
            outcome: StatusOutcome::Failed {
                kind: "unreachable".into(),
                error: "connection refused".into(),
            },
        };
        assert_eq!(
            serde_json::to_value(&entry).unwrap(),
            json!({
                "address": "10.0.0.9",
                "outcome": "failed",
                "kind": "unreachable",
                "error": "connection refused"
            })
        );
    }
}
