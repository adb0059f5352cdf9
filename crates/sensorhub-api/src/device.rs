// Device HTTP client
//
// Wraps `reqwest::Client` with device URL construction, status document
// parsing, and chunked streaming of the raw data file to disk.

use std::net::{IpAddr, SocketAddr};
use std::path::Path;

use tokio::io::AsyncWriteExt;
use tracing::{debug, trace};
use url::Url;

use crate::error::Error;
use crate::models::StatusResponse;
use crate::transport::TransportConfig;

/// Port devices serve their HTTP surface on when the address carries none.
pub const DEFAULT_DEVICE_PORT: u16 = 8000;

const STATUS_PATH: &str = "status.json";
const DATA_PATH: &str = "data";

/// HTTP client bound to a single device.
///
/// Cheap to clone: the underlying `reqwest::Client` is reference counted,
/// so one pool is shared by every device of the fleet.
#[derive(Debug, Clone)]
pub struct DeviceClient {
    http: reqwest::Client,
    base_url: Url,
    timeout: std::time::Duration,
}

impl DeviceClient {
    /// Create a new device client from a `TransportConfig`.
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self {
            http,
            base_url,
            timeout: transport.timeout,
        })
    }

    /// Create a device client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url, transport: &TransportConfig) -> Self {
        Self {
            http,
            base_url,
            timeout: transport.timeout,
        }
    }

    /// Build the base URL for a device address.
    ///
    /// Accepts `host`, `ip`, `ip:port`, `[v6]:port`, or a full `http(s)://`
    /// URL. `default_port` applies when the address names no port.
    pub fn base_url_for(address: &str, default_port: u16) -> Result<Url, Error> {
        let address = address.trim();
        if address.is_empty() {
            return Err(Error::InvalidAddress {
                address: address.into(),
                reason: "address is empty".into(),
            });
        }

        if address.starts_with("http://") || address.starts_with("https://") {
            return Ok(Url::parse(address)?);
        }

        let authority = if let Ok(socket) = address.parse::<SocketAddr>() {
            socket.to_string()
        } else if let Ok(ip) = address.parse::<IpAddr>() {
            SocketAddr::new(ip, default_port).to_string()
        } else if address.contains(':') {
            address.to_owned()
        } else {
            format!("{address}:{default_port}")
        };

        let url = Url::parse(&format!("http://{authority}/")).map_err(|e| {
            Error::InvalidAddress {
                address: address.into(),
                reason: e.to_string(),
            }
        })?;
        if url.host_str().is_none() {
            return Err(Error::InvalidAddress {
                address: address.into(),
                reason: "no host".into(),
            });
        }
        Ok(url)
    }

    /// The device base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── URL builders ─────────────────────────────────────────────────

    fn endpoint_url(&self, path: &str) -> Result<Url, Error> {
        let base = self.base_url.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{base}/{path}"))?)
    }

    /// `{base}/status.json`
    pub fn status_url(&self) -> Result<Url, Error> {
        self.endpoint_url(STATUS_PATH)
    }

    /// `{base}/data`
    pub fn data_url(&self) -> Result<Url, Error> {
        self.endpoint_url(DATA_PATH)
    }

    // ── Endpoints ────────────────────────────────────────────────────

    /// Fetch and parse the device status document.
    pub async fn get_status(&self) -> Result<StatusResponse, Error> {
        let url = self.status_url()?;
        debug!("GET {}", url);

        let resp = self
            .http
            .get(url.clone())
            .timeout(self.timeout)
            .send()
            .await
            .map_err(Error::Transport)?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = resp.text().await.map_err(Error::Transport)?;
        serde_json::from_str(&body).map_err(|e| {
            let preview: String = body.chars().take(200).collect();
            Error::Deserialization {
                message: format!("{e} (body preview: {preview:?})"),
                body: body.clone(),
            }
        })
    }

    /// Stream the device's raw data file into `destination`.
    ///
    /// The body is written chunk by chunk as it arrives; it is never held
    /// in memory in full. Returns the number of bytes written. On a
    /// mid-body failure the partial file is left on disk.
    pub async fn stream_data_to(&self, destination: &Path) -> Result<u64, Error> {
        let url = self.data_url()?;
        debug!("GET {} -> {}", url, destination.display());

        let mut resp = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(Error::Transport)?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let io_err = |source: std::io::Error| Error::Io {
            path: destination.to_path_buf(),
            source,
        };

        let mut file = tokio::fs::File::create(destination).await.map_err(io_err)?;
        let mut written: u64 = 0;

        loop {
            let chunk = match resp.chunk().await {
                Ok(Some(chunk)) => chunk,
                Ok(None) => break,
                Err(e) => {
                    // Keep whatever arrived so the caller can inspect it.
                    let _ = file.flush().await;
                    return Err(Error::StreamInterrupted {
                        url: url.to_string(),
                        bytes_written: written,
                        reason: e.to_string(),
                    });
                }
            };
            file.write_all(&chunk).await.map_err(io_err)?;
            written += u64::try_from(chunk.len()).unwrap_or(u64::MAX);
            trace!(bytes = written, "data chunk written");
        }

        file.flush().await.map_err(io_err)?;
        file.sync_all().await.map_err(io_err)?;
        Ok(written)
    }
}

// ── DevicePool ───────────────────────────────────────────────────────

/// Vends [`DeviceClient`]s for arbitrary addresses over one shared
/// connection pool.
#[derive(Debug, Clone)]
pub struct DevicePool {
    http: reqwest::Client,
    transport: TransportConfig,
    default_port: u16,
}

impl DevicePool {
    pub fn new(transport: TransportConfig, default_port: u16) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self {
            http,
            transport,
            default_port,
        })
    }

    /// Client for the device at `address` (see [`DeviceClient::base_url_for`]).
    pub fn client_for(&self, address: &str) -> Result<DeviceClient, Error> {
        let base_url = DeviceClient::base_url_for(address, self.default_port)?;
        Ok(DeviceClient::with_client(
            self.http.clone(),
            base_url,
            &self.transport,
        ))
    }

    pub fn default_port(&self) -> u16 {
        self.default_port
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn pool_vends_clients_with_default_port() {
        let pool = DevicePool::new(TransportConfig::default(), 8123).unwrap();
        let client = pool.client_for("192.168.1.9").unwrap();
        assert_eq!(client.base_url().as_str(), "http://192.168.1.9:8123/");
        assert!(pool.client_for("").is_err());
    }

    #[test]
    fn base_url_adds_default_port_to_bare_ip() {
        let url = DeviceClient::base_url_for("192.168.1.20", DEFAULT_DEVICE_PORT).unwrap();
        assert_eq!(url.as_str(), "http://192.168.1.20:8000/");
    }

    #[test]
    fn base_url_keeps_explicit_port() {
        let url = DeviceClient::base_url_for("10.0.0.5:9000", DEFAULT_DEVICE_PORT).unwrap();
        assert_eq!(url.as_str(), "http://10.0.0.5:9000/");
    }

    #[test]
    fn base_url_brackets_ipv6() {
        let url = DeviceClient::base_url_for("fe80::1", 8000).unwrap();
        assert_eq!(url.as_str(), "http://[fe80::1]:8000/");
    }

    #[test]
    fn base_url_accepts_hostnames_and_full_urls() {
        let url = DeviceClient::base_url_for("attic-pi.local", 8000).unwrap();
        assert_eq!(url.as_str(), "http://attic-pi.local:8000/");

        let url = DeviceClient::base_url_for("http://127.0.0.1:4321", 8000).unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:4321/");
    }

    #[test]
    fn base_url_rejects_empty() {
        assert!(matches!(
            DeviceClient::base_url_for("  ", 8000),
            Err(Error::InvalidAddress { .. })
        ));
    }

    #[test]
    fn endpoint_urls() {
        let base = DeviceClient::base_url_for("10.0.0.5", 8000).unwrap();
        let client = DeviceClient::new(base, &TransportConfig::default()).unwrap();
        assert_eq!(client.status_url().unwrap().as_str(), "http://10.0.0.5:8000/status.json");
        assert_eq!(client.data_url().unwrap().as_str(), "http://10.0.0.5:8000/data");
    }
}
