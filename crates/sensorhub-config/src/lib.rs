//! Configuration for the sensorhub CLI.
//!
//! A TOML file holds the device address list, the storage location and
//! the polling cadence. Env vars prefixed `SENSORHUB_` override it, and
//! [`to_hub_config`] translates the result into `sensorhub_core::HubConfig`.

use std::collections::HashSet;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use sensorhub_core::{DeviceAddress, HubConfig, LOCAL_ADDRESS, LocalDeviceConfig};

/// Env var naming an alternative config file.
pub const CONFIG_PATH_ENV: &str = "SENSORHUB_CONFIG";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("invalid address on line {line}: '{value}' ({reason})")]
    Address {
        line: usize,
        value: String,
        reason: String,
    },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// Fleet members: network addresses, or `self` for the hub's own device.
    #[serde(default)]
    pub addresses: Vec<String>,

    /// Where device copies are stored. Defaults to the platform data dir.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_dir: Option<PathBuf>,

    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_device_port")]
    pub device_port: u16,

    /// Required when `self` is among the addresses.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_device: Option<LocalDeviceSection>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addresses: Vec::new(),
            storage_dir: None,
            poll_interval_secs: default_poll_interval(),
            timeout_secs: default_timeout(),
            device_port: default_device_port(),
            local_device: None,
        }
    }
}

/// `[local_device]`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LocalDeviceSection {
    pub name: String,

    #[serde(default = "default_update_interval")]
    pub update_interval_secs: u64,

    /// CSV written by the hub's own sensor loop.
    pub data_path: PathBuf,
}

fn default_poll_interval() -> u64 {
    sensorhub_core::DEFAULT_POLL_INTERVAL.as_secs()
}
fn default_timeout() -> u64 {
    30
}
fn default_device_port() -> u16 {
    sensorhub_core::DEFAULT_DEVICE_PORT
}
fn default_update_interval() -> u64 {
    1
}

impl Config {
    /// Parsed and checked address list.
    pub fn device_addresses(&self) -> Result<Vec<DeviceAddress>, ConfigError> {
        self.addresses
            .iter()
            .enumerate()
            .map(|(i, raw)| parse_address(raw).map_err(|reason| address_error(i + 1, raw, reason)))
            .collect::<Result<Vec<_>, _>>()
            .and_then(|addresses| check_fleet(&addresses).map(|()| addresses))
    }

    /// Resolved storage directory.
    pub fn storage_dir(&self) -> PathBuf {
        self.storage_dir.clone().unwrap_or_else(default_storage_dir)
    }
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("io", "sensorhub", "sensorhub")
}

/// Resolve the config file path via `SENSORHUB_CONFIG` or platform
/// conventions.
pub fn config_path() -> PathBuf {
    if let Some(path) = std::env::var_os(CONFIG_PATH_ENV) {
        return PathBuf::from(path);
    }
    project_dirs().map_or_else(
        || home_fallback(".config").join("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Default root for device copies.
pub fn default_storage_dir() -> PathBuf {
    project_dirs().map_or_else(
        || home_fallback(".local/share"),
        |dirs| dirs.data_dir().to_path_buf(),
    )
}

fn home_fallback(sub: &str) -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(sub);
    p.push("sensorhub");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the Config from `path` + environment. A missing file yields the
/// defaults.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("SENSORHUB_").ignore(&["config"]).split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write it to `path`.
pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Address list ────────────────────────────────────────────────────

/// Parse an address list: one entry per line, blank lines and `#`
/// comments skipped.
///
/// Each entry is `self`, an IP address, `ip:port`, a hostname, or an
/// `http(s)://` URL. At most one `self` is allowed and no address may
/// repeat.
pub fn parse_addresses(text: &str) -> Result<Vec<DeviceAddress>, ConfigError> {
    let mut addresses = Vec::new();
    for (i, line) in text.lines().enumerate() {
        let entry = line.split('#').next().unwrap_or_default().trim();
        if entry.is_empty() {
            continue;
        }
        let address = parse_address(entry).map_err(|reason| address_error(i + 1, entry, reason))?;
        addresses.push(address);
    }
    check_fleet(&addresses)?;
    Ok(addresses)
}

fn address_error(line: usize, value: &str, reason: String) -> ConfigError {
    ConfigError::Address {
        line,
        value: value.to_owned(),
        reason,
    }
}

fn parse_address(raw: &str) -> Result<DeviceAddress, String> {
    let raw = raw.trim();
    if raw == LOCAL_ADDRESS {
        return Ok(DeviceAddress::Local);
    }
    if raw.is_empty() {
        return Err("empty address".into());
    }
    if raw.parse::<IpAddr>().is_ok() || raw.parse::<SocketAddr>().is_ok() {
        return Ok(DeviceAddress::Remote(raw.to_owned()));
    }

    let as_url = if raw.starts_with("http://") || raw.starts_with("https://") {
        raw.to_owned()
    } else {
        format!("http://{raw}")
    };
    let url = url::Url::parse(&as_url).map_err(|e| e.to_string())?;
    if url.host_str().is_none_or(str::is_empty) {
        return Err("no host".into());
    }
    if !url.username().is_empty() || url.query().is_some() || url.fragment().is_some() {
        return Err("expected a bare host, optionally with a port".into());
    }
    Ok(DeviceAddress::Remote(raw.to_owned()))
}

fn check_fleet(addresses: &[DeviceAddress]) -> Result<(), ConfigError> {
    let locals = addresses.iter().filter(|a| a.is_local()).count();
    if locals > 1 {
        return Err(ConfigError::Validation {
            field: "addresses".into(),
            reason: format!("'{LOCAL_ADDRESS}' is listed {locals} times"),
        });
    }

    let mut seen = HashSet::new();
    for address in addresses {
        if !seen.insert(address) {
            return Err(ConfigError::Validation {
                field: "addresses".into(),
                reason: format!("'{address}' is listed more than once"),
            });
        }
    }
    Ok(())
}

// ── Translation to HubConfig ────────────────────────────────────────

/// Build a `HubConfig` from the loaded file.
pub fn to_hub_config(cfg: &Config) -> Result<HubConfig, ConfigError> {
    let addresses = cfg.device_addresses()?;

    if cfg.poll_interval_secs == 0 {
        return Err(ConfigError::Validation {
            field: "poll_interval_secs".into(),
            reason: "must be greater than zero".into(),
        });
    }

    let local_device = match &cfg.local_device {
        Some(section) => {
            sensorhub_core::validate_device_name(&section.name).map_err(|e| {
                ConfigError::Validation {
                    field: "local_device.name".into(),
                    reason: e.to_string(),
                }
            })?;
            Some(LocalDeviceConfig {
                name: section.name.clone(),
                update_interval_secs: section.update_interval_secs,
                data_path: section.data_path.clone(),
            })
        }
        None if addresses.iter().any(DeviceAddress::is_local) => {
            return Err(ConfigError::Validation {
                field: "local_device".into(),
                reason: format!("required when '{LOCAL_ADDRESS}' is in the address list"),
            });
        }
        None => None,
    };

    Ok(HubConfig {
        storage_dir: cfg.storage_dir(),
        poll_interval: Duration::from_secs(cfg.poll_interval_secs),
        timeout: Duration::from_secs(cfg.timeout_secs),
        device_port: cfg.device_port,
        local_device,
    })
}
