//! CLI-side config resolution: `GlobalOpts` overrides on top of the
//! shared `sensorhub-config` loader.

use std::path::PathBuf;
use std::time::Duration;

use sensorhub_config::Config;
use sensorhub_core::{DeviceAddress, HubConfig};

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Config file in effect: `--config`, else the platform default.
pub fn config_path(global: &GlobalOpts) -> PathBuf {
    global
        .config
        .clone()
        .unwrap_or_else(sensorhub_config::config_path)
}

pub fn load(global: &GlobalOpts) -> Result<Config, CliError> {
    Ok(sensorhub_config::load_config_from(&config_path(global))?)
}

pub fn save(global: &GlobalOpts, cfg: &Config) -> Result<(), CliError> {
    Ok(sensorhub_config::save_config_to(cfg, &config_path(global))?)
}

/// Storage directory in effect: `--storage-dir`, else config, else default.
pub fn storage_dir(global: &GlobalOpts, cfg: &Config) -> PathBuf {
    global
        .storage_dir
        .clone()
        .unwrap_or_else(|| cfg.storage_dir())
}

/// Build a `HubConfig` from the config file plus CLI overrides.
pub fn hub_config(global: &GlobalOpts, cfg: &Config) -> Result<HubConfig, CliError> {
    let mut hub = sensorhub_config::to_hub_config(cfg)?;
    hub.storage_dir = storage_dir(global, cfg);
    if let Some(secs) = global.timeout {
        hub.timeout = Duration::from_secs(secs);
    }
    Ok(hub)
}

/// The stored address list; an empty list is an error.
pub fn addresses(global: &GlobalOpts, cfg: &Config) -> Result<Vec<DeviceAddress>, CliError> {
    let addresses = cfg.device_addresses()?;
    if addresses.is_empty() {
        return Err(CliError::NoAddresses {
            path: config_path(global).display().to_string(),
        });
    }
    Ok(addresses)
}
