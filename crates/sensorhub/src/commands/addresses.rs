//! `addresses`: store, print, or clear the device address list.

use serde::Serialize;
use tabled::Tabled;

use sensorhub_core::{DeviceAddress, Hub, NameTolerance};

use crate::cli::{AddressesArgs, AddressesCommand, GlobalOpts};
use crate::config;
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Serialize)]
struct AddressEntry {
    address: DeviceAddress,
    local: bool,
}

#[derive(Tabled)]
struct AddressRow {
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "Kind")]
    kind: &'static str,
}

impl From<&AddressEntry> for AddressRow {
    fn from(e: &AddressEntry) -> Self {
        Self {
            address: e.address.to_string(),
            kind: if e.local { "local" } else { "remote" },
        }
    }
}

pub async fn handle(args: AddressesArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        AddressesCommand::Set {
            file,
            skip_validation,
        } => {
            let text = std::fs::read_to_string(&file).map_err(|e| CliError::Storage {
                path: file.display().to_string(),
                source: e,
            })?;
            let addresses = sensorhub_config::parse_addresses(&text)?;

            let mut cfg = config::load(global)?;
            cfg.addresses = addresses.iter().map(ToString::to_string).collect();

            // Names are checked against the new list before it is stored.
            if !skip_validation && !addresses.is_empty() {
                let hub = Hub::new(config::hub_config(global, &cfg)?)?;
                hub.validate_names(&addresses, NameTolerance::Strict).await?;
            }

            config::save(global, &cfg)?;
            output::print_note(
                &format!(
                    "Stored {} addresses in {}",
                    addresses.len(),
                    config::config_path(global).display()
                ),
                global.quiet,
            );
            Ok(())
        }

        AddressesCommand::Show => {
            let cfg = config::load(global)?;
            let entries: Vec<AddressEntry> = cfg
                .device_addresses()?
                .into_iter()
                .map(|address| AddressEntry {
                    local: address.is_local(),
                    address,
                })
                .collect();
            let out = output::render_list(
                &global.output,
                &entries,
                |e| AddressRow::from(e),
                |e| e.address.to_string(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        AddressesCommand::Clear => {
            if !util::confirm("Clear the device address list?", "addresses clear", global.yes)? {
                return Ok(());
            }
            let mut cfg = config::load(global)?;
            cfg.addresses.clear();
            config::save(global, &cfg)?;
            output::print_note("Address list cleared", global.quiet);
            Ok(())
        }
    }
}
