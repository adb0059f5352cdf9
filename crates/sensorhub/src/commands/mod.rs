//! Command dispatch: bridges CLI args -> hub operations -> output formatting.

pub mod addresses;
pub mod remove;
pub mod run;
pub mod status;
pub mod sync;
pub mod util;
pub mod validate;

use sensorhub_core::Hub;

use crate::cli::{Command, GlobalOpts};
use crate::config;
use crate::error::CliError;

/// Dispatch a fleet-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Addresses(args) => addresses::handle(args, global).await,
        Command::Remove(args) => remove::handle(args, global),
        Command::Run(args) => run::handle(args, global).await,
        Command::Status => status::handle(global).await,
        Command::Validate(args) => validate::handle(args, global).await,
        Command::Sync(args) => sync::handle(args, global).await,
        // DataPath and Completions are handled before dispatch
        Command::DataPath | Command::Completions(_) => Ok(()),
    }
}

/// Load the config and build a `Hub` from it.
pub(crate) fn build_hub(global: &GlobalOpts) -> Result<(Hub, sensorhub_config::Config), CliError> {
    let cfg = config::load(global)?;
    let hub = Hub::new(config::hub_config(global, &cfg)?)?;
    Ok((hub, cfg))
}
