//! `run`: validate the fleet, then poll until interrupted.

use std::time::Duration;

use tracing::info;

use crate::cli::{GlobalOpts, RunArgs};
use crate::config;
use crate::error::CliError;
use crate::output;

use super::validate::tolerance;

pub async fn handle(args: RunArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let cfg = config::load(global)?;
    let addresses = config::addresses(global, &cfg)?;
    let mut hub_config = config::hub_config(global, &cfg)?;
    if let Some(secs) = args.interval {
        if secs == 0 {
            return Err(CliError::Validation {
                field: "interval".into(),
                reason: "must be greater than zero".into(),
            });
        }
        hub_config.poll_interval = Duration::from_secs(secs);
    }
    let interval = hub_config.poll_interval;
    let hub = sensorhub_core::Hub::new(hub_config)?;

    // An ambiguous fleet would mix data of different devices.
    let identities = hub
        .validate_names(&addresses, tolerance(args.allow_partial))
        .await?;
    info!(devices = identities.len(), "device names validated");

    let fleet = hub.start_fleet(&addresses).await?;
    output::print_note(
        &format!(
            "Polling {} devices every {} (Ctrl-C to stop)",
            fleet.poller_count(),
            humantime::format_duration(interval)
        ),
        global.quiet,
    );

    tokio::signal::ctrl_c().await?;
    info!("interrupt received, stopping pollers");
    fleet.shutdown().await;
    Ok(())
}
