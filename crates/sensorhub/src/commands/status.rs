//! `status`: fresh status of every configured device.

use sensorhub_core::{StatusEntry, StatusOutcome};
use tabled::Tabled;

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Tabled)]
struct StatusRow {
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Interval")]
    interval: String,
    #[tabled(rename = "Size")]
    size: String,
    #[tabled(rename = "Rows")]
    rows: String,
    #[tabled(rename = "Latest")]
    latest: String,
}

impl StatusRow {
    fn from_entry(entry: &StatusEntry, color: bool) -> Self {
        match &entry.outcome {
            StatusOutcome::Ok { status } => Self {
                address: entry.address.to_string(),
                name: output::ok_text(&status.name, color),
                interval: format!("{}s", status.update_interval_secs),
                size: util::human_bytes(status.data_size_bytes),
                rows: status.row_count.to_string(),
                latest: util::latest_summary(status),
            },
            StatusOutcome::Failed { kind, error } => Self {
                address: entry.address.to_string(),
                name: output::err_text(kind, color),
                interval: "-".into(),
                size: "-".into(),
                rows: "-".into(),
                latest: error.clone(),
            },
        }
    }
}

fn plain_line(entry: &StatusEntry) -> String {
    match &entry.outcome {
        StatusOutcome::Ok { status } => format!(
            "{}\t{}\t{}\t{}",
            entry.address, status.name, status.row_count, status.data_size_bytes
        ),
        StatusOutcome::Failed { kind, .. } => format!("{}\t{kind}", entry.address),
    }
}

pub async fn handle(global: &GlobalOpts) -> Result<(), CliError> {
    let (hub, cfg) = super::build_hub(global)?;
    let addresses = crate::config::addresses(global, &cfg)?;

    let entries = hub.statuses(&addresses).await;

    let color = output::should_color(&global.color);
    let out = output::render_list(
        &global.output,
        &entries,
        |e| StatusRow::from_entry(e, color),
        plain_line,
    );
    output::print_output(&out, global.quiet);
    Ok(())
}
