//! `sync`: one reconcile pass outside the polling schedule.

use sensorhub_core::{CoreError, DeviceAddress, SyncReport};
use serde::Serialize;
use tabled::Tabled;

use crate::cli::{GlobalOpts, SyncArgs};
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Serialize)]
struct SyncOutcome {
    address: DeviceAddress,
    #[serde(skip_serializing_if = "Option::is_none")]
    report: Option<SyncReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Tabled)]
struct SyncRow {
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Rows")]
    rows: String,
    #[tabled(rename = "New")]
    new_rows: String,
    #[tabled(rename = "Written")]
    written: String,
    #[tabled(rename = "Result")]
    result: String,
}

impl SyncRow {
    fn from_outcome(outcome: &SyncOutcome, color: bool) -> Self {
        match (&outcome.report, &outcome.error) {
            (Some(r), _) => Self {
                address: outcome.address.to_string(),
                name: r.name.clone(),
                rows: r.rows.to_string(),
                new_rows: r.new_rows().to_string(),
                written: util::human_bytes(r.bytes_written),
                result: output::ok_text("ok", color),
            },
            (None, error) => Self {
                address: outcome.address.to_string(),
                name: "-".into(),
                rows: "-".into(),
                new_rows: "-".into(),
                written: "-".into(),
                result: output::err_text(error.as_deref().unwrap_or("failed"), color),
            },
        }
    }
}

pub async fn handle(args: SyncArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let (hub, cfg) = super::build_hub(global)?;

    let targets: Vec<DeviceAddress> = match args.address {
        Some(raw) => vec![raw.parse::<DeviceAddress>()?],
        None => crate::config::addresses(global, &cfg)?
            .into_iter()
            .filter(|a| !a.is_local())
            .collect(),
    };

    // A single target surfaces its own error.
    if let [only] = targets.as_slice() {
        let report = hub.sync_device(only).await?;
        print(global, &[SyncOutcome {
            address: only.clone(),
            report: Some(report),
            error: None,
        }]);
        return Ok(());
    }

    let results = hub.sync_all(&targets).await;
    let total = results.len();
    let mut failed = 0;
    let outcomes: Vec<SyncOutcome> = results
        .into_iter()
        .map(|(address, result)| match result {
            Ok(report) => SyncOutcome {
                address,
                report: Some(report),
                error: None,
            },
            Err(e) => {
                failed += 1;
                SyncOutcome {
                    address,
                    report: None,
                    error: Some(describe(&e)),
                }
            }
        })
        .collect();

    print(global, &outcomes);
    if failed > 0 {
        return Err(CliError::SyncIncomplete { failed, total });
    }
    Ok(())
}

fn describe(err: &CoreError) -> String {
    format!("{}: {err}", err.kind())
}

fn print(global: &GlobalOpts, outcomes: &[SyncOutcome]) {
    let color = output::should_color(&global.color);
    let out = output::render_list(
        &global.output,
        outcomes,
        |o| SyncRow::from_outcome(o, color),
        |o| match &o.report {
            Some(r) => format!("{}\t{}\t{}", o.address, r.name, r.rows),
            None => format!("{}\tfailed", o.address),
        },
    );
    output::print_output(&out, global.quiet);
}
