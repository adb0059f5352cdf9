//! Shared helpers for command handlers.

use std::io::IsTerminal;

use bytesize::ByteSize;
use sensorhub_core::DeviceStatus;

use crate::error::CliError;

/// Prompt for confirmation, auto-approving if `--yes` was passed.
pub fn confirm(message: &str, action: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: action.into(),
        });
    }
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))?;
    Ok(confirmed)
}

/// `1.2 KiB`-style size.
pub fn human_bytes(bytes: u64) -> String {
    ByteSize::b(bytes).to_string()
}

/// `key=value` pairs of the latest reading, in column order.
pub fn latest_summary(status: &DeviceStatus) -> String {
    status
        .latest_reading
        .iter()
        .map(|(k, v)| match v {
            serde_json::Value::String(s) => format!("{k}={s}"),
            other => format!("{k}={other}"),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    #[test]
    fn latest_summary_keeps_column_order() {
        let mut latest_reading = IndexMap::new();
        latest_reading.insert("time".to_owned(), serde_json::json!("12:00"));
        latest_reading.insert("temp".to_owned(), serde_json::json!(21.5));
        latest_reading.insert("door".to_owned(), serde_json::Value::Null);
        let status = DeviceStatus {
            name: "attic".into(),
            update_interval_secs: 1,
            data_size_bytes: 0,
            row_count: 1,
            latest_reading,
        };
        assert_eq!(latest_summary(&status), "time=12:00 temp=21.5 door=null");
    }

    #[test]
    fn sizes_are_humanized() {
        assert_eq!(human_bytes(0), "0 B");
        assert!(human_bytes(2048).contains("KiB") || human_bytes(2048).contains("KB"));
    }
}
