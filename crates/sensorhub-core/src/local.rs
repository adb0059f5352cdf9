// ── Local device accessors ──
//
// The hub may itself carry sensors (the `self` address). Its status and
// data are served from the local sensor loop's CSV directly, without an
// HTTP round trip.

use std::io::SeekFrom;
use std::path::Path;

use indexmap::IndexMap;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncSeekExt, BufReader};

use crate::config::LocalDeviceConfig;
use crate::error::CoreError;
use crate::model::DeviceStatus;
use crate::storage::count_rows;

const TAIL_WINDOW: u64 = 8 * 1024;

/// In-process view of the hub's own device.
#[derive(Debug, Clone)]
pub struct LocalDevice {
    config: LocalDeviceConfig,
}

impl LocalDevice {
    pub fn new(config: LocalDeviceConfig) -> Self {
        Self { config }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// The CSV the local sensor loop appends to.
    pub fn data_path(&self) -> &Path {
        &self.config.data_path
    }

    /// Build a status snapshot from the local data file.
    pub async fn status(&self) -> Result<DeviceStatus, CoreError> {
        let path = self.data_path();
        let meta = tokio::fs::metadata(path)
            .await
            .map_err(|e| CoreError::io(path, e))?;
        let row_count = count_rows(path).await?;
        let latest_reading = latest_reading(path, meta.len()).await?;

        Ok(DeviceStatus {
            name: self.config.name.clone(),
            update_interval_secs: self.config.update_interval_secs,
            data_size_bytes: meta.len(),
            row_count,
            latest_reading,
        })
    }

    /// Copy the local data file to `destination` in bounded chunks.
    pub async fn copy_data_to(&self, destination: &Path) -> Result<u64, CoreError> {
        let source = self.data_path();
        let mut reader = tokio::fs::File::open(source)
            .await
            .map_err(|e| CoreError::io(source, e))?;
        let mut writer = tokio::fs::File::create(destination)
            .await
            .map_err(|e| CoreError::io(destination, e))?;
        let copied = tokio::io::copy(&mut reader, &mut writer)
            .await
            .map_err(|e| CoreError::io(destination, e))?;
        writer
            .sync_all()
            .await
            .map_err(|e| CoreError::io(destination, e))?;
        Ok(copied)
    }
}

/// Zip the header row with the last data row.
///
/// The first column is kept verbatim (the timestamp); the remaining
/// values become numbers where they parse, `null` where empty.
async fn latest_reading(
    path: &Path,
    len: u64,
) -> Result<IndexMap<String, serde_json::Value>, CoreError> {
    let mut reading = IndexMap::new();
    if len == 0 {
        return Ok(reading);
    }

    let file = tokio::fs::File::open(path)
        .await
        .map_err(|e| CoreError::io(path, e))?;
    let mut reader = BufReader::new(file);

    let mut header = String::new();
    reader
        .read_line(&mut header)
        .await
        .map_err(|e| CoreError::io(path, e))?;
    let header_len = u64::try_from(header.len()).unwrap_or(u64::MAX);
    if header_len >= len {
        return Ok(reading);
    }

    let start = len.saturating_sub(TAIL_WINDOW).max(header_len);
    let mut file = reader.into_inner();
    file.seek(SeekFrom::Start(start))
        .await
        .map_err(|e| CoreError::io(path, e))?;
    let mut tail = Vec::new();
    file.read_to_end(&mut tail)
        .await
        .map_err(|e| CoreError::io(path, e))?;

    let tail = String::from_utf8_lossy(&tail);
    let Some(last) = tail.lines().rev().find(|l| !l.trim().is_empty()) else {
        return Ok(reading);
    };

    let columns = header.trim_end().split(',');
    for (i, (key, raw)) in columns.zip(last.split(',')).enumerate() {
        let value = if i == 0 {
            serde_json::Value::String(raw.to_owned())
        } else {
            parse_cell(raw)
        };
        reading.insert(key.to_owned(), value);
    }
    Ok(reading)
}

fn parse_cell(raw: &str) -> serde_json::Value {
    let raw = raw.trim();
    if raw.is_empty() {
        return serde_json::Value::Null;
    }
    if let Ok(n) = raw.parse::<i64>() {
        return n.into();
    }
    raw.parse::<f64>()
        .ok()
        .and_then(serde_json::Number::from_f64)
        .map_or_else(
            || serde_json::Value::String(raw.to_owned()),
            serde_json::Value::Number,
        )
}

/// Fixture helper shared by tests across the crate.
#[cfg(test)]
pub(crate) fn test_device(dir: &Path, name: &str, body: &str) -> LocalDevice {
    let data_path = dir.join(format!("{name}-device.csv"));
    std::fs::write(&data_path, body).unwrap_or_else(|e| panic!("fixture write failed: {e}"));
    LocalDevice::new(LocalDeviceConfig {
        name: name.into(),
        update_interval_secs: 1,
        data_path,
    })
}
