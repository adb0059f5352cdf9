// ── Hub storage layout ──
//
// One CSV per device name under the storage root, plus a `backup/`
// directory holding at most one in-flight backup per device.

use std::path::{Path, PathBuf};

use tokio::io::AsyncReadExt;
use tracing::warn;

use crate::error::CoreError;
use crate::model::validate_device_name;

const BACKUP_DIR: &str = "backup";
const DATA_EXTENSION: &str = "csv";
const COUNT_CHUNK: usize = 64 * 1024;

/// Paths of the hub's local copies.
#[derive(Debug, Clone)]
pub struct Storage {
    root: PathBuf,
}

impl Storage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn backup_dir(&self) -> PathBuf {
        self.root.join(BACKUP_DIR)
    }

    /// `<root>/<name>.csv`
    pub fn data_path(&self, name: &str) -> Result<PathBuf, CoreError> {
        validate_device_name(name)?;
        Ok(self.root.join(format!("{name}.{DATA_EXTENSION}")))
    }

    /// `<root>/backup/<name>.csv`
    pub fn backup_path(&self, name: &str) -> Result<PathBuf, CoreError> {
        validate_device_name(name)?;
        Ok(self.backup_dir().join(format!("{name}.{DATA_EXTENSION}")))
    }

    /// Create the root and backup directories if missing.
    pub async fn ensure_layout(&self) -> Result<(), CoreError> {
        let backup = self.backup_dir();
        tokio::fs::create_dir_all(&backup)
            .await
            .map_err(|e| CoreError::io(&backup, e))
    }

    /// Device names with a backup still on disk.
    ///
    /// A leftover backup means a sync was interrupted before it could be
    /// verified; the next sync of that device uses it as its baseline.
    pub async fn pending_backups(&self) -> Result<Vec<String>, CoreError> {
        list_csv_stems(&self.backup_dir()).await
    }

    /// Names of all device copies currently stored.
    pub async fn stored_devices(&self) -> Result<Vec<String>, CoreError> {
        list_csv_stems(&self.root).await
    }

    /// Log every leftover backup. Called once at fleet start.
    pub async fn report_pending_backups(&self) {
        match self.pending_backups().await {
            Ok(names) => {
                for name in names {
                    warn!(name = %name, "found backup from an interrupted sync");
                }
            }
            Err(e) => warn!(error = %e, "could not scan backup directory"),
        }
    }
}

async fn list_csv_stems(dir: &Path) -> Result<Vec<String>, CoreError> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(CoreError::io(dir, e)),
    };

    let mut names = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| CoreError::io(dir, e))?
    {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some(DATA_EXTENSION) {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            names.push(stem.to_owned());
        }
    }
    names.sort();
    Ok(names)
}

/// Count lines in a file the way a line iterator does: every `\n`, plus
/// one for a trailing line without a terminator. The file is read in
/// bounded chunks.
pub async fn count_rows(path: &Path) -> Result<u64, CoreError> {
    let mut file = tokio::fs::File::open(path)
        .await
        .map_err(|e| CoreError::io(path, e))?;

    let mut buf = vec![0u8; COUNT_CHUNK];
    let mut rows: u64 = 0;
    let mut last_byte: Option<u8> = None;

    loop {
        let n = file
            .read(&mut buf)
            .await
            .map_err(|e| CoreError::io(path, e))?;
        if n == 0 {
            break;
        }
        let chunk = &buf[..n];
        rows += u64::try_from(bytecount(chunk)).unwrap_or(u64::MAX);
        last_byte = chunk.last().copied();
    }

    if matches!(last_byte, Some(b) if b != b'\n') {
        rows += 1;
    }
    Ok(rows)
}

fn bytecount(chunk: &[u8]) -> usize {
    chunk.iter().filter(|&&b| b == b'\n').count()
}

/// Whether `path` exists, treating permission errors as a hard failure.
pub(crate) async fn exists(path: &Path) -> Result<bool, CoreError> {
    tokio::fs::try_exists(path)
        .await
        .map_err(|e| CoreError::io(path, e))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn paths_follow_layout() {
        let storage = Storage::new("/var/lib/hub");
        assert_eq!(
            storage.data_path("attic").unwrap(),
            PathBuf::from("/var/lib/hub/attic.csv")
        );
        assert_eq!(
            storage.backup_path("attic").unwrap(),
            PathBuf::from("/var/lib/hub/backup/attic.csv")
        );
    }

    #[test]
    fn paths_reject_traversal() {
        let storage = Storage::new("/var/lib/hub");
        assert!(matches!(
            storage.data_path("../etc/passwd"),
            Err(CoreError::InvalidName { .. })
        ));
    }

    #[tokio::test]
    async fn count_rows_matches_line_iteration() {
        let dir = tempfile::tempdir().unwrap();
        let cases: [(&str, u64); 5] = [
            ("", 0),
            ("header\n", 1),
            ("header\n1,2\n", 2),
            ("header\n1,2", 2),
            ("\n\n\n", 3),
        ];
        for (i, (body, expected)) in cases.iter().enumerate() {
            let path = dir.path().join(format!("{i}.csv"));
            std::fs::write(&path, body).unwrap();
            assert_eq!(count_rows(&path).await.unwrap(), *expected, "body {body:?}");
        }
    }

    #[tokio::test]
    async fn count_rows_spans_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.csv");
        let line = "2021-06-01 12:00:00,1,2,3\n";
        std::fs::write(&path, line.repeat(10_000)).unwrap();
        assert_eq!(count_rows(&path).await.unwrap(), 10_000);
    }

    #[tokio::test]
    async fn count_rows_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = count_rows(&dir.path().join("nope.csv")).await.unwrap_err();
        assert!(matches!(err, CoreError::Io { .. }));
    }

    #[tokio::test]
    async fn pending_backups_lists_csv_files_only() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::new(dir.path());
        assert!(storage.pending_backups().await.unwrap().is_empty());

        storage.ensure_layout().await.unwrap();
        std::fs::write(storage.backup_path("b").unwrap(), "x\n").unwrap();
        std::fs::write(storage.backup_path("a").unwrap(), "x\n").unwrap();
        std::fs::write(storage.backup_dir().join("notes.txt"), "x").unwrap();

        assert_eq!(storage.pending_backups().await.unwrap(), ["a", "b"]);
    }
}
