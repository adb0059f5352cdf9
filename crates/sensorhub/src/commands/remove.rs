//! `remove`: delete stored device copies, logs, or the config file.

use std::path::Path;

use crate::cli::{GlobalOpts, RemoveArgs, RemoveTarget};
use crate::config;
use crate::error::CliError;
use crate::output;

use super::util;

/// Base name of the rolling hub log.
pub const LOG_FILE_PREFIX: &str = "hub.log";

pub fn handle(args: RemoveArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let cfg = config::load(global)?;
    let storage = config::storage_dir(global, &cfg);
    let config_file = config::config_path(global);

    let what = match args.target {
        RemoveTarget::Data => format!("all device data in {}", storage.display()),
        RemoveTarget::Logs => format!("hub logs in {}", storage.display()),
        RemoveTarget::Configs => format!("config file {}", config_file.display()),
        RemoveTarget::All => "all data, logs and configuration".to_owned(),
    };
    if !util::confirm(&format!("Delete {what}?"), "remove", global.yes)? {
        return Ok(());
    }

    let mut removed = 0;
    if matches!(args.target, RemoveTarget::Data | RemoveTarget::All) {
        removed += remove_matching(&storage, |name| {
            Path::new(name).extension().is_some_and(|e| e == "csv")
        })?;
        let backup = storage.join("backup");
        if backup.is_dir() {
            std::fs::remove_dir_all(&backup).map_err(|e| storage_err(&backup, e))?;
        }
    }
    if matches!(args.target, RemoveTarget::Logs | RemoveTarget::All) {
        removed += remove_matching(&storage, |name| name.starts_with(LOG_FILE_PREFIX))?;
    }
    if matches!(args.target, RemoveTarget::Configs | RemoveTarget::All) && config_file.is_file() {
        std::fs::remove_file(&config_file).map_err(|e| storage_err(&config_file, e))?;
        removed += 1;
    }

    output::print_note(&format!("Removed {removed} files"), global.quiet);
    Ok(())
}

/// Delete regular files in `dir` whose name matches. A missing `dir` is
/// not an error.
fn remove_matching(dir: &Path, select: impl Fn(&str) -> bool) -> Result<usize, CliError> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(storage_err(dir, e)),
    };

    let mut removed = 0;
    for entry in entries {
        let entry = entry.map_err(|e| storage_err(dir, e))?;
        let path = entry.path();
        let selected = path.is_file()
            && path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(&select);
        if selected {
            std::fs::remove_file(&path).map_err(|e| storage_err(&path, e))?;
            removed += 1;
        }
    }
    Ok(removed)
}

fn storage_err(path: &Path, source: std::io::Error) -> CliError {
    CliError::Storage {
        path: path.display().to_string(),
        source,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn removes_only_matching_files() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["a.csv", "b.csv", "hub.log", "hub.log.2024-01-01", "notes.txt"] {
            std::fs::write(dir.path().join(name), "x").unwrap();
        }

        let csv = remove_matching(dir.path(), |n| n.ends_with(".csv")).unwrap();
        let logs = remove_matching(dir.path(), |n| n.starts_with(LOG_FILE_PREFIX)).unwrap();

        assert_eq!(csv, 2);
        assert_eq!(logs, 2);
        assert!(dir.path().join("notes.txt").exists());
    }

    #[test]
    fn missing_directory_removes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(remove_matching(&dir.path().join("gone"), |_| true).unwrap(), 0);
    }
}
