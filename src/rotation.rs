//! Size-based rotation and age-based retention of log files.

use crate::error::{report_fallback, LoggerError};
use crate::paths::{is_log_file_name, LogPaths};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::debug;

/// 10 MiB.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// 30 days.
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Move today's file aside once it has reached `max_size` bytes.
///
/// Returns the backup path when a rotation happened. The canonical path is
/// left absent; the next append recreates it.
pub fn rotate_if_needed(
    paths: &LogPaths,
    max_size: u64,
    unix_seconds: i64,
) -> Result<Option<PathBuf>, LoggerError> {
    let size = match fs::metadata(&paths.file) {
        Ok(meta) => meta.len(),
        Err(_) => return Ok(None),
    };
    if size < max_size {
        return Ok(None);
    }

    let backup = paths.backup_file(unix_seconds);
    fs::rename(&paths.file, &backup).map_err(|source| LoggerError::Rotate {
        path: paths.file.clone(),
        source,
    })?;
    debug!(from = %paths.file.display(), to = %backup.display(), size, "rotated log file");
    Ok(Some(backup))
}

/// Delete log files directly under `dir` whose modification time is at
/// least `retention` before `now`.
///
/// Only names matching the log naming pattern are considered. A file that
/// cannot be deleted is reported on the fallback channel and skipped.
/// Returns the number of deleted files; a missing directory deletes nothing.
pub fn prune_older_than(
    dir: &Path,
    retention: Duration,
    now: SystemTime,
) -> Result<usize, LoggerError> {
    let cutoff = now.checked_sub(retention).unwrap_or(SystemTime::UNIX_EPOCH);

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(source) => {
            return Err(LoggerError::Prune {
                path: dir.to_path_buf(),
                source,
            })
        }
    };

    let mut deleted = 0;
    for entry in entries.flatten() {
        let path = entry.path();
        let is_candidate = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(is_log_file_name)
            .unwrap_or(false);
        if !is_candidate {
            continue;
        }

        let Ok(meta) = entry.metadata() else { continue };
        if !meta.is_file() {
            continue;
        }
        let Ok(modified) = meta.modified() else { continue };
        if modified > cutoff {
            continue;
        }

        match fs::remove_file(&path) {
            Ok(()) => deleted += 1,
            // Someone else already removed it.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(source) => report_fallback(&LoggerError::Prune { path, source }),
        }
    }
    Ok(deleted)
}

/// Apply [`prune_older_than`] to every `<YYYY>/<YYYY-MM>` directory under
/// `root`.
///
/// Only an unreadable `root` is an error. A year or month directory that
/// cannot be listed is reported on stderr and skipped.
pub fn prune_tree(root: &Path, retention: Duration, now: SystemTime) -> Result<usize, LoggerError> {
    let mut deleted = 0;
    for year in subdirs(root)? {
        let months = match subdirs(&year) {
            Ok(months) => months,
            Err(e) => {
                report_fallback(&e);
                continue;
            }
        };
        for month in months {
            match prune_older_than(&month, retention, now) {
                Ok(n) => deleted += n,
                Err(e) => report_fallback(&e),
            }
        }
    }
    if deleted > 0 {
        debug!(root = %root.display(), deleted, "pruned expired log files");
    }
    Ok(deleted)
}

fn subdirs(dir: &Path) -> Result<Vec<PathBuf>, LoggerError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(LoggerError::Prune {
                path: dir.to_path_buf(),
                source,
            })
        }
    };
    Ok(entries
        .flatten()
        .filter(|e| e.file_type().map(|t| t.is_dir()).unwrap_or(false))
        .map(|e| e.path())
        .collect())
}
