//! Date-partitioned log locations: `<root>/<YYYY>/<YYYY-MM>/log-<YYYY-MM-DD>.log`.

use crate::error::LoggerError;
use chrono::NaiveDate;
use std::fs::DirBuilder;
use std::path::{Path, PathBuf};

/// Prefix shared by every file this crate writes.
pub const LOG_FILE_PREFIX: &str = "log-";
/// Extension shared by every file this crate writes.
pub const LOG_FILE_EXTENSION: &str = ".log";

/// Directory and file for one calendar day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogPaths {
    pub date: NaiveDate,
    pub dir: PathBuf,
    pub file: PathBuf,
}

impl LogPaths {
    /// Compute the partition for `date` under `root` without touching disk.
    pub fn for_date(root: &Path, date: NaiveDate) -> Self {
        let dir = root
            .join(date.format("%Y").to_string())
            .join(date.format("%Y-%m").to_string());
        let file = dir.join(log_file_name(date));
        Self { date, dir, file }
    }

    /// Where a rotated copy of today's file goes.
    pub fn backup_file(&self, unix_seconds: i64) -> PathBuf {
        self.dir.join(backup_file_name(self.date, unix_seconds))
    }
}

/// Compute the partition for `date` and create its directories.
///
/// Directories are created recursively with mode `0755` on unix. Failure
/// is fatal to the logger and returned as [`LoggerError::Init`].
pub fn ensure_partition(root: &Path, date: NaiveDate) -> Result<LogPaths, LoggerError> {
    let paths = LogPaths::for_date(root, date);

    let mut builder = DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o755);
    }

    builder.create(&paths.dir).map_err(|source| LoggerError::Init {
        path: paths.dir.clone(),
        source,
    })?;
    Ok(paths)
}

pub fn log_file_name(date: NaiveDate) -> String {
    format!("{}{}{}", LOG_FILE_PREFIX, date.format("%Y-%m-%d"), LOG_FILE_EXTENSION)
}

pub fn backup_file_name(date: NaiveDate, unix_seconds: i64) -> String {
    format!(
        "{}{}-{}{}",
        LOG_FILE_PREFIX,
        date.format("%Y-%m-%d"),
        unix_seconds,
        LOG_FILE_EXTENSION
    )
}

/// True for both `log-<date>.log` and rotated `log-<date>-<unix>.log` names.
pub fn is_log_file_name(name: &str) -> bool {
    name.len() > LOG_FILE_PREFIX.len() + LOG_FILE_EXTENSION.len()
        && name.starts_with(LOG_FILE_PREFIX)
        && name.ends_with(LOG_FILE_EXTENSION)
}
