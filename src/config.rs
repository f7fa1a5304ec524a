use crate::rotation::{DEFAULT_MAX_FILE_SIZE, DEFAULT_RETENTION};
use crate::severity::ErrorMask;
use std::path::PathBuf;
use std::time::Duration;

/// Settings for a [`RequestLogger`](crate::logger::RequestLogger).
///
/// **Fields**
/// - `root`: directory under which `<YYYY>/<YYYY-MM>/` partitions live.
/// - `max_file_size`: size in bytes at which today's file is rotated.
/// - `retention`: age after which log files are deleted.
/// - `operation_type`: application-wide operation tag, used when the
///   request does not carry its own `OPERATION_TYPE`.
/// - `error_mask`: severities the runtime-error handler records.
#[derive(Clone, Debug)]
pub struct LoggerConfig {
    pub root: PathBuf,
    pub max_file_size: u64,
    pub retention: Duration,
    pub operation_type: Option<String>,
    pub error_mask: ErrorMask,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("logs"),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            retention: DEFAULT_RETENTION,
            operation_type: None,
            error_mask: ErrorMask::ALL,
        }
    }
}

impl LoggerConfig {
    /// Defaults with a different log root.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    pub fn operation_type(mut self, operation_type: impl Into<String>) -> Self {
        self.operation_type = Some(operation_type.into());
        self
    }
}
