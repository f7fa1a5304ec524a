use std::io;
use std::path::PathBuf;

/// Errors produced by the logging engine.
///
/// Only [`LoggerError::Init`] ever reaches the caller of
/// [`RequestLogger::new`](crate::logger::RequestLogger::new); the other
/// variants are rendered to stderr and swallowed so that logging never
/// breaks the request it observes.
#[derive(thiserror::Error, Debug)]
pub enum LoggerError {
    /// The log directory could not be created. Nothing can be logged.
    #[error("failed to create log directory {path}: {source}")]
    Init {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write to log file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to rotate log file {path}: {source}")]
    Rotate {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to prune old log file {path}: {source}")]
    Prune {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl LoggerError {
    /// Whether the error must abort logger construction.
    pub fn is_fatal(&self) -> bool {
        matches!(self, LoggerError::Init { .. })
    }
}

/// Report a recovered infrastructure failure on the fallback channel.
///
/// This deliberately bypasses `tracing`: the capture layer may route
/// tracing events back into the same failing log file.
pub(crate) fn report_fallback(err: &LoggerError) {
    eprintln!("request-perf-logger: {}", err);
}
