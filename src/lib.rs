//! Per-request file logging with date-partitioned files, size rotation,
//! age-based retention, operation timers and error capture.
//!
//! ```no_run
//! use request_perf_logger::{Context, LoggerConfig, RequestLogger, RequestMetadata};
//!
//! # fn main() -> Result<(), request_perf_logger::LoggerError> {
//! let request = RequestMetadata::from_env();
//! let mut logger = RequestLogger::new(LoggerConfig::with_root("logs"), &request)?;
//!
//! logger.start_timer("db_insert");
//! // ... do the work ...
//! logger.end_timer("db_insert");
//! logger.log_operation("db_insert", "success", Context::new(), Some("db_insert"));
//!
//! logger.shutdown(None);
//! # Ok(())
//! # }
//! ```

pub mod clock;
pub mod config;
pub mod env;
pub mod error;
pub mod hooks;
pub mod init;
pub mod layer;
pub mod logger;
pub mod memory;
pub mod paths;
pub mod record;
pub mod report;
pub mod request;
pub mod rotation;
pub mod sanitize;
pub mod severity;
pub mod sink;
pub mod timer;
pub mod writer;

pub use config::LoggerConfig;
pub use error::LoggerError;
pub use hooks::{CapturedException, ErrorHandler, LastError, SourceLocation, Throwable};
pub use logger::RequestLogger;
pub use record::{Context, EntryType, LogEntry};
pub use report::PerformanceReport;
pub use request::RequestMetadata;
pub use severity::{ErrorMask, Severity};
