//! Per-request logger: wires paths, rotation, timers, sanitizing and the
//! writer together.

use crate::clock::{round_to, seconds_between, Clock, SystemClock};
use crate::config::LoggerConfig;
use crate::env::{CLI_SENTINEL, HTTP_USER_AGENT_KEY, REMOTE_ADDR_KEY, REQUEST_METHOD_KEY, REQUEST_URI_KEY};
use crate::error::{report_fallback, LoggerError};
use crate::hooks::{ErrorHandler, LastError, Throwable};
use crate::memory::{default_probe, format_memory, MemoryProbe};
use crate::paths::{ensure_partition, LogPaths};
use crate::record::{Context, EntryType, TIMESTAMP_FORMAT};
use crate::report::{OperationReport, PerformanceReport};
use crate::request::RequestMetadata;
use crate::rotation::{prune_tree, rotate_if_needed};
use crate::sanitize::{sanitize_details, sanitize_server_metadata};
use crate::severity::ErrorMask;
use crate::sink::{FileSink, LogSink};
use crate::timer::{PerformanceStats, TimerRegistry};
use crate::writer::LogWriter;
use chrono::{DateTime, Local};
use serde_json::Value;
use std::sync::Arc;
use std::time::SystemTime;

/// Operation type used when neither the request nor the config names one.
pub const UNKNOWN_OPERATION: &str = "unknown";

/// Collaborators for a [`RequestLogger`]. Everything defaults to the real
/// system: local clock, process memory, today's file under the root.
pub struct RequestLoggerBuilder {
    config: LoggerConfig,
    clock: Arc<dyn Clock>,
    probe: Option<Arc<dyn MemoryProbe>>,
    sink: Option<Arc<dyn LogSink>>,
}

impl RequestLoggerBuilder {
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn memory_probe(mut self, probe: Arc<dyn MemoryProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    /// Send entries somewhere other than today's file. Directories,
    /// rotation and pruning still run against the configured root.
    pub fn sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Prepare the log file and write the `REQUEST` entry.
    ///
    /// **Errors**
    /// - [`LoggerError::Init`] when the partition directory cannot be
    ///   created. Rotation and pruning failures are reported on stderr and
    ///   do not fail construction.
    pub fn build(self, request: &RequestMetadata) -> Result<RequestLogger, LoggerError> {
        let RequestLoggerBuilder {
            config,
            clock,
            probe,
            sink,
        } = self;

        let started_at = clock.now();
        let paths = ensure_partition(&config.root, started_at.date_naive())?;

        if let Err(e) = rotate_if_needed(&paths, config.max_file_size, started_at.timestamp()) {
            report_fallback(&e);
        }
        if let Err(e) = prune_tree(&config.root, config.retention, SystemTime::from(started_at)) {
            report_fallback(&e);
        }

        let operation_type = request
            .operation_type()
            .map(str::to_string)
            .or_else(|| config.operation_type.clone())
            .unwrap_or_else(|| UNKNOWN_OPERATION.to_string());

        let sink = sink.unwrap_or_else(|| Arc::new(FileSink::new(&paths.file)));
        let writer = LogWriter::new(sink, Arc::clone(&clock));
        let handler = ErrorHandler::new(writer.clone(), config.error_mask);
        let probe = probe.unwrap_or_else(|| Arc::from(default_probe()));

        let mut logger = RequestLogger {
            timers: TimerRegistry::new(Arc::clone(&clock), probe),
            clock,
            config,
            paths,
            writer,
            handler,
            operation_type,
            started_at,
            finished: false,
        };
        logger.log_request(request);
        Ok(logger)
    }
}

/// Logger for one request or process invocation.
///
/// Construct one per request. On [`shutdown`](RequestLogger::shutdown), or
/// when dropped, it writes a `PERFORMANCE` summary of every timed operation.
pub struct RequestLogger {
    config: LoggerConfig,
    paths: LogPaths,
    clock: Arc<dyn Clock>,
    writer: LogWriter,
    handler: ErrorHandler,
    timers: TimerRegistry,
    operation_type: String,
    started_at: DateTime<Local>,
    finished: bool,
}

impl RequestLogger {
    /// Build with the real clock, memory probe and file sink.
    pub fn new(config: LoggerConfig, request: &RequestMetadata) -> Result<Self, LoggerError> {
        Self::builder(config).build(request)
    }

    pub fn builder(config: LoggerConfig) -> RequestLoggerBuilder {
        RequestLoggerBuilder {
            config,
            clock: Arc::new(SystemClock),
            probe: None,
            sink: None,
        }
    }

    pub fn config(&self) -> &LoggerConfig {
        &self.config
    }

    pub fn paths(&self) -> &LogPaths {
        &self.paths
    }

    pub fn operation_type(&self) -> &str {
        &self.operation_type
    }

    pub fn stats(&self) -> &PerformanceStats {
        self.timers.stats()
    }

    /// Capability for the host's error, exception and panic plumbing.
    pub fn error_handler(&self) -> ErrorHandler {
        self.handler.clone()
    }

    /// Change which runtime-error severities this request records, for
    /// every handler already handed out as well.
    pub fn set_error_mask(&self, mask: ErrorMask) {
        self.handler.set_mask(mask);
    }

    pub fn start_timer(&mut self, name: &str) -> &mut Self {
        self.timers.start_timer(name);
        self
    }

    pub fn end_timer(&mut self, name: &str) -> Option<f64> {
        self.timers.end_timer(name)
    }

    /// Write an `OPERATION` entry `"<ACTION> - <STATUS>"`.
    ///
    /// With a known `timer`, its duration, memory delta and start time are
    /// added to `details` first. Sensitive keys are redacted either way.
    pub fn log_operation(&self, action: &str, status: &str, mut details: Context, timer: Option<&str>) {
        let message = format!("{} - {}", action.to_uppercase(), status.to_uppercase());

        if let Some(t) = timer.and_then(|name| self.timers.get(name)) {
            details.insert(
                "duration_sec".into(),
                Value::from(round_to(t.duration.unwrap_or(0.0), 4)),
            );
            details.insert(
                "memory_usage".into(),
                Value::from(format_memory(t.memory_delta.unwrap_or(0))),
            );
            details.insert(
                "start_time".into(),
                Value::from(t.start.format(TIMESTAMP_FORMAT).to_string()),
            );
        }

        self.writer
            .write(EntryType::Operation, message, Some(sanitize_details(details)));
    }

    /// Forward a runtime error to this request's handler.
    pub fn handle_error(&self, code: u32, message: &str, file: &str, line: u32) {
        self.handler.handle_error(code, message, file, line);
    }

    /// Forward an uncaught exception to this request's handler.
    pub fn handle_exception(&self, exception: &dyn Throwable) {
        self.handler.handle_exception(exception);
    }

    /// Snapshot of elapsed time and every timer. Writes nothing.
    pub fn performance_report(&self) -> PerformanceReport {
        PerformanceReport {
            total_time: format!("{} sec", round_to(self.elapsed(), 4)),
            operations: self
                .timers
                .timers()
                .map(|t| (t.name.clone(), OperationReport::from(t)))
                .collect(),
        }
    }

    /// End the request: log `last_error` if it is fatal-class, then the
    /// performance summary.
    pub fn shutdown(mut self, last_error: Option<&LastError>) {
        self.finish(last_error);
    }

    fn elapsed(&self) -> f64 {
        seconds_between(self.started_at, self.clock.now())
    }

    fn finish(&mut self, last_error: Option<&LastError>) {
        if self.finished {
            return;
        }
        self.finished = true;

        if let Some(err) = last_error {
            self.handler.handle_fatal(err);
        }
        self.log_performance_summary();
    }

    fn log_request(&mut self, request: &RequestMetadata) {
        let server = sanitize_server_metadata(request.iter());
        let field = |key: &str| server.get(key).and_then(Value::as_str);

        let message = format!(
            "{} {}",
            field(REQUEST_METHOD_KEY).unwrap_or(CLI_SENTINEL),
            field(REQUEST_URI_KEY).unwrap_or("")
        );

        let mut ctx = Context::new();
        ctx.insert("Operation".into(), Value::from(self.operation_type.clone()));
        ctx.insert(
            "IP".into(),
            Value::from(field(REMOTE_ADDR_KEY).unwrap_or(CLI_SENTINEL)),
        );
        ctx.insert(
            "UserAgent".into(),
            Value::from(field(HTTP_USER_AGENT_KEY).unwrap_or(CLI_SENTINEL)),
        );
        ctx.insert(
            "ResponseTime".into(),
            Value::from(format!("{} sec", round_to(self.elapsed(), 4))),
        );
        let memory = self.timers.sample_memory();
        ctx.insert(
            "MemoryUsage".into(),
            Value::from(format_memory(memory as i64)),
        );

        self.writer.write(EntryType::Request, message, Some(ctx));
    }

    fn log_performance_summary(&mut self) {
        self.timers.sample_memory();
        let stats = self.timers.stats();

        let slow = if stats.slow_operations.is_empty() {
            Value::from("None")
        } else {
            Value::Object(
                stats
                    .slow_operations
                    .iter()
                    .map(|(name, d)| (name.clone(), Value::from(*d)))
                    .collect(),
            )
        };

        let mut ctx = Context::new();
        ctx.insert("TotalOperations".into(), Value::from(stats.total_operations));
        ctx.insert(
            "TotalTime".into(),
            Value::from(format!("{} sec", round_to(self.elapsed(), 4))),
        );
        ctx.insert(
            "MemoryPeak".into(),
            Value::from(format_memory(self.timers.peak_memory() as i64)),
        );
        ctx.insert("SlowOperations".into(), slow);

        self.writer
            .write(EntryType::Performance, "Request completed", Some(ctx));
    }
}

impl Drop for RequestLogger {
    fn drop(&mut self) {
        self.finish(None);
    }
}
