//! Read-only performance snapshot returned to the host.

use crate::clock::round_to;
use crate::memory::format_memory;
use crate::record::TIMESTAMP_FORMAT;
use crate::timer::Timer;
use indexmap::IndexMap;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationReport {
    /// `"<seconds> sec"`, 4 decimal places; `0` while still running.
    pub duration: String,
    pub memory_usage: String,
    pub start: String,
    /// `None` while the timer is still running.
    pub end: Option<String>,
}

impl From<&Timer> for OperationReport {
    fn from(timer: &Timer) -> Self {
        Self {
            duration: format!("{} sec", round_to(timer.duration.unwrap_or(0.0), 4)),
            memory_usage: format_memory(timer.memory_delta.unwrap_or(0)),
            start: timer.start.format(TIMESTAMP_FORMAT).to_string(),
            end: timer.end.map(|e| e.format(TIMESTAMP_FORMAT).to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceReport {
    /// Time since the logger was constructed.
    pub total_time: String,
    pub operations: IndexMap<String, OperationReport>,
}
