//! Named operation timers and the aggregate statistics they feed.

use crate::clock::{seconds_between, Clock};
use crate::memory::MemoryProbe;
use chrono::{DateTime, Local};
use indexmap::IndexMap;
use std::sync::Arc;

/// Operations slower than this many seconds are listed in the summary.
pub const SLOW_OPERATION_SECS: f64 = 0.5;

/// One named measurement. Running until [`TimerRegistry::end_timer`]
/// stops it; a stopped timer is never resumed.
#[derive(Debug, Clone, PartialEq)]
pub struct Timer {
    pub name: String,
    pub start: DateTime<Local>,
    pub end: Option<DateTime<Local>>,
    pub duration: Option<f64>,
    pub memory_start: u64,
    pub memory_end: Option<u64>,
    pub memory_delta: Option<i64>,
}

impl Timer {
    pub fn is_running(&self) -> bool {
        self.end.is_none()
    }
}

/// Totals over every completed timer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PerformanceStats {
    pub total_operations: u64,
    pub total_time: f64,
    pub slow_operations: IndexMap<String, f64>,
}

/// Per-request timer table.
///
/// Starting a name that was already used replaces the old timer without
/// subtracting what it contributed to [`PerformanceStats`], so reusing a
/// name counts it twice.
pub struct TimerRegistry {
    clock: Arc<dyn Clock>,
    probe: Arc<dyn MemoryProbe>,
    timers: IndexMap<String, Timer>,
    stats: PerformanceStats,
    peak_memory: u64,
}

impl TimerRegistry {
    pub fn new(clock: Arc<dyn Clock>, probe: Arc<dyn MemoryProbe>) -> Self {
        Self {
            clock,
            probe,
            timers: IndexMap::new(),
            stats: PerformanceStats::default(),
            peak_memory: 0,
        }
    }

    /// Start (or restart) the timer called `name`.
    pub fn start_timer(&mut self, name: &str) -> &mut Self {
        let memory_start = self.sample_memory();
        let timer = Timer {
            name: name.to_string(),
            start: self.clock.now(),
            end: None,
            duration: None,
            memory_start,
            memory_end: None,
            memory_delta: None,
        };
        self.timers.insert(name.to_string(), timer);
        self
    }

    /// Stop a running timer and return its duration in seconds.
    ///
    /// Unknown or already-stopped names return `None` and change nothing.
    pub fn end_timer(&mut self, name: &str) -> Option<f64> {
        if !self.timers.get(name)?.is_running() {
            return None;
        }
        let end = self.clock.now();
        let memory_end = self.sample_memory();

        let timer = self.timers.get_mut(name)?;
        let duration = seconds_between(timer.start, end);
        timer.end = Some(end);
        timer.duration = Some(duration);
        timer.memory_end = Some(memory_end);
        timer.memory_delta = Some(memory_end as i64 - timer.memory_start as i64);

        self.stats.total_operations += 1;
        self.stats.total_time += duration;
        if duration > SLOW_OPERATION_SECS {
            self.stats.slow_operations.insert(name.to_string(), duration);
        }
        Some(duration)
    }

    pub fn get(&self, name: &str) -> Option<&Timer> {
        self.timers.get(name)
    }

    /// Timers in the order they were first started.
    pub fn timers(&self) -> impl Iterator<Item = &Timer> {
        self.timers.values()
    }

    pub fn stats(&self) -> &PerformanceStats {
        &self.stats
    }

    /// Current usage, also folded into the observed peak.
    pub fn sample_memory(&mut self) -> u64 {
        let current = self.probe.current();
        self.peak_memory = self.peak_memory.max(current);
        current
    }

    /// Highest usage seen by this registry or reported by the probe.
    pub fn peak_memory(&self) -> u64 {
        self.probe.peak().unwrap_or(0).max(self.peak_memory)
    }
}
