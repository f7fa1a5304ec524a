use crate::hooks::ErrorHandler;
use crate::severity::Severity;
use std::collections::BTreeMap;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

/// `tracing_subscriber` layer that turns `WARN`/`ERROR` events into
/// runtime-error entries of whichever request is current.
///
/// The request is found through [`ErrorHandler::current`], so the host
/// must [`enter`](ErrorHandler::enter) or [`scope`](ErrorHandler::scope)
/// the handler around request processing. Events outside any request are
/// counted and skipped. Events emitted by this crate are never captured.
pub struct ErrorCaptureLayer {
    min_level: Level,
    /// Total events seen by the layer (before filtering by level).
    pub total_events: Arc<AtomicU64>,
    /// Written to a request log.
    pub captured_events: Arc<AtomicU64>,
    /// At or above the level but no request was current.
    pub unscoped_events: Arc<AtomicU64>,
}

impl ErrorCaptureLayer {
    /// Capture events at `min_level` or more severe (`WARN` captures
    /// warnings and errors).
    pub fn new(min_level: Level) -> Self {
        Self {
            min_level,
            total_events: Arc::new(AtomicU64::new(0)),
            captured_events: Arc::new(AtomicU64::new(0)),
            unscoped_events: Arc::new(AtomicU64::new(0)),
        }
    }
}

impl Default for ErrorCaptureLayer {
    fn default() -> Self {
        Self::new(Level::WARN)
    }
}

/// Severity recorded for an event level.
pub fn severity_for(level: &Level) -> Severity {
    if *level == Level::ERROR {
        Severity::UserError
    } else if *level == Level::WARN {
        Severity::UserWarning
    } else {
        Severity::UserNotice
    }
}

impl<S> Layer<S> for ErrorCaptureLayer
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    fn on_event(&self, event: &Event, _ctx: Context<'_, S>) {
        self.total_events.fetch_add(1, Ordering::Relaxed);
        let meta = event.metadata();
        if *meta.level() > self.min_level {
            return;
        }
        if meta.target().starts_with(env!("CARGO_CRATE_NAME")) {
            return;
        }

        let Some(handler) = ErrorHandler::current() else {
            self.unscoped_events.fetch_add(1, Ordering::Relaxed);
            return;
        };

        let mut fields = BTreeMap::new();
        let mut message: Option<String> = None;
        let mut visitor = FieldVisitor {
            fields: &mut fields,
            message: &mut message,
        };
        event.record(&mut visitor);

        let mut text = message.unwrap_or_else(|| meta.target().to_string());
        if !fields.is_empty() {
            let rendered: Vec<String> = fields.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
            text.push_str(" (");
            text.push_str(&rendered.join(", "));
            text.push(')');
        }

        handler.handle_error(
            severity_for(meta.level()).code(),
            &text,
            meta.file().unwrap_or("unknown"),
            meta.line().unwrap_or(0),
        );
        self.captured_events.fetch_add(1, Ordering::Relaxed);
    }
}

use tracing::field::{Field, Visit};

pub struct FieldVisitor<'a> {
    pub fields: &'a mut BTreeMap<String, serde_json::Value>,
    pub message: &'a mut Option<String>,
}

impl<'a> Visit for FieldVisitor<'a> {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            *self.message = Some(value.to_string());
        } else {
            self.fields.insert(field.name().to_string(), serde_json::Value::String(value.to_string()));
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.fields.insert(field.name().to_string(), serde_json::Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.fields.insert(field.name().to_string(), serde_json::Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.fields.insert(field.name().to_string(), serde_json::Value::from(value));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            *self.message = Some(format!("{:?}", value));
        } else {
            self.fields.insert(field.name().to_string(), serde_json::Value::String(format!("{:?}", value)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::record::{EntryType, LogEntry};
    use crate::severity::ErrorMask;
    use crate::sink::MemorySink;
    use crate::writer::LogWriter;
    use chrono::{Local, TimeZone};
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::Registry;

    fn handler() -> (ErrorHandler, MemorySink) {
        let sink = MemorySink::new();
        let clock = ManualClock::new(Local.with_ymd_and_hms(2025, 3, 14, 9, 0, 0).unwrap());
        let writer = LogWriter::new(Arc::new(sink.clone()), Arc::new(clock));
        (ErrorHandler::new(writer, ErrorMask::ALL), sink)
    }

    #[test]
    fn captures_errors_of_the_current_request() {
        let layer = ErrorCaptureLayer::default();
        let captured = Arc::clone(&layer.captured_events);
        let unscoped = Arc::clone(&layer.unscoped_events);
        let subscriber = Registry::default().with(layer);
        let (h, sink) = handler();

        tracing::subscriber::with_default(subscriber, || {
            tracing::error!(target: "app", "outside any request");
            let _guard = h.enter();
            tracing::info!(target: "app", "ignored");
            tracing::warn!(target: "app", user_id = 7, "slow disk");
        });

        assert_eq!(captured.load(Ordering::Relaxed), 1);
        assert_eq!(unscoped.load(Ordering::Relaxed), 1);

        let entry = LogEntry::parse_line(&sink.lines()[0]).unwrap();
        assert_eq!(entry.kind, EntryType::PhpError);
        assert!(entry.message.starts_with("slow disk (user_id=7) in "));
        assert_eq!(entry.context.unwrap()["type"], "E_USER_WARNING");
    }

    #[test]
    fn masked_level_is_not_written() {
        let subscriber = Registry::default().with(ErrorCaptureLayer::default());
        let sink = MemorySink::new();
        let clock = ManualClock::new(Local.with_ymd_and_hms(2025, 3, 14, 9, 0, 0).unwrap());
        let writer = LogWriter::new(Arc::new(sink.clone()), Arc::new(clock));
        let h = ErrorHandler::new(writer, ErrorMask::ALL.without(Severity::UserWarning));

        tracing::subscriber::with_default(subscriber, || {
            let _guard = h.enter();
            tracing::warn!(target: "app", "quiet");
            tracing::error!(target: "app", "loud");
        });

        let lines = sink.lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("loud"));
    }
}
