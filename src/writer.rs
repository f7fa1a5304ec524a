use crate::clock::Clock;
use crate::error::LoggerError;
use crate::record::{Context, EntryType, LogEntry};
use crate::sink::LogSink;
use std::sync::Arc;

/// Stamps entries with the clock and hands them to a [`LogSink`].
///
/// `write` never fails from the caller's point of view: a sink error is
/// printed to stderr and the entry is dropped.
#[derive(Clone)]
pub struct LogWriter {
    sink: Arc<dyn LogSink>,
    clock: Arc<dyn Clock>,
}

impl LogWriter {
    pub fn new(sink: Arc<dyn LogSink>, clock: Arc<dyn Clock>) -> Self {
        Self { sink, clock }
    }

    pub fn write(&self, kind: EntryType, message: impl Into<String>, context: Option<Context>) {
        let entry = LogEntry::new(self.clock.now().naive_local(), kind, message, context);
        self.write_entry(&entry);
    }

    pub fn write_entry(&self, entry: &LogEntry) {
        if let Err(e) = self.sink.append(&entry.to_line()) {
            eprintln!("{}", self.drop_notice(entry, &e));
        }
    }

    fn drop_notice(&self, entry: &LogEntry, err: &LoggerError) -> String {
        format!(
            "request-perf-logger: dropped {} entry for {}: {}",
            entry.kind,
            self.sink.describe(),
            err
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::sink::{FileSink, MemorySink};
    use chrono::{Local, TimeZone};
    use serde_json::json;

    fn clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::new(Local.with_ymd_and_hms(2025, 3, 14, 9, 5, 7).unwrap()))
    }

    #[test]
    fn stamps_entries_with_clock() {
        let sink = MemorySink::new();
        let writer = LogWriter::new(Arc::new(sink.clone()), clock());

        let mut ctx = Context::new();
        ctx.insert("a".into(), json!("b"));
        writer.write(EntryType::Operation, "SAVE - OK", Some(ctx));

        assert_eq!(
            sink.lines(),
            vec![r#"[2025-03-14 09:05:07] [OPERATION] SAVE - OK | Context: {"a":"b"}"#.to_string()]
        );
    }

    #[test]
    fn sink_failure_does_not_propagate() {
        let tmp = tempfile::TempDir::new().unwrap();
        let sink = FileSink::new(tmp.path().join("missing").join("x.log"));
        let writer = LogWriter::new(Arc::new(sink), clock());
        // Must not panic.
        writer.write(EntryType::Request, "GET /", None);
    }

    #[test]
    fn drop_notice_names_entry_and_destination() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("missing").join("x.log");
        let sink = FileSink::new(&path);
        let err = sink.append("x\n").unwrap_err();
        let writer = LogWriter::new(Arc::new(sink), clock());

        let entry = LogEntry::new(
            Local.with_ymd_and_hms(2025, 3, 14, 9, 5, 7).unwrap().naive_local(),
            EntryType::Exception,
            "boom",
            None,
        );
        let notice = writer.drop_notice(&entry, &err);
        assert!(notice.starts_with(&format!(
            "request-perf-logger: dropped EXCEPTION entry for {}: ",
            path.display()
        )));
    }
}
