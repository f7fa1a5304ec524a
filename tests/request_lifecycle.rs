use chrono::{Duration, Local, TimeZone};
use filetime::{set_file_mtime, FileTime};
use request_perf_logger::clock::{Clock, ManualClock};
use request_perf_logger::memory::FixedProbe;
use request_perf_logger::{
    CapturedException, Context, EntryType, LogEntry, LoggerConfig, RequestLogger, RequestMetadata,
    SourceLocation,
};
use serde_json::json;
use std::fs;
use std::sync::Arc;
use std::thread;
use std::time::SystemTime;
use tempfile::TempDir;

fn clock() -> ManualClock {
    ManualClock::new(Local.with_ymd_and_hms(2025, 3, 14, 10, 30, 0).unwrap())
}

fn build(root: &std::path::Path, clock: &ManualClock, config: LoggerConfig) -> RequestLogger {
    RequestLogger::builder(LoggerConfig {
        root: root.to_path_buf(),
        ..config
    })
    .clock(Arc::new(clock.clone()))
    .memory_probe(Arc::new(FixedProbe(1024)))
    .build(&RequestMetadata::new().with("REQUEST_METHOD", "GET").with("REQUEST_URI", "/"))
    .unwrap()
}

fn read_entries(path: &std::path::Path) -> Vec<LogEntry> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|l| LogEntry::parse_line(l).unwrap())
        .collect()
}

#[test]
fn full_request_is_written_to_todays_file() {
    let tmp = TempDir::new().unwrap();
    let clock = clock();
    let mut logger = build(tmp.path(), &clock, LoggerConfig::default());
    let file = tmp.path().join("2025/2025-03/log-2025-03-14.log");
    assert_eq!(logger.paths().file, file);

    logger.start_timer("user_registration");
    clock.advance(Duration::milliseconds(750));
    assert!(logger.end_timer("user_registration").is_some());

    let mut details = Context::new();
    details.insert("user_id".into(), json!(123));
    details.insert("api_key".into(), json!("k-123"));
    logger.log_operation("user_registration", "completed", details, Some("user_registration"));
    logger.shutdown(None);

    let entries = read_entries(&file);
    let kinds: Vec<EntryType> = entries.iter().map(|e| e.kind).collect();
    assert_eq!(
        kinds,
        [EntryType::Request, EntryType::Operation, EntryType::Performance]
    );
    assert_eq!(entries[0].message, "GET /");

    let op = entries[1].context.as_ref().unwrap();
    assert_eq!(op["api_key"], "***REDACTED***");
    assert_eq!(op["duration_sec"], 0.75);

    let summary = entries[2].context.as_ref().unwrap();
    assert_eq!(summary["TotalOperations"], 1);
    assert_eq!(summary["SlowOperations"], json!({"user_registration": 0.75}));
}

#[test]
fn oversized_file_is_rotated_on_construction() {
    let tmp = TempDir::new().unwrap();
    let clock = clock();
    let dir = tmp.path().join("2025/2025-03");
    fs::create_dir_all(&dir).unwrap();
    let file = dir.join("log-2025-03-14.log");
    fs::write(&file, vec![b'x'; 64]).unwrap();

    let config = LoggerConfig {
        max_file_size: 64,
        ..LoggerConfig::default()
    };
    let logger = build(tmp.path(), &clock, config);

    let unix = Local.with_ymd_and_hms(2025, 3, 14, 10, 30, 0).unwrap().timestamp();
    let backup = dir.join(format!("log-2025-03-14-{}.log", unix));
    assert_eq!(fs::metadata(&backup).unwrap().len(), 64);

    // The request entry recreated the canonical file.
    let entries = read_entries(&file);
    assert_eq!(entries.len(), 1);
    drop(logger);
}

#[test]
fn expired_files_are_pruned_on_construction() {
    let tmp = TempDir::new().unwrap();
    let clock = clock();
    let old_dir = tmp.path().join("2024/2024-11");
    fs::create_dir_all(&old_dir).unwrap();
    let old = old_dir.join("log-2024-11-02.log");
    fs::write(&old, b"old\n").unwrap();

    // Pruning compares against the logger's clock, so age relative to it.
    let now = SystemTime::from(clock.now());
    let aged = now - std::time::Duration::from_secs(31 * 86_400);
    set_file_mtime(&old, FileTime::from_system_time(aged)).unwrap();

    let _logger = build(tmp.path(), &clock, LoggerConfig::default());
    assert!(!old.exists());
}

#[test]
fn parallel_requests_share_a_file_without_tearing() {
    let tmp = TempDir::new().unwrap();
    let root = Arc::new(tmp.path().to_path_buf());

    let handles: Vec<_> = (0..6)
        .map(|i| {
            let root = Arc::clone(&root);
            thread::spawn(move || {
                let clock = clock();
                let logger = build(&root, &clock, LoggerConfig::default());
                for n in 0..50 {
                    let mut details = Context::new();
                    details.insert("worker".into(), json!(i));
                    details.insert("payload".into(), json!("z".repeat(2048)));
                    details.insert("n".into(), json!(n));
                    logger.log_operation("work", "ok", details, None);
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    let entries = read_entries(&root.join("2025/2025-03/log-2025-03-14.log"));
    // One request entry, fifty operations and one summary per worker.
    assert_eq!(entries.len(), 6 * 52);
    for e in entries.iter().filter(|e| e.kind == EntryType::Operation) {
        assert_eq!(e.context.as_ref().unwrap()["payload"].as_str().unwrap().len(), 2048);
    }
}

#[test]
fn multi_line_exception_is_one_entry_on_disk() {
    let tmp = TempDir::new().unwrap();
    let clock = clock();
    let logger = build(tmp.path(), &clock, LoggerConfig::default());

    logger.handle_exception(&CapturedException::new(
        "query failed:\nSELECT 1",
        SourceLocation::new("db.rs", 3),
    ));
    drop(logger);

    let file = tmp.path().join("2025/2025-03/log-2025-03-14.log");
    let content = fs::read_to_string(&file).unwrap();
    // Request, exception and summary.
    assert_eq!(content.lines().count(), 3);

    let entries = read_entries(&file);
    assert_eq!(entries[1].kind, EntryType::Exception);
    assert_eq!(entries[1].message, "query failed:\nSELECT 1");
    assert_eq!(entries[1].context.as_ref().unwrap()["file"], "db.rs");
}
