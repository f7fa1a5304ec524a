use crate::error::LoggerError;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Destination for rendered log lines.
///
/// Implementations receive one complete, LF-terminated line per call and
/// must append it as a unit: two concurrent calls may not interleave their
/// bytes.
pub trait LogSink: Send + Sync {
    /// Append a single rendered line.
    ///
    /// **Returns**
    /// - `Ok(())` once the line has been handed to the backend.
    /// - `Err(..)` if the append failed. Callers treat this as recoverable
    ///   and report it on the fallback channel.
    fn append(&self, line: &str) -> Result<(), LoggerError>;

    /// Human-readable destination, used in diagnostics.
    fn describe(&self) -> String;
}

/// Appends to one file, holding an exclusive advisory lock for the
/// duration of each write.
///
/// The file is opened per append so a rotation or deletion by another
/// process simply results in the canonical path being recreated.
#[derive(Clone, Debug)]
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_error(&self, source: std::io::Error) -> LoggerError {
        LoggerError::Write {
            path: self.path.clone(),
            source,
        }
    }
}

impl LogSink for FileSink {
    fn append(&self, line: &str) -> Result<(), LoggerError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.write_error(e))?;

        #[cfg(unix)]
        {
            use nix::fcntl::{Flock, FlockArg};

            let mut locked = Flock::lock(file, FlockArg::LockExclusive)
                .map_err(|(_, errno)| self.write_error(errno.into()))?;
            locked
                .write_all(line.as_bytes())
                .map_err(|e| self.write_error(e))?;
            // Dropping the guard releases the lock and closes the file.
        }

        #[cfg(not(unix))]
        {
            let mut file = file;
            file.write_all(line.as_bytes())
                .map_err(|e| self.write_error(e))?;
        }

        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Keeps every line in memory.
///
/// Useful for hosts that render the request log themselves and for tests
/// that want to inspect entries without touching disk.
#[derive(Clone, Default)]
pub struct MemorySink {
    lines: std::sync::Arc<std::sync::Mutex<Vec<String>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the lines appended so far, without trailing newlines.
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|l| l.trim_end_matches('\n').to_string())
            .collect()
    }
}

impl LogSink for MemorySink {
    fn append(&self, line: &str) -> Result<(), LoggerError> {
        self.lines
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(line.to_string());
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use tempfile::TempDir;

    #[test]
    fn appends_and_recreates_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("log-2025-03-14.log");
        let sink = FileSink::new(&path);

        sink.append("one\n").unwrap();
        sink.append("two\n").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "one\ntwo\n");

        std::fs::remove_file(&path).unwrap();
        sink.append("three\n").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "three\n");
    }

    #[test]
    fn missing_directory_is_a_write_error() {
        let tmp = TempDir::new().unwrap();
        let sink = FileSink::new(tmp.path().join("gone").join("log.log"));
        let err = sink.append("x\n").unwrap_err();
        assert!(matches!(err, LoggerError::Write { .. }));
        assert!(!err.is_fatal());
    }

    #[test]
    fn concurrent_writers_never_interleave() {
        let tmp = TempDir::new().unwrap();
        let path = Arc::new(tmp.path().join("shared.log"));
        let writers = 8;
        let per_writer = 200;

        let handles: Vec<_> = (0..writers)
            .map(|w| {
                let path = Arc::clone(&path);
                thread::spawn(move || {
                    // Each writer has its own sink and therefore its own file
                    // descriptions, like separate processes would.
                    let sink = FileSink::new(path.as_path());
                    let marker = char::from(b'a' + w as u8);
                    let line: String = std::iter::repeat(marker).take(4096).collect::<String>() + "\n";
                    for _ in 0..per_writer {
                        sink.append(&line).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let content = std::fs::read_to_string(path.as_path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), writers * per_writer);
        for line in lines {
            assert_eq!(line.len(), 4096);
            let first = line.chars().next().unwrap();
            assert!(line.chars().all(|c| c == first), "interleaved line found");
        }
    }

    #[test]
    fn memory_sink_collects_lines() {
        let sink = MemorySink::new();
        sink.append("[x] [REQUEST] GET /\n").unwrap();
        assert_eq!(sink.lines(), vec!["[x] [REQUEST] GET /".to_string()]);
    }

    #[test]
    fn sinks_describe_their_destination() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("log-2025-03-14.log");
        assert_eq!(FileSink::new(&path).describe(), path.display().to_string());
        assert_eq!(MemorySink::new().describe(), "memory");
    }
}
