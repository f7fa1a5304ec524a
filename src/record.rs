use chrono::NaiveDateTime;
use serde::Serialize;
use std::fmt;

/// Ordered key/value payload attached to an entry.
///
/// Insertion order is preserved (`serde_json/preserve_order`), so the
/// written JSON object lists keys in the order the caller added them.
pub type Context = serde_json::Map<String, serde_json::Value>;

/// Format used for the bracketed entry timestamp and every other
/// human-readable instant in the log.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Separator placed between the message and the JSON context.
pub const CONTEXT_SEPARATOR: &str = " | Context: ";

/// Category tag written in the second bracket of every line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryType {
    Request,
    Operation,
    Performance,
    PhpError,
    Exception,
    FatalError,
}

impl EntryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryType::Request => "REQUEST",
            EntryType::Operation => "OPERATION",
            EntryType::Performance => "PERFORMANCE",
            EntryType::PhpError => "PHP_ERROR",
            EntryType::Exception => "EXCEPTION",
            EntryType::FatalError => "FATAL_ERROR",
        }
    }

    pub fn parse(tag: &str) -> Option<Self> {
        Some(match tag {
            "REQUEST" => EntryType::Request,
            "OPERATION" => EntryType::Operation,
            "PERFORMANCE" => EntryType::Performance,
            "PHP_ERROR" => EntryType::PhpError,
            "EXCEPTION" => EntryType::Exception,
            "FATAL_ERROR" => EntryType::FatalError,
            _ => return None,
        })
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single log line before it hits the sink.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEntry {
    pub timestamp: NaiveDateTime,
    pub kind: EntryType,
    pub message: String,
    pub context: Option<Context>,
}

impl LogEntry {
    pub fn new(
        timestamp: NaiveDateTime,
        kind: EntryType,
        message: impl Into<String>,
        context: Option<Context>,
    ) -> Self {
        Self {
            timestamp,
            kind,
            message: message.into(),
            context,
        }
    }

    /// Render the entry as one LF-terminated line.
    ///
    /// Line breaks and backslashes in the message are written as `\n`,
    /// `\r` and `\\` so one entry never spans lines. An empty context
    /// produces no `| Context:` suffix at all. The JSON is compact and
    /// leaves `/` and non-ASCII text unescaped.
    pub fn to_line(&self) -> String {
        let mut line = format!(
            "[{}] [{}] {}",
            self.timestamp.format(TIMESTAMP_FORMAT),
            self.kind,
            escape_message(&self.message)
        );
        if let Some(ctx) = self.context.as_ref().filter(|c| !c.is_empty()) {
            // A map of JSON values always serializes.
            if let Ok(json) = serde_json::to_string(ctx) {
                line.push_str(CONTEXT_SEPARATOR);
                line.push_str(&json);
            }
        }
        line.push('\n');
        line
    }

    /// Parse a line previously produced by [`LogEntry::to_line`].
    ///
    /// Returns `None` for anything that does not look like an entry. A
    /// message that itself contains the context separator is split at the
    /// last separator followed by a valid JSON object.
    pub fn parse_line(line: &str) -> Option<LogEntry> {
        let line = line.trim_end_matches(['\n', '\r']);
        let rest = line.strip_prefix('[')?;
        let (ts, rest) = rest.split_once("] [")?;
        let timestamp = NaiveDateTime::parse_from_str(ts, TIMESTAMP_FORMAT).ok()?;
        let (tag, rest) = rest.split_once("] ")?;
        let kind = EntryType::parse(tag)?;

        if let Some(idx) = rest.rfind(CONTEXT_SEPARATOR) {
            let json = &rest[idx + CONTEXT_SEPARATOR.len()..];
            if let Ok(serde_json::Value::Object(map)) = serde_json::from_str(json) {
                return Some(LogEntry::new(timestamp, kind, unescape_message(&rest[..idx]), Some(map)));
            }
        }
        Some(LogEntry::new(timestamp, kind, unescape_message(rest), None))
    }
}

fn escape_message(message: &str) -> String {
    let mut out = String::with_capacity(message.len());
    for c in message.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out
}

fn unescape_message(message: &str) -> String {
    let mut out = String::with_capacity(message.len());
    let mut chars = message.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}
