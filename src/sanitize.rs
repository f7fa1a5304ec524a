//! Scrubbing applied to every payload before it is written.

use crate::record::Context;
use serde::Serialize;
use serde_json::Value;

/// Replacement written in place of a sensitive value.
pub const REDACTED: &str = "***REDACTED***";

/// Key fragments that mark a detail as sensitive (matched case-insensitively).
pub const SENSITIVE_KEY_FRAGMENTS: [&str; 5] = ["password", "token", "secret", "credit_card", "api_key"];

/// Request metadata keys that may reach the log.
pub const ALLOWED_SERVER_KEYS: [&str; 5] = [
    "REMOTE_ADDR",
    "HTTP_USER_AGENT",
    "REQUEST_METHOD",
    "REQUEST_URI",
    "HTTP_REFERER",
];

/// Number of stack frames kept in an exception entry.
pub const MAX_TRACE_FRAMES: usize = 5;

pub fn is_sensitive_key(key: &str) -> bool {
    let lower = key.to_lowercase();
    SENSITIVE_KEY_FRAGMENTS.iter().any(|s| lower.contains(s))
}

/// Redact the values of top-level keys that look sensitive. Keys and order
/// are preserved.
pub fn sanitize_details(mut details: Context) -> Context {
    for (key, value) in details.iter_mut() {
        if is_sensitive_key(key) {
            *value = Value::String(REDACTED.to_string());
        }
    }
    details
}

/// Project request metadata onto [`ALLOWED_SERVER_KEYS`], in that order.
pub fn sanitize_server_metadata<'a, I>(server: I) -> Context
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let pairs: Vec<(&str, &str)> = server.into_iter().collect();
    let mut out = Context::new();
    for allowed in ALLOWED_SERVER_KEYS {
        if let Some((_, v)) = pairs.iter().find(|(k, _)| *k == allowed) {
            out.insert(allowed.to_string(), Value::String((*v).to_string()));
        }
    }
    out
}

/// A raw call-stack frame as the host reports it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StackFrame {
    pub file: Option<String>,
    pub line: Option<u32>,
    pub function: Option<String>,
    pub class: Option<String>,
    pub args: Vec<Value>,
}

/// What survives of a [`StackFrame`] in the log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceFrame {
    pub file: Option<String>,
    pub line: Option<u32>,
    pub function: Option<String>,
    pub class: Option<String>,
}

/// Keep the first [`MAX_TRACE_FRAMES`] frames and drop their arguments.
pub fn sanitize_trace(frames: &[StackFrame]) -> Vec<TraceFrame> {
    frames
        .iter()
        .take(MAX_TRACE_FRAMES)
        .map(|f| TraceFrame {
            file: f.file.clone(),
            line: f.line,
            function: f.function.clone(),
            class: f.class.clone(),
        })
        .collect()
}
