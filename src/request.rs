use crate::env::{OPERATION_TYPE_KEY, REQUEST_ENV_KEYS};
use indexmap::IndexMap;

/// Server-supplied facts about the inbound request.
///
/// Arbitrary keys may be stored; only an allowlisted subset ever reaches
/// the log (see [`sanitize_server_metadata`](crate::sanitize::sanitize_server_metadata)).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestMetadata {
    vars: IndexMap<String, String>,
}

impl RequestMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Metadata for a command-line invocation: nothing is known.
    pub fn cli() -> Self {
        Self::default()
    }

    /// Read the CGI request variables from the process environment.
    pub fn from_env() -> Self {
        let vars = REQUEST_ENV_KEYS
            .iter()
            .filter_map(|k| std::env::var(k).ok().map(|v| (k.to_string(), v)))
            .collect();
        Self { vars }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// The request-scoped operation type override, if any.
    pub fn operation_type(&self) -> Option<&str> {
        self.get(OPERATION_TYPE_KEY)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RequestMetadata {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}
