//! Runtime error severities and the mask that filters them.

use std::fmt;

/// Interpreter-style error severity codes. Each is a single bit so that
/// severities can be combined into an [`ErrorMask`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Severity {
    Error = 1,
    Warning = 2,
    Parse = 4,
    Notice = 8,
    CoreError = 16,
    CoreWarning = 32,
    CompileError = 64,
    CompileWarning = 128,
    UserError = 256,
    UserWarning = 512,
    UserNotice = 1024,
    Strict = 2048,
    RecoverableError = 4096,
    Deprecated = 8192,
    UserDeprecated = 16384,
}

const TABLE: [(Severity, &str); 15] = [
    (Severity::Error, "E_ERROR"),
    (Severity::Warning, "E_WARNING"),
    (Severity::Parse, "E_PARSE"),
    (Severity::Notice, "E_NOTICE"),
    (Severity::CoreError, "E_CORE_ERROR"),
    (Severity::CoreWarning, "E_CORE_WARNING"),
    (Severity::CompileError, "E_COMPILE_ERROR"),
    (Severity::CompileWarning, "E_COMPILE_WARNING"),
    (Severity::UserError, "E_USER_ERROR"),
    (Severity::UserWarning, "E_USER_WARNING"),
    (Severity::UserNotice, "E_USER_NOTICE"),
    (Severity::Strict, "E_STRICT"),
    (Severity::RecoverableError, "E_RECOVERABLE_ERROR"),
    (Severity::Deprecated, "E_DEPRECATED"),
    (Severity::UserDeprecated, "E_USER_DEPRECATED"),
];

impl Severity {
    pub fn code(self) -> u32 {
        self as u32
    }

    pub fn from_code(code: u32) -> Option<Self> {
        TABLE.iter().find(|(s, _)| s.code() == code).map(|(s, _)| *s)
    }

    pub fn name(self) -> &'static str {
        TABLE
            .iter()
            .find(|(s, _)| *s == self)
            .map(|(_, n)| *n)
            .unwrap_or("UNKNOWN")
    }

    /// Severities that end the process and are reported at shutdown.
    pub fn is_fatal(self) -> bool {
        matches!(
            self,
            Severity::Error | Severity::Parse | Severity::CoreError | Severity::CompileError
        )
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Name for a raw code, `UNKNOWN` when it is not a single known severity.
pub fn severity_name(code: u32) -> &'static str {
    Severity::from_code(code).map(Severity::name).unwrap_or("UNKNOWN")
}

/// Which severities the runtime-error handler records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorMask(pub u32);

impl ErrorMask {
    pub const ALL: ErrorMask = ErrorMask(32767);
    pub const NONE: ErrorMask = ErrorMask(0);

    pub fn allows(self, code: u32) -> bool {
        self.0 & code != 0
    }

    pub fn without(self, severity: Severity) -> Self {
        ErrorMask(self.0 & !severity.code())
    }

    pub fn with(self, severity: Severity) -> Self {
        ErrorMask(self.0 | severity.code())
    }
}

impl Default for ErrorMask {
    fn default() -> Self {
        ErrorMask::ALL
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_maps_codes_and_names() {
        assert_eq!(severity_name(2), "E_WARNING");
        assert_eq!(severity_name(16384), "E_USER_DEPRECATED");
        assert_eq!(severity_name(3), "UNKNOWN");
        assert_eq!(Severity::from_code(64), Some(Severity::CompileError));
    }

    #[test]
    fn fatal_class() {
        let fatal: Vec<_> = TABLE.iter().map(|(s, _)| *s).filter(|s| s.is_fatal()).collect();
        assert_eq!(
            fatal,
            [Severity::Error, Severity::Parse, Severity::CoreError, Severity::CompileError]
        );
    }

    #[test]
    fn mask_filters() {
        let mask = ErrorMask::ALL.without(Severity::Notice);
        assert!(!mask.allows(Severity::Notice.code()));
        assert!(mask.allows(Severity::Warning.code()));
        assert!(ErrorMask::NONE.with(Severity::UserError).allows(256));
    }
}
