//! Error-capture capabilities handed to the host.
//!
//! A [`RequestLogger`](crate::logger::RequestLogger) does not register
//! anything globally on its own. It hands out an [`ErrorHandler`] that the
//! host calls directly, or makes current for a thread ([`ErrorHandler::enter`])
//! or a tokio task ([`ErrorHandler::scope`]) so that the tracing capture
//! layer and the panic hook can find it.

use crate::record::{Context, EntryType};
use crate::sanitize::{sanitize_trace, StackFrame};
use crate::severity::{severity_name, ErrorMask, Severity};
use crate::writer::LogWriter;
use serde_json::Value;
use std::cell::RefCell;
use std::future::Future;
use std::marker::PhantomData;
use std::panic::PanicHookInfo;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Where an error was raised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    pub file: String,
    pub line: u32,
}

impl SourceLocation {
    pub fn new(file: impl Into<String>, line: u32) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }
}

/// Anything that can be logged as an uncaught exception.
pub trait Throwable {
    fn message(&self) -> String;
    fn location(&self) -> SourceLocation;
    fn trace(&self) -> Vec<StackFrame> {
        Vec::new()
    }
}

/// A concrete exception value, for hosts that collect the parts themselves.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedException {
    pub message: String,
    pub location: SourceLocation,
    pub trace: Vec<StackFrame>,
}

impl CapturedException {
    pub fn new(message: impl Into<String>, location: SourceLocation) -> Self {
        Self {
            message: message.into(),
            location,
            trace: Vec::new(),
        }
    }

    pub fn with_trace(mut self, trace: Vec<StackFrame>) -> Self {
        self.trace = trace;
        self
    }

    /// Build from a panic. Panics carry no frame list, so the trace is empty.
    pub fn from_panic(info: &PanicHookInfo<'_>) -> Self {
        let payload = info.payload();
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "Box<dyn Any>".to_string());
        let location = info
            .location()
            .map(|l| SourceLocation::new(l.file(), l.line()))
            .unwrap_or_else(|| SourceLocation::new("unknown", 0));
        Self::new(message, location)
    }
}

impl Throwable for CapturedException {
    fn message(&self) -> String {
        self.message.clone()
    }

    fn location(&self) -> SourceLocation {
        self.location.clone()
    }

    fn trace(&self) -> Vec<StackFrame> {
        self.trace.clone()
    }
}

/// The last error the host saw before the process ended.
#[derive(Debug, Clone, PartialEq)]
pub struct LastError {
    pub code: u32,
    pub message: String,
    pub location: SourceLocation,
}

impl LastError {
    pub fn new(severity: Severity, message: impl Into<String>, location: SourceLocation) -> Self {
        Self {
            code: severity.code(),
            message: message.into(),
            location,
        }
    }

    pub fn is_fatal(&self) -> bool {
        Severity::from_code(self.code).is_some_and(Severity::is_fatal)
    }
}

/// Writes captured runtime errors, exceptions and fatal errors for one
/// request. Cheap to clone; every clone writes to the same destination
/// and shares the same severity mask.
#[derive(Clone)]
pub struct ErrorHandler {
    writer: LogWriter,
    mask: Arc<AtomicU32>,
}

impl ErrorHandler {
    pub fn new(writer: LogWriter, mask: ErrorMask) -> Self {
        Self {
            writer,
            mask: Arc::new(AtomicU32::new(mask.0)),
        }
    }

    pub fn mask(&self) -> ErrorMask {
        ErrorMask(self.mask.load(Ordering::Relaxed))
    }

    /// Change which severities are recorded. Takes effect for every clone,
    /// including handlers already scoped around running work.
    pub fn set_mask(&self, mask: ErrorMask) {
        self.mask.store(mask.0, Ordering::Relaxed);
    }

    /// Record a runtime error unless its severity is masked out.
    ///
    /// The error always counts as handled; there is no default output to
    /// fall through to.
    pub fn handle_error(&self, code: u32, message: &str, file: &str, line: u32) {
        if !self.mask().allows(code) {
            return;
        }
        let mut ctx = Context::new();
        ctx.insert("errno".into(), Value::from(code));
        ctx.insert("type".into(), Value::from(severity_name(code)));
        self.writer.write(
            EntryType::PhpError,
            format!("{} in {} on line {}", message, file, line),
            Some(ctx),
        );
    }

    /// Record an uncaught exception with its first frames.
    pub fn handle_exception(&self, exception: &dyn Throwable) {
        let location = exception.location();
        let trace = sanitize_trace(&exception.trace());

        let mut ctx = Context::new();
        ctx.insert("file".into(), Value::from(location.file));
        ctx.insert("line".into(), Value::from(location.line));
        ctx.insert(
            "trace".into(),
            serde_json::to_value(trace).unwrap_or(Value::Array(Vec::new())),
        );
        self.writer
            .write(EntryType::Exception, exception.message(), Some(ctx));
    }

    /// Record `error` if it is fatal-class. Returns whether it was written.
    pub fn handle_fatal(&self, error: &LastError) -> bool {
        if !error.is_fatal() {
            return false;
        }
        self.writer.write(
            EntryType::FatalError,
            format!(
                "{} in {} on line {}",
                error.message, error.location.file, error.location.line
            ),
            None,
        );
        true
    }

    /// Make this handler current for the calling thread until the guard
    /// drops. Nested calls restore the outer handler.
    pub fn enter(&self) -> HandlerGuard {
        let previous = THREAD_HANDLER
            .try_with(|cell| cell.borrow_mut().replace(self.clone()))
            .ok()
            .flatten();
        HandlerGuard {
            previous,
            _not_send: PhantomData,
        }
    }

    /// Run `fut` with this handler current for the enclosing tokio task.
    pub async fn scope<F: Future>(self, fut: F) -> F::Output {
        TASK_HANDLER.scope(self, fut).await
    }

    /// The handler for the current task, else the current thread.
    pub fn current() -> Option<ErrorHandler> {
        TASK_HANDLER
            .try_with(|h| h.clone())
            .ok()
            .or_else(|| {
                THREAD_HANDLER
                    .try_with(|cell| cell.try_borrow().ok().and_then(|h| h.clone()))
                    .ok()
                    .flatten()
            })
    }
}

thread_local! {
    static THREAD_HANDLER: RefCell<Option<ErrorHandler>> = const { RefCell::new(None) };
}

tokio::task_local! {
    static TASK_HANDLER: ErrorHandler;
}

/// Restores the previously current handler on drop.
pub struct HandlerGuard {
    previous: Option<ErrorHandler>,
    // Thread-local state must be restored on the thread that set it.
    _not_send: PhantomData<*const ()>,
}

impl Drop for HandlerGuard {
    fn drop(&mut self) {
        let previous = self.previous.take();
        let _ = THREAD_HANDLER.try_with(|cell| {
            if let Ok(mut slot) = cell.try_borrow_mut() {
                *slot = previous;
            }
        });
    }
}

/// Install a process-wide panic hook that logs panics as `EXCEPTION`
/// entries through the current handler.
///
/// Panics raised where no handler is current fall through to the hook
/// that was installed before.
pub fn install_panic_hook() {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| match ErrorHandler::current() {
        Some(handler) => handler.handle_exception(&CapturedException::from_panic(info)),
        None => previous(info),
    }));
}
