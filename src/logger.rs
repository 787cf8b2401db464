//! Logging capability injected into connections.
//!
//! Connections never own their logger's lifecycle; they hold a shared handle and call it
//! unconditionally. When nothing is configured the handle points at a [`NoopLogger`].

use std::fmt;
use std::sync::Arc;

/// A sink for connection log records.
///
/// `origin` is a dotted `Component.operation` tag such as `WebSocket.connect`. The
/// `also_console` flag is a hint that the record should additionally reach an interactive
/// console; how (or whether) that happens is up to the implementation.
pub trait Logger: fmt::Debug + Send + Sync {
    /// Record an informational message.
    fn log_message(&self, origin: &str, text: &str, also_console: bool);

    /// Record an error.
    fn log_error(&self, origin: &str, text: &str, also_console: bool);

    /// Informational message, not echoed to the console.
    fn message(&self, origin: &str, text: &str) {
        self.log_message(origin, text, false);
    }

    /// Error, echoed to the console.
    fn error(&self, origin: &str, text: &str) {
        self.log_error(origin, text, true);
    }
}

/// Shared logger handle.
pub type SharedLogger = Arc<dyn Logger>;

/// A logger which discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopLogger;

impl NoopLogger {
    /// A shared handle to a no-op logger.
    pub fn shared() -> SharedLogger {
        Arc::new(NoopLogger)
    }
}

impl Logger for NoopLogger {
    fn log_message(&self, _origin: &str, _text: &str, _also_console: bool) {}

    fn log_error(&self, _origin: &str, _text: &str, _also_console: bool) {}
}

/// A logger which forwards records to [`tracing`].
///
/// Messages become `INFO` events and errors become `ERROR` events, with the origin and the
/// console hint recorded as fields.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl TracingLogger {
    /// A shared handle to a tracing logger.
    pub fn shared() -> SharedLogger {
        Arc::new(TracingLogger)
    }
}

impl Logger for TracingLogger {
    fn log_message(&self, origin: &str, text: &str, also_console: bool) {
        tracing::info!(origin, console = also_console, "{text}");
    }

    fn log_error(&self, origin: &str, text: &str, also_console: bool) {
        tracing::error!(origin, console = also_console, "{text}");
    }
}
