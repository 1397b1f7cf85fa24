//! Injected logging interface.
//!
//! Operations, the authentication validator and the stores receive an
//! `Arc<dyn Logger>` instead of reaching for a process-wide logger. The
//! production implementation forwards everything to `tracing`, so the
//! subscriber installed in `main` still decides formatting and filtering.

use std::error::Error;

use tracing::Span;

/// Logging sink handed to every component that reports diagnostics.
///
/// `tags` identify the emitting component (usually the operation name) and end
/// up as a structured field on the event.
pub trait Logger: Send + Sync {
    fn info(&self, message: &str, tags: &[&str]);

    fn debug(&self, message: &str, tags: &[&str]);

    fn warn(&self, message: &str, error: Option<&(dyn Error + 'static)>, tags: &[&str]);

    fn error(&self, message: &str, error: Option<&(dyn Error + 'static)>, tags: &[&str]);

    /// Open a trace covering one operation invocation.
    ///
    /// The returned span is attached to the invocation's future, so it is
    /// closed when the invocation completes on every path.
    fn start_trace(&self, operation: &str) -> Span;
}

/// [`Logger`] backed by the `tracing` macros.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn info(&self, message: &str, tags: &[&str]) {
        tracing::info!(tags = ?tags, "{message}");
    }

    fn debug(&self, message: &str, tags: &[&str]) {
        tracing::debug!(tags = ?tags, "{message}");
    }

    fn warn(&self, message: &str, error: Option<&(dyn Error + 'static)>, tags: &[&str]) {
        match error {
            Some(err) => tracing::warn!(tags = ?tags, error = %err, "{message}"),
            None => tracing::warn!(tags = ?tags, "{message}"),
        }
    }

    fn error(&self, message: &str, error: Option<&(dyn Error + 'static)>, tags: &[&str]) {
        match error {
            Some(err) => tracing::error!(tags = ?tags, error = ?err, "{message}"),
            None => tracing::error!(tags = ?tags, "{message}"),
        }
    }

    fn start_trace(&self, operation: &str) -> Span {
        tracing::info_span!("operation", name = %operation)
    }
}
