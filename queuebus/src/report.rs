//! Reporting of failures that never reach a caller.
//!
//! Handler failures happen on the dispatcher thread after the producer has
//! returned, skipped registrations are not fatal, and an unclean shutdown
//! still completes. All three are described by an [`ErrorReport`] and handed
//! to an [`ErrorSink`] injected into the bus. The default sink,
//! [`TracingSink`], writes them to `tracing`.

use std::fmt;
use std::sync::Arc;

/// What went wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// An event was rejected because the queue is full.
    CapacityExceeded,
    /// An argument or declaration was rejected.
    InvalidArgument,
    /// A handler declaration did not have the required shape and was skipped.
    RegistrationSkipped,
    /// A handler returned an error or panicked.
    DispatchFailure,
    /// The dispatcher did not shut down cleanly.
    ShutdownInterrupted,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::CapacityExceeded => "capacity_exceeded",
            ErrorKind::InvalidArgument => "invalid_argument",
            ErrorKind::RegistrationSkipped => "registration_skipped",
            ErrorKind::DispatchFailure => "dispatch_failure",
            ErrorKind::ShutdownInterrupted => "shutdown_interrupted",
        };
        f.write_str(name)
    }
}

/// How serious a report is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    /// Diagnostic detail.
    Fine,
    /// Expected but noteworthy.
    Info,
    /// Something failed but the bus keeps working.
    Warning,
    /// The bus could not do what was asked.
    Severe,
}

/// One failure report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorReport {
    /// What went wrong.
    pub kind: ErrorKind,
    /// How serious it is.
    pub severity: Severity,
    /// Where it happened, e.g. `"EventBus::disable"`.
    pub context: &'static str,
    /// Free-form detail such as the handler name and error message.
    pub detail: Option<String>,
}

impl ErrorReport {
    /// Creates a report without detail.
    pub fn new(kind: ErrorKind, severity: Severity, context: &'static str) -> Self {
        Self {
            kind,
            severity,
            context,
            detail: None,
        }
    }

    /// Attaches detail to the report.
    pub fn with_detail<S: Into<String>>(mut self, detail: S) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

impl fmt::Display for ErrorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {} in {}", self.severity, self.kind, self.context)?;
        if let Some(detail) = &self.detail {
            write!(f, ": {}", detail)?;
        }
        Ok(())
    }
}

/// Receives failure reports from the bus.
///
/// Implementations must not block for long: `report` is called on the
/// dispatcher thread and delays every queued event while it runs.
pub trait ErrorSink: Send + Sync + 'static {
    /// Records one report.
    fn report(&self, report: ErrorReport);
}

impl<F> ErrorSink for F
where
    F: Fn(ErrorReport) + Send + Sync + 'static,
{
    fn report(&self, report: ErrorReport) {
        self(report)
    }
}

/// Shared handle to an error sink.
pub type SharedErrorSink = Arc<dyn ErrorSink>;

/// Writes reports to `tracing`, mapping severity onto levels.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl ErrorSink for TracingSink {
    fn report(&self, report: ErrorReport) {
        let kind = report.kind.to_string();
        let detail = report.detail.as_deref().unwrap_or("");
        match report.severity {
            Severity::Fine => {
                tracing::debug!(kind = %kind, context = report.context, "{}", detail)
            }
            Severity::Info => {
                tracing::info!(kind = %kind, context = report.context, "{}", detail)
            }
            Severity::Warning => {
                tracing::warn!(kind = %kind, context = report.context, "{}", detail)
            }
            Severity::Severe => {
                tracing::error!(kind = %kind, context = report.context, "{}", detail)
            }
        }
    }
}
