//! Fault reporting.
//!
//! The server's error boundary hands every unhandled failure to a
//! [`TelemetrySink`] before answering 500: a handler error or panic, a
//! middleware panic, or a stage that ended with a fault.

use std::fmt;
use std::sync::Arc;

use heron_core::RequestId;
use http::Method;
use parking_lot::Mutex;

/// How the request failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    /// A handler returned an error or a stage ended with a fault.
    Error,
    /// A handler or middleware panicked.
    Panic,
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Error => "error",
            Self::Panic => "panic",
        })
    }
}

/// An unhandled failure escaping the pipeline or the handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    /// Request the fault happened in.
    pub request_id: RequestId,
    /// Request method.
    pub method: Method,
    /// Request path.
    pub path: String,
    /// Error or panic.
    pub kind: FaultKind,
    /// Error message or panic payload.
    pub message: String,
}

/// Accepts unhandled-fault reports.
pub trait TelemetrySink: Send + Sync + 'static {
    /// Records a fault. Must not block.
    fn report(&self, fault: &Fault);
}

/// Logs faults through `tracing` at error level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl TelemetrySink for TracingSink {
    fn report(&self, fault: &Fault) {
        tracing::error!(
            request_id = %fault.request_id,
            http.method = %fault.method,
            http.path = %fault.path,
            kind = %fault.kind,
            error = %fault.message,
            "Unhandled request fault"
        );
    }
}

/// Keeps every reported fault in memory.
///
/// Clones share the same buffer, so a test can hand one clone to the server
/// and inspect the other.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    faults: Arc<Mutex<Vec<Fault>>>,
}

impl RecordingSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Faults reported so far.
    #[must_use]
    pub fn faults(&self) -> Vec<Fault> {
        self.faults.lock().clone()
    }
}

impl TelemetrySink for RecordingSink {
    fn report(&self, fault: &Fault) {
        self.faults.lock().push(fault.clone());
    }
}
