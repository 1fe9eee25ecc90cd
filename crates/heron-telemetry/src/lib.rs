//! # Heron Telemetry
//!
//! Observability for Heron services:
//!
//! - **Logging**: [`init_logging`] installs a JSON or pretty `tracing`
//!   subscriber filtered by an `EnvFilter` directive.
//! - **Request traces**: [`RequestTrace`] records the spans of a single
//!   request and renders them as a short text block.
//! - **Fault reporting**: [`TelemetrySink`] receives unhandled request
//!   failures; [`TracingSink`] logs them.
//!
//! ```rust,ignore
//! use heron_telemetry::{init_logging, LogConfig};
//!
//! init_logging(&LogConfig::production())?;
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod logging;
pub mod sink;
pub mod tracer;

pub use error::TelemetryError;
pub use logging::{init_logging, LogConfig, LogFormat};
pub use sink::{Fault, FaultKind, RecordingSink, TelemetrySink, TracingSink};
pub use tracer::{RequestTrace, TraceSpan};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
