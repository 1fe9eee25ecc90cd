//! Per-request tracing.
//!
//! A [`RequestTrace`] lives in the request context for exactly one request:
//! the server creates it on arrival, pipeline stages and handlers record
//! spans into it, and the server renders and drops it once the response is
//! produced.
//!
//! ```rust
//! use heron_core::RequestId;
//! use heron_telemetry::RequestTrace;
//! use http::{Method, StatusCode};
//!
//! let mut trace = RequestTrace::begin(RequestId::new());
//! trace.start_span("auth:validToken");
//! trace.annotate("db_query:findUserByToken - duration: 0ms");
//! trace.end_span("auth:validToken");
//!
//! let text = trace.render(&Method::GET, "/api/whoAmI", StatusCode::OK);
//! assert!(text.starts_with("GET - /api/whoAmI - 200 - "));
//! assert!(text.contains("  \\- trace: auth:validToken | ~"));
//! assert!(text.contains("    \\- * db_query:findUserByToken - duration: 0ms"));
//! ```

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use heron_core::RequestId;
use http::{Method, StatusCode};

/// One timed section of a request.
#[derive(Debug, Clone)]
pub struct TraceSpan {
    name: String,
    started: Instant,
    duration: Option<Duration>,
    annotations: Vec<String>,
}

impl TraceSpan {
    /// Span name, usually a middleware name or a handler label.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Time between `start_span` and `end_span`, `None` while open.
    #[must_use]
    pub fn duration(&self) -> Option<Duration> {
        self.duration
    }

    /// Free-form notes attached while the span was current.
    #[must_use]
    pub fn annotations(&self) -> &[String] {
        &self.annotations
    }

    fn is_open(&self) -> bool {
        self.duration.is_none()
    }
}

/// Span and annotation recorder for one request.
#[derive(Debug, Clone)]
pub struct RequestTrace {
    id: RequestId,
    created_at: DateTime<Utc>,
    started: Instant,
    spans: Vec<TraceSpan>,
}

impl RequestTrace {
    /// Starts a trace identified by `id`.
    #[must_use]
    pub fn begin(id: RequestId) -> Self {
        Self {
            id,
            created_at: Utc::now(),
            started: Instant::now(),
            spans: Vec::new(),
        }
    }

    /// The trace id, sent back as `x-trace-id`.
    #[must_use]
    pub fn id(&self) -> RequestId {
        self.id
    }

    /// Wall-clock creation time.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Time since the trace began.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Recorded spans in start order.
    #[must_use]
    pub fn spans(&self) -> &[TraceSpan] {
        &self.spans
    }

    /// Opens a span.
    pub fn start_span(&mut self, name: impl Into<String>) {
        self.spans.push(TraceSpan {
            name: name.into(),
            started: Instant::now(),
            duration: None,
            annotations: Vec::new(),
        });
    }

    /// Closes the most recent open span called `name`.
    pub fn end_span(&mut self, name: &str) {
        match self
            .spans
            .iter_mut()
            .rev()
            .find(|s| s.name == name && s.is_open())
        {
            Some(span) => span.duration = Some(span.started.elapsed()),
            None => tracing::warn!(
                trace_id = %self.id,
                span = name,
                "end_span on a span that is not open"
            ),
        }
    }

    /// Appends `text` to the most recently started span.
    pub fn annotate(&mut self, text: impl Into<String>) {
        match self.spans.last_mut() {
            Some(span) => span.annotations.push(text.into()),
            None => tracing::warn!(trace_id = %self.id, "annotate without any span"),
        }
    }

    /// Appends `text` to the most recent span called `name`.
    pub fn annotate_span(&mut self, name: &str, text: impl Into<String>) {
        match self.spans.iter_mut().rev().find(|s| s.name == name) {
            Some(span) => span.annotations.push(text.into()),
            None => tracing::warn!(
                trace_id = %self.id,
                span = name,
                "annotate_span on an unknown span"
            ),
        }
    }

    /// Renders the trace as a text block.
    ///
    /// The first span is indented two spaces and its notes four. Every
    /// later span and every note pushes what follows one column further
    /// right, so the block reads as a staircase.
    #[must_use]
    pub fn render(&self, method: &Method, path: &str, status: StatusCode) -> String {
        let mut lines = vec![format!(
            "{method} - {path} - {} - {}ms",
            status.as_u16(),
            self.elapsed().as_millis()
        )];
        let mut shift = 0;
        for (i, span) in self.spans.iter().enumerate() {
            let timing = match span.duration {
                Some(d) => format!("~{}ms", d.as_millis()),
                None => "unfinished".to_string(),
            };
            lines.push(format!(
                "{:indent$}\\- trace: {} | {timing}",
                "",
                span.name,
                indent = 2 + i + shift
            ));
            for note in &span.annotations {
                lines.push(format!("{:indent$}\\- * {note}", "", indent = 4 + i + shift));
                shift += 1;
            }
        }
        lines.join("\n")
    }
}
