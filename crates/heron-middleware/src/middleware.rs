//! Core middleware trait and outcome types.

use std::future::Future;
use std::pin::Pin;

use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use serde::Serialize;
use serde_json::Value;

use crate::context::MiddlewareContext;
use crate::types::{Request, Response, ResponseExt};

/// A boxed future that is Send.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A response that ends the pipeline early.
#[derive(Debug, Clone, PartialEq)]
pub struct EndResponse {
    /// Response status.
    pub status: StatusCode,
    /// JSON body.
    pub body: Value,
    /// Extra response headers.
    pub headers: HeaderMap,
    /// Detail of a server-side failure behind this response. The server
    /// reports it to the telemetry sink; clients never see it.
    pub fault: Option<String>,
}

impl EndResponse {
    /// Adds a response header.
    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Converts into an HTTP response.
    #[must_use]
    pub fn into_response(self) -> Response {
        let mut response = Response::json(self.status, &self.body);
        response.headers_mut().extend(self.headers);
        response
    }
}

/// What a stage decided.
#[derive(Debug, Clone, PartialEq)]
pub enum MiddlewareOutcome {
    /// Run the next stage. A present patch is stored in the context under
    /// the stage's name.
    Continue(Option<Value>),
    /// Stop here and answer with this response.
    End(EndResponse),
}

impl MiddlewareOutcome {
    /// Continue without a patch.
    #[must_use]
    pub const fn proceed() -> Self {
        Self::Continue(None)
    }

    /// Continue, storing `patch`.
    ///
    /// A patch that cannot be serialized ends the request with a fault.
    pub fn patch<T: Serialize>(patch: &T) -> Self {
        match serde_json::to_value(patch) {
            Ok(value) => Self::Continue(Some(value)),
            Err(e) => Self::fault(
                "Internal server error",
                format_args!("middleware patch is not serializable: {e}"),
            ),
        }
    }

    /// End with `status` and a JSON `body`.
    #[must_use]
    pub fn end(status: StatusCode, body: Value) -> Self {
        Self::End(EndResponse {
            status,
            body,
            headers: HeaderMap::new(),
            fault: None,
        })
    }

    /// End with 500 `{"message": message}` and hand `detail` to the fault
    /// sink.
    #[must_use]
    pub fn fault(message: &str, detail: impl std::fmt::Display) -> Self {
        Self::End(EndResponse {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: serde_json::json!({ "message": message }),
            headers: HeaderMap::new(),
            fault: Some(detail.to_string()),
        })
    }

    /// End with `{"message": message}`.
    #[must_use]
    pub fn message(status: StatusCode, message: &str) -> Self {
        Self::end(status, serde_json::json!({ "message": message }))
    }

    /// Returns true for [`MiddlewareOutcome::End`].
    #[must_use]
    pub const fn is_end(&self) -> bool {
        matches!(self, Self::End(_))
    }
}

/// A pipeline stage.
///
/// Stages run strictly in order. Each one sees the patches of every stage
/// before it and returns a [`MiddlewareOutcome`].
///
/// ```ignore
/// use heron_middleware::{BoxFuture, Middleware, MiddlewareContext, MiddlewareOutcome, Request};
///
/// struct RequireJson;
///
/// impl Middleware for RequireJson {
///     fn name(&self) -> &'static str {
///         "json:only"
///     }
///
///     fn process<'a>(
///         &'a self,
///         _ctx: &'a mut MiddlewareContext,
///         request: &'a Request,
///     ) -> BoxFuture<'a, MiddlewareOutcome> {
///         Box::pin(async move {
///             match request.headers().get("content-type") {
///                 Some(v) if v == "application/json" => MiddlewareOutcome::proceed(),
///                 _ => MiddlewareOutcome::message(http::StatusCode::UNSUPPORTED_MEDIA_TYPE, "JSON only."),
///             }
///         })
///     }
/// }
/// ```
pub trait Middleware: Send + Sync + 'static {
    /// Stage name; patches and trace spans are keyed by it.
    fn name(&self) -> &'static str;

    /// Runs the stage.
    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: &'a Request,
    ) -> BoxFuture<'a, MiddlewareOutcome>;
}

/// A synchronous middleware built from a closure.
pub struct FnMiddleware<F> {
    name: &'static str,
    f: F,
}

impl<F> FnMiddleware<F>
where
    F: Fn(&mut MiddlewareContext, &Request) -> MiddlewareOutcome + Send + Sync + 'static,
{
    /// Wraps `f` as a stage called `name`.
    pub const fn new(name: &'static str, f: F) -> Self {
        Self { name, f }
    }
}

impl<F> Middleware for FnMiddleware<F>
where
    F: Fn(&mut MiddlewareContext, &Request) -> MiddlewareOutcome + Send + Sync + 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: &'a Request,
    ) -> BoxFuture<'a, MiddlewareOutcome> {
        let outcome = (self.f)(ctx, request);
        Box::pin(async move { outcome })
    }
}
