//! Endpoint handlers.
//!
//! A handler runs after every pipeline stage continued. It either answers
//! with a response or fails; failures and panics are caught by the server,
//! reported to the telemetry sink and turned into a 500.

use std::sync::Arc;

use heron_core::HeronResult;
use heron_middleware::{BoxFuture, Response};

use crate::context::RequestContext;

/// A type-erased handler.
pub type BoxedHandler = Arc<dyn Handler>;

/// Serves one (path, method) once the pipeline let the request through.
///
/// ```rust,ignore
/// struct WhoAmI;
///
/// impl Handler for WhoAmI {
///     fn call<'a>(&'a self, ctx: &'a mut RequestContext) -> BoxFuture<'a, HeronResult<Response>> {
///         Box::pin(async move {
///             let user = ctx.require_user()?;
///             Ok(Response::json(StatusCode::OK, &user.profile()))
///         })
///     }
/// }
/// ```
pub trait Handler: Send + Sync + 'static {
    /// Produces the response.
    fn call<'a>(&'a self, ctx: &'a mut RequestContext) -> BoxFuture<'a, HeronResult<Response>>;
}

/// A handler built from a closure.
///
/// ```rust
/// use heron_middleware::{Response, ResponseExt};
/// use heron_server::FnHandler;
/// use http::StatusCode;
///
/// let ping = FnHandler::new(|_ctx| {
///     Box::pin(async move { Ok(Response::text(StatusCode::OK, "pong")) })
/// });
/// ```
pub struct FnHandler<F> {
    f: F,
}

impl<F> FnHandler<F>
where
    F: for<'a> Fn(&'a mut RequestContext) -> BoxFuture<'a, HeronResult<Response>>
        + Send
        + Sync
        + 'static,
{
    /// Wraps `f`.
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> Handler for FnHandler<F>
where
    F: for<'a> Fn(&'a mut RequestContext) -> BoxFuture<'a, HeronResult<Response>>
        + Send
        + Sync
        + 'static,
{
    fn call<'a>(&'a self, ctx: &'a mut RequestContext) -> BoxFuture<'a, HeronResult<Response>> {
        (self.f)(ctx)
    }
}
