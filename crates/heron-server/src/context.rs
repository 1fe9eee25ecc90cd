//! What a handler sees of its request.

use heron_core::{EndpointDescriptor, HeronResult, RequestId, User};
use heron_middleware::{MiddlewareContext, Request};
use heron_router::Params;
use heron_telemetry::RequestTrace;
use http::{HeaderMap, Method};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// The request handed to a handler once every pipeline stage continued.
///
/// Query and body values are the validated ones: reference fields such as
/// `userId` already hold the resolved user.
#[derive(Debug)]
pub struct RequestContext {
    middleware: MiddlewareContext,
    params: Params,
    request: Request,
}

impl RequestContext {
    /// Wraps the state the pipeline left behind.
    #[must_use]
    pub fn new(middleware: MiddlewareContext, params: Params, request: Request) -> Self {
        Self {
            middleware,
            params,
            request,
        }
    }

    /// Request id, also sent back as `x-trace-id`.
    #[must_use]
    pub fn request_id(&self) -> RequestId {
        self.middleware.request_id()
    }

    /// The endpoint being served.
    #[must_use]
    pub fn descriptor(&self) -> &EndpointDescriptor {
        self.middleware.descriptor()
    }

    /// Request method.
    #[must_use]
    pub fn method(&self) -> &Method {
        self.request.method()
    }

    /// Request headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        self.request.headers()
    }

    /// The raw request, body included.
    #[must_use]
    pub fn request(&self) -> &Request {
        &self.request
    }

    /// Captured path parameters.
    #[must_use]
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// One path parameter.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name)
    }

    /// The authenticated user, if `auth:validToken` ran.
    #[must_use]
    pub fn user(&self) -> Option<User> {
        self.middleware.user()
    }

    /// The authenticated user, or an authentication error.
    pub fn require_user(&self) -> HeronResult<User> {
        self.middleware.require_user()
    }

    /// A validated query value.
    #[must_use]
    pub fn query(&self, name: &str) -> Option<&Value> {
        self.middleware.query(name)
    }

    /// A validated query value, deserialized.
    pub fn query_as<T: DeserializeOwned>(&self, name: &str) -> HeronResult<T> {
        self.middleware.query_as(name)
    }

    /// The validated JSON body.
    #[must_use]
    pub fn body(&self) -> Option<&Value> {
        self.middleware.body()
    }

    /// The validated JSON body, deserialized.
    pub fn body_as<T: DeserializeOwned>(&self) -> HeronResult<T> {
        self.middleware.body_as()
    }

    /// Appends a note to the handler's trace span.
    pub fn annotate(&mut self, text: impl Into<String>) {
        self.middleware.trace_mut().annotate(text);
    }

    /// The pipeline context, for patches and extensions.
    #[must_use]
    pub fn middleware(&self) -> &MiddlewareContext {
        &self.middleware
    }

    /// Mutable pipeline context.
    pub fn middleware_mut(&mut self) -> &mut MiddlewareContext {
        &mut self.middleware
    }

    /// Gives the trace back once the response is known.
    #[must_use]
    pub fn into_trace(self) -> RequestTrace {
        self.middleware.into_trace()
    }
}
