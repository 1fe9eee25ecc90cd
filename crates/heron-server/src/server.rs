//! HTTP server.
//!
//! One Tokio task per connection, HTTP/1.1 via Hyper. Every request goes
//! through [`Server::handle`]:
//!
//! 1. the body is collected;
//! 2. built-in paths (`/health`, `/ready`, `/opendocs`) answer directly;
//! 3. the route table is consulted: no match is 501, OPTIONS is the
//!    derived preflight;
//! 4. the endpoint's pipeline runs, then its handler, inside one error
//!    boundary. A client-category [`HeronError`] answers with its status
//!    in the error envelope; any other `Err`, a panic, or a stage ending
//!    with a fault is reported to the sink and answers 500;
//! 5. CORS headers and `x-trace-id` are added to whatever came out.
//!
//! Steps 1 to 4 share one deadline; expiry answers 504.

use std::convert::Infallible;
use std::fmt::Display;
use std::net::SocketAddr;
use std::ops::ControlFlow;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use futures_util::FutureExt;
use heron_core::{DataStore, HeronError, RequestId};
use heron_middleware::{MiddlewareContext, MiddlewareRegistry, Request, Response, ResponseExt};
use heron_router::{Params, RouteMatch, Target};
use heron_telemetry::{Fault, FaultKind, RequestTrace, TelemetrySink, TracingSink};
use http::header::{HeaderName, HeaderValue, ALLOW, CONTENT_TYPE};
use http::{Method, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper::body::{Body, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, info_span, warn, Instrument, Level};

use crate::config::ServerConfig;
use crate::context::RequestContext;
use crate::endpoint::EndpointDeclaration;
use crate::error::{ServerError, ServerResult};
use crate::health::{self, ReadinessCheck, HEALTH_PATH, READY_PATH};
use crate::registry::{CompiledEndpoint, EndpointRegistry};
use crate::shutdown::{ConnectionTracker, ShutdownSignal};

/// Path serving the API document.
pub const DOCS_PATH: &str = "/opendocs";

/// Response header carrying the request id.
pub const TRACE_ID_HEADER: HeaderName = HeaderName::from_static("x-trace-id");

/// Body of the derived OPTIONS response.
pub const PREFLIGHT_BODY: &str = "Look header's Allow property :)";

/// A built Heron server. Immutable; share it through `Arc`.
pub struct Server {
    config: ServerConfig,
    registry: EndpointRegistry,
    readiness: ReadinessCheck,
    sink: Arc<dyn TelemetrySink>,
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("config", &self.config)
            .field("routes", &self.registry.len())
            .field("readiness", &self.readiness)
            .finish_non_exhaustive()
    }
}

impl Server {
    /// Starts a builder over the data store used by the built-in
    /// middleware and readiness check.
    #[must_use]
    pub fn builder(store: Arc<dyn DataStore>) -> ServerBuilder {
        ServerBuilder::new(store)
    }

    /// Server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Routes and API document.
    #[must_use]
    pub fn registry(&self) -> &EndpointRegistry {
        &self.registry
    }

    /// Readiness state.
    #[must_use]
    pub fn readiness(&self) -> &ReadinessCheck {
        &self.readiness
    }

    /// Serves until SIGINT or SIGTERM.
    pub async fn run(self) -> ServerResult<()> {
        self.run_with_shutdown(ShutdownSignal::with_os_signals()).await
    }

    /// Binds the configured address and serves until `shutdown` fires.
    pub async fn run_with_shutdown(self, shutdown: ShutdownSignal) -> ServerResult<()> {
        let addr = self.config.http_addr().to_string();
        let socket: SocketAddr = self.config.socket_addr().map_err(|e| ServerError::Bind {
            addr: addr.clone(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, e),
        })?;
        let listener = TcpListener::bind(socket)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;
        self.serve(listener, shutdown).await
    }

    /// Serves connections from `listener` until `shutdown` fires, then
    /// waits up to the shutdown timeout for open connections.
    pub async fn serve(self, listener: TcpListener, shutdown: ShutdownSignal) -> ServerResult<()> {
        if let Ok(addr) = listener.local_addr() {
            info!(%addr, routes = self.registry.len(), "server listening");
        }

        let server = Arc::new(self);
        let tracker = ConnectionTracker::new();

        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, remote)) => {
                        let server = Arc::clone(&server);
                        let token = tracker.acquire();
                        let shutdown = shutdown.clone();
                        tokio::spawn(async move {
                            if let Err(e) = server.serve_connection(stream, shutdown).await {
                                debug!(%remote, error = %e, "connection error");
                            }
                            drop(token);
                        });
                    }
                    Err(e) => error!(error = %e, "failed to accept connection"),
                },
                () = shutdown.recv() => {
                    info!("shutdown signal received, no longer accepting connections");
                    break;
                }
            }
        }

        server.readiness.set_shutting_down();
        let timeout = server.config.shutdown_timeout();
        info!(
            active = tracker.active_connections(),
            timeout_secs = timeout.as_secs(),
            "waiting for open connections"
        );
        if tokio::time::timeout(timeout, tracker.wait_for_shutdown())
            .await
            .is_err()
        {
            warn!(
                active = tracker.active_connections(),
                "shutdown timeout reached with connections still open"
            );
        }
        info!("server stopped");
        Ok(())
    }

    async fn serve_connection(
        self: Arc<Self>,
        stream: TcpStream,
        shutdown: ShutdownSignal,
    ) -> Result<(), hyper::Error> {
        let server = Arc::clone(&self);
        let service = service_fn(move |request: http::Request<Incoming>| {
            let server = Arc::clone(&server);
            async move { Ok::<_, Infallible>(server.handle(request).await) }
        });

        let conn = http1::Builder::new().serve_connection(TokioIo::new(stream), service);
        tokio::pin!(conn);

        tokio::select! {
            result = conn.as_mut() => result,
            () = shutdown.recv() => {
                conn.as_mut().graceful_shutdown();
                conn.await
            }
        }
    }

    /// Answers one request. Never fails: every outcome is a response.
    pub async fn handle<B>(&self, request: http::Request<B>) -> Response
    where
        B: Body + Send,
        B::Data: Send,
        B::Error: Display,
    {
        let id = RequestId::new();
        let method = request.method().clone();
        let path = request.uri().path().to_string();
        let started = Instant::now();
        let span = info_span!(
            "request",
            request_id = %id,
            http.method = %method,
            http.path = %path
        );

        let deadline = self.config.request_timeout();
        let mut response = match tokio::time::timeout(deadline, self.respond(id, request))
            .instrument(span.clone())
            .await
        {
            Ok(response) => response,
            Err(_) => {
                warn!(parent: &span, timeout_ms = deadline.as_millis(), "request timed out");
                error_envelope(
                    &HeronError::timeout(format!(
                        "Request did not complete within {}ms",
                        deadline.as_millis()
                    )),
                    id,
                )
            }
        };

        self.config.cors().apply(response.headers_mut());
        if let Ok(value) = HeaderValue::from_str(&id.to_string()) {
            response.headers_mut().insert(TRACE_ID_HEADER, value);
        }

        info!(
            parent: &span,
            http.status_code = response.status().as_u16(),
            duration_ms = started.elapsed().as_millis(),
            "request completed"
        );
        response
    }

    async fn respond<B>(&self, id: RequestId, request: http::Request<B>) -> Response
    where
        B: Body + Send,
        B::Data: Send,
        B::Error: Display,
    {
        let (parts, body) = request.into_parts();
        let body = match body.collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(e) => {
                warn!(error = %e, "failed to read request body");
                return Response::json_error(
                    StatusCode::BAD_REQUEST,
                    "BODY_READ_ERROR",
                    &format!("Failed to read request body: {e}"),
                );
            }
        };
        let request = Request::from_parts(parts, body);
        let method = request.method().clone();
        let path = request.uri().path().to_string();

        let (response, trace) = self.route(RequestTrace::begin(id), request).await;
        if tracing::enabled!(Level::DEBUG) {
            debug!("{}", trace.render(&method, &path, response.status()));
        }
        response
    }

    async fn route(&self, trace: RequestTrace, request: Request) -> (Response, RequestTrace) {
        let method = request.method().clone();
        let path = request.uri().path().to_string();

        if method == Method::GET {
            match path.as_str() {
                HEALTH_PATH => {
                    return (json_value(StatusCode::OK, &health::health()), trace);
                }
                READY_PATH => {
                    let status = self.readiness.status();
                    return (json_value(status.status_code(), &status), trace);
                }
                DOCS_PATH => {
                    return (json_bytes(StatusCode::OK, self.registry.document_json()), trace);
                }
                _ => {}
            }
        }

        let Some(RouteMatch { target, params }) = self.registry.dispatch(&method, &path) else {
            debug!("no route");
            let response = Response::json_error(
                StatusCode::NOT_IMPLEMENTED,
                "ROUTE_NOT_IMPLEMENTED",
                &format!("{method} {path} is not implemented"),
            );
            return (response, trace);
        };

        match target {
            Target::Preflight { allow } => {
                let mut response = Response::text(StatusCode::OK, PREFLIGHT_BODY);
                if let Ok(value) = HeaderValue::from_str(allow) {
                    response.headers_mut().insert(ALLOW, value);
                }
                (response, trace)
            }
            Target::Endpoint(endpoint) => self.serve_endpoint(endpoint, params, trace, request).await,
        }
    }

    /// Runs the pipeline and the handler inside one error boundary. A panic
    /// in either loses the trace collected so far.
    async fn serve_endpoint(
        &self,
        endpoint: &CompiledEndpoint,
        params: Params,
        trace: RequestTrace,
        request: Request,
    ) -> (Response, RequestTrace) {
        let id = trace.id();
        let method = request.method().clone();
        let path = request.uri().path().to_string();

        let outcome = AssertUnwindSafe(self.run_endpoint(endpoint, params, trace, request))
            .catch_unwind()
            .await;
        match outcome {
            Ok(served) => served,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                self.report(id, &method, &path, FaultKind::Panic, message.clone());
                (internal_error(&message), RequestTrace::begin(id))
            }
        }
    }

    async fn run_endpoint(
        &self,
        endpoint: &CompiledEndpoint,
        params: Params,
        trace: RequestTrace,
        request: Request,
    ) -> (Response, RequestTrace) {
        let id = trace.id();
        let mut middleware = MiddlewareContext::new(Arc::clone(&endpoint.descriptor), trace);
        if let ControlFlow::Break(mut end) = endpoint.pipeline.run(&mut middleware, &request).await {
            if let Some(detail) = end.fault.take() {
                self.report(
                    id,
                    request.method(),
                    request.uri().path(),
                    FaultKind::Error,
                    detail,
                );
            }
            return (end.into_response(), middleware.into_trace());
        }

        let span_name = format!("{} {}", endpoint.descriptor.method, endpoint.descriptor.path);
        let mut ctx = RequestContext::new(middleware, params, request);
        ctx.middleware_mut().trace_mut().start_span(span_name.clone());
        let result = endpoint.handler.call(&mut ctx).await;
        ctx.middleware_mut().trace_mut().end_span(&span_name);

        let response = match result {
            Ok(response) => response,
            Err(err) if err.status_code().is_client_error() => {
                debug!(error = %err, "handler rejected the request");
                error_envelope(&err, id)
            }
            Err(err) => {
                let path = ctx.request().uri().path().to_string();
                self.report(id, ctx.method(), &path, FaultKind::Error, err.to_string());
                internal_error(err.message())
            }
        };
        (response, ctx.into_trace())
    }

    fn report(&self, request_id: RequestId, method: &Method, path: &str, kind: FaultKind, message: String) {
        self.sink.report(&Fault {
            request_id,
            method: method.clone(),
            path: path.to_string(),
            kind,
            message,
        });
    }
}

/// The 500 answered for an unhandled failure.
fn internal_error(message: &str) -> Response {
    Response::json(
        StatusCode::INTERNAL_SERVER_ERROR,
        &serde_json::json!({ "error": message }),
    )
}

/// `err` in the `{"error":{..},"request_id"}` envelope, with its
/// category's status.
fn error_envelope(err: &HeronError, id: RequestId) -> Response {
    json_value(err.status_code(), &err.to_envelope(Some(&id.to_string())))
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "request panicked".to_string()
    }
}

fn json_value<T: serde::Serialize>(status: StatusCode, body: &T) -> Response {
    match serde_json::to_value(body) {
        Ok(value) => Response::json(status, &value),
        Err(e) => Response::json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "SERIALIZATION_ERROR",
            &e.to_string(),
        ),
    }
}

fn json_bytes(status: StatusCode, body: Bytes) -> Response {
    let mut response = http::Response::new(Full::new(body));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

/// Builder for [`Server`].
pub struct ServerBuilder {
    config: ServerConfig,
    store: Arc<dyn DataStore>,
    middleware: Option<MiddlewareRegistry>,
    sink: Arc<dyn TelemetrySink>,
    declarations: Vec<EndpointDeclaration>,
}

impl std::fmt::Debug for ServerBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerBuilder")
            .field("config", &self.config)
            .field("declarations", &self.declarations)
            .finish_non_exhaustive()
    }
}

impl ServerBuilder {
    /// Default configuration, the built-in middleware over `store`, and a
    /// sink that logs faults.
    #[must_use]
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self {
            config: ServerConfig::default(),
            store,
            middleware: None,
            sink: Arc::new(TracingSink),
            declarations: Vec::new(),
        }
    }

    /// Replaces the configuration.
    #[must_use]
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Replaces the middleware registry.
    #[must_use]
    pub fn middleware(mut self, registry: MiddlewareRegistry) -> Self {
        self.middleware = Some(registry);
        self
    }

    /// Replaces the fault sink.
    #[must_use]
    pub fn sink(mut self, sink: Arc<dyn TelemetrySink>) -> Self {
        self.sink = sink;
        self
    }

    /// Adds a declaration.
    #[must_use]
    pub fn endpoint(mut self, declaration: EndpointDeclaration) -> Self {
        self.declarations.push(declaration);
        self
    }

    /// Adds declarations.
    #[must_use]
    pub fn endpoints(mut self, declarations: impl IntoIterator<Item = EndpointDeclaration>) -> Self {
        self.declarations.extend(declarations);
        self
    }

    /// Builds the route table and API document.
    ///
    /// Fails on duplicate routes and unknown middleware names.
    pub fn build(self) -> ServerResult<Server> {
        let middleware = self
            .middleware
            .unwrap_or_else(|| MiddlewareRegistry::new(Arc::clone(&self.store)));
        let registry = EndpointRegistry::build(
            self.declarations,
            &middleware,
            self.config.docs().builder(),
        )?;

        Ok(Server {
            readiness: ReadinessCheck::new(Some(self.store)),
            config: self.config,
            registry,
            sink: self.sink,
        })
    }
}
