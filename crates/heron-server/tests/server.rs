//! Request-boundary tests for the Heron server.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use heron_core::fixtures::{self, FixtureStore};
use heron_core::{
    DocMeta, HeronError, HeronResult, MiddlewareName, ObjectSchema, Rule, Schema, StoreState,
    Validation,
};
use heron_middleware::{
    FnMiddleware, MiddlewareContext, MiddlewareOutcome, MiddlewareRegistry, Request as StageRequest,
    Response, ResponseExt,
};
use heron_server::{
    EndpointDeclaration, FnHandler, Server, ServerConfig, ServerError, ShutdownSignal,
    PREFLIGHT_BODY,
};
use heron_telemetry::{FaultKind, RecordingSink};
use http::{header, Method, Request, StatusCode};
use http_body_util::{BodyExt, Full};
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

fn who_am_i() -> EndpointDeclaration {
    EndpointDeclaration::new("/api/whoAmI")
        .middleware("auth:validToken")
        .doc(DocMeta::new("Current user").tag("Users"))
        .get(FnHandler::new(|ctx| {
            Box::pin(async move {
                let user = ctx.require_user()?;
                Ok(Response::json(StatusCode::OK, &user.profile()))
            })
        }))
}

fn echo() -> EndpointDeclaration {
    EndpointDeclaration::new("/api/echo")
        .validation(
            Validation::new().body(ObjectSchema::new().field("word", Schema::string())),
        )
        .post(FnHandler::new(|ctx| {
            Box::pin(async move {
                let word = ctx.body().and_then(|b| b["word"].as_str()).unwrap_or_default();
                Ok(Response::text(StatusCode::OK, word))
            })
        }))
}

fn failing() -> EndpointDeclaration {
    EndpointDeclaration::new("/api/fail")
        .get(FnHandler::new(|_ctx| {
            Box::pin(async move { Err::<Response, _>(HeronError::internal("disk on fire")) })
        }))
        .post(FnHandler::new(|_ctx| Box::pin(async move { explode() })))
}

fn explode() -> HeronResult<Response> {
    panic!("handler exploded")
}

fn rejecting() -> EndpointDeclaration {
    EndpointDeclaration::new("/api/reject").get(FnHandler::new(|_ctx| {
        Box::pin(async move { Err::<Response, _>(HeronError::validation("bad input")) })
    }))
}

fn guarded() -> EndpointDeclaration {
    EndpointDeclaration::new("/api/guarded")
        .middleware("db:ready")
        .get(FnHandler::new(|_ctx| {
            Box::pin(async move { Ok(Response::text(StatusCode::OK, "unreachable")) })
        }))
}

fn stage_explodes(_ctx: &mut MiddlewareContext, _request: &StageRequest) -> MiddlewareOutcome {
    panic!("stage exploded")
}

fn slow() -> EndpointDeclaration {
    EndpointDeclaration::new("/api/slow").get(FnHandler::new(|_ctx| {
        Box::pin(async move {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(Response::text(StatusCode::OK, "late"))
        })
    }))
}

fn user_info() -> EndpointDeclaration {
    EndpointDeclaration::new("/api/getUserInfo")
        .middleware("auth:validToken")
        .validation(Validation::new().query("userId", Rule::user_id()))
        .get(FnHandler::new(|ctx| {
            Box::pin(async move {
                let uid = ctx.query("userId").cloned().unwrap_or(Value::Null);
                Ok(Response::json(StatusCode::OK, &json!({ "uid": uid })))
            })
        }))
}

struct Harness {
    server: Server,
    store: Arc<FixtureStore>,
    sink: Arc<RecordingSink>,
}

fn harness_with(config: ServerConfig) -> Harness {
    let store = Arc::new(FixtureStore::with_users([
        fixtures::user("u-1", "ada@example.com", "t-1"),
        fixtures::user("u-2", "grace@example.com", "t-2"),
    ]));
    let sink = Arc::new(RecordingSink::new());
    let server = Server::builder(store.clone())
        .config(config)
        .sink(sink.clone())
        .endpoints([who_am_i(), echo(), failing(), slow(), user_info(), rejecting()])
        .build()
        .unwrap();
    Harness { server, store, sink }
}

fn harness() -> Harness {
    harness_with(ServerConfig::default())
}

fn request(method: Method, uri: &str) -> Request<Full<Bytes>> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Full::new(Bytes::new()))
        .unwrap()
}

fn authed(method: Method, uri: &str, token: &str) -> Request<Full<Bytes>> {
    let mut req = request(method, uri);
    req.headers_mut().insert(
        header::AUTHORIZATION,
        format!("Bearer {token}").parse().unwrap(),
    );
    req
}

async fn body_bytes(response: Response) -> Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

async fn body_json(response: Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

#[tokio::test]
async fn test_unknown_route_is_not_implemented() {
    let h = harness();
    let response = h.server.handle(request(Method::GET, "/api/nothing")).await;
    assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "ROUTE_NOT_IMPLEMENTED");
}

#[tokio::test]
async fn test_undeclared_verb_is_not_implemented() {
    let h = harness();
    let response = h.server.handle(request(Method::DELETE, "/api/whoAmI")).await;
    assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);
}

#[tokio::test]
async fn test_options_lists_declared_verbs() {
    let h = harness();
    let response = h.server.handle(request(Method::OPTIONS, "/api/fail")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::ALLOW], "GET, POST");
    assert_eq!(body_bytes(response).await, PREFLIGHT_BODY);
    assert!(h.sink.faults().is_empty());
}

#[tokio::test]
async fn test_every_response_carries_cors_and_trace_id() {
    let h = harness();
    for req in [
        request(Method::GET, "/api/nothing"),
        request(Method::OPTIONS, "/api/whoAmI"),
        request(Method::GET, "/api/whoAmI"),
        request(Method::GET, "/health"),
    ] {
        let response = h.server.handle(req).await;
        let headers = response.headers();
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert!(headers.contains_key(header::ACCESS_CONTROL_ALLOW_METHODS));
        assert!(headers.contains_key(header::ACCESS_CONTROL_ALLOW_HEADERS));
        assert!(!headers["x-trace-id"].is_empty());
    }
}

#[tokio::test]
async fn test_trace_ids_differ_per_request() {
    let h = harness();
    let a = h.server.handle(request(Method::GET, "/health")).await;
    let b = h.server.handle(request(Method::GET, "/health")).await;
    assert_ne!(a.headers()["x-trace-id"], b.headers()["x-trace-id"]);
}

#[tokio::test]
async fn test_authenticated_handler() {
    let h = harness();
    let response = h.server.handle(authed(Method::GET, "/api/whoAmI", "t-1")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["email"], "ada@example.com");
    assert!(body.get("token").is_none());
}

#[tokio::test]
async fn test_missing_token_ends_before_handler() {
    let h = harness();
    let response = h.server.handle(request(Method::GET, "/api/whoAmI")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await, json!({ "message": "Unauthorized." }));

    let response = h.server.handle(authed(Method::GET, "/api/whoAmI", "nope")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await, json!({ "message": "User not found." }));
    assert!(h.sink.faults().is_empty());
}

#[tokio::test]
async fn test_body_validation() {
    let h = harness();
    let ok = Request::builder()
        .method(Method::POST)
        .uri("/api/echo")
        .body(Full::new(Bytes::from_static(br#"{"word":"hello"}"#)))
        .unwrap();
    let response = h.server.handle(ok).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, "hello");

    let bad = Request::builder()
        .method(Method::POST)
        .uri("/api/echo")
        .body(Full::new(Bytes::from_static(br#"{"word":7}"#)))
        .unwrap();
    let response = h.server.handle(bad).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["errors"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_user_id_resolution() {
    let h = harness();
    let response = h
        .server
        .handle(authed(Method::GET, "/api/getUserInfo?userId=u-2", "t-1"))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = h
        .server
        .handle(authed(Method::GET, "/api/getUserInfo?userId=ghost", "t-1"))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await,
        json!({ "errors": [{ "message": "userId 'ghost' is not found from userid." }] })
    );
}

#[tokio::test]
async fn test_handler_error_becomes_500_and_is_reported() {
    let h = harness();
    let response = h.server.handle(request(Method::GET, "/api/fail")).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response.headers().contains_key("x-trace-id"));
    assert_eq!(body_json(response).await, json!({ "error": "disk on fire" }));

    let faults = h.sink.faults();
    assert_eq!(faults.len(), 1);
    assert_eq!(faults[0].kind, FaultKind::Error);
    assert_eq!(faults[0].method, Method::GET);
    assert_eq!(faults[0].path, "/api/fail");
}

#[tokio::test]
async fn test_handler_panic_becomes_500_and_is_reported() {
    let h = harness();
    let response = h.server.handle(request(Method::POST, "/api/fail")).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await, json!({ "error": "handler exploded" }));

    let faults = h.sink.faults();
    assert_eq!(faults.len(), 1);
    assert_eq!(faults[0].kind, FaultKind::Panic);
    assert_eq!(faults[0].message, "handler exploded");

    // The server keeps serving after a panic.
    let response = h.server.handle(request(Method::GET, "/health")).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_client_error_keeps_its_status_in_envelope() {
    let h = harness();
    let response = h.server.handle(request(Method::GET, "/api/reject")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let trace_id = response.headers()["x-trace-id"].to_str().unwrap().to_string();

    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert_eq!(body["error"]["message"], "bad input");
    assert_eq!(body["error"]["category"], "validation");
    assert_eq!(body["request_id"], trace_id.as_str());
    assert!(h.sink.faults().is_empty());
}

#[tokio::test]
async fn test_middleware_panic_becomes_500_and_is_reported() {
    let store = Arc::new(FixtureStore::new());
    let sink = Arc::new(RecordingSink::new());
    let middleware = MiddlewareRegistry::new(store.clone()).with_override(
        MiddlewareName::StoreReady,
        Arc::new(FnMiddleware::new("db:ready", stage_explodes)),
    );
    let server = Server::builder(store)
        .middleware(middleware)
        .sink(sink.clone())
        .endpoint(guarded())
        .build()
        .unwrap();

    let response = server.handle(request(Method::GET, "/api/guarded")).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response.headers().contains_key("x-trace-id"));
    assert_eq!(body_json(response).await, json!({ "error": "stage exploded" }));

    let faults = sink.faults();
    assert_eq!(faults.len(), 1);
    assert_eq!(faults[0].kind, FaultKind::Panic);
    assert_eq!(faults[0].path, "/api/guarded");
}

#[tokio::test]
async fn test_store_failure_during_resolution_is_a_fault() {
    let h = harness();
    h.store.fail_id_lookups(true);
    let response = h
        .server
        .handle(authed(Method::GET, "/api/getUserInfo?userId=u-1", "t-1"))
        .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body, json!({ "message": "Failed to resolve userId." }));

    let faults = h.sink.faults();
    assert_eq!(faults.len(), 1);
    assert_eq!(faults[0].kind, FaultKind::Error);
    assert!(faults[0].message.contains("store unavailable"));
}

#[test]
fn test_builtin_path_cannot_be_declared() {
    let store = Arc::new(FixtureStore::new());
    let err = Server::builder(store)
        .endpoint(EndpointDeclaration::new("/opendocs").get(FnHandler::new(|_ctx| {
            Box::pin(async move { Ok(Response::text(StatusCode::OK, "")) })
        })))
        .build()
        .unwrap_err();
    assert!(matches!(err, ServerError::ReservedPath { ref path } if path == "/opendocs"));
}

#[tokio::test(start_paused = true)]
async fn test_request_timeout() {
    let config = ServerConfig::builder()
        .request_timeout(Duration::from_millis(50))
        .build();
    let h = harness_with(config);
    let response = h.server.handle(request(Method::GET, "/api/slow")).await;
    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    assert!(response.headers().contains_key("x-trace-id"));
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "REQUEST_TIMEOUT");
    assert_eq!(body["error"]["category"], "timeout");
    assert!(body["request_id"].is_string());
}

#[tokio::test]
async fn test_health_and_readiness() {
    let h = harness();
    let response = h.server.handle(request(Method::GET, "/health")).await;
    assert_eq!(body_json(response).await, json!({ "status": "ok" }));

    let response = h.server.handle(request(Method::GET, "/ready")).await;
    assert_eq!(response.status(), StatusCode::OK);

    h.store.set_state(StoreState::Connecting);
    let response = h.server.handle(request(Method::GET, "/ready")).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_json(response).await["ready"], false);
}

#[tokio::test]
async fn test_opendocs_serves_document() {
    let h = harness();
    let response = h.server.handle(request(Method::GET, "/opendocs")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
    let doc = body_json(response).await;
    assert_eq!(doc["info"]["title"], "Heron API");
    assert!(doc["paths"]["/api/whoAmI"]["get"].is_object());
    assert!(doc["paths"]["/api/whoAmI"].get("options").is_none());
}

#[test]
fn test_duplicate_declaration_fails_build() {
    let store = Arc::new(FixtureStore::new());
    let err = Server::builder(store)
        .endpoint(who_am_i())
        .endpoint(who_am_i())
        .build()
        .unwrap_err();
    assert!(matches!(err, ServerError::Route(_)));
}

#[test]
fn test_unknown_middleware_fails_build() {
    let store = Arc::new(FixtureStore::new());
    let err = Server::builder(store)
        .endpoint(EndpointDeclaration::new("/api/x").middleware("auth:magic").get(
            FnHandler::new(|_ctx| Box::pin(async move { Ok(Response::text(StatusCode::OK, "")) })),
        ))
        .build()
        .unwrap_err();
    assert!(matches!(err, ServerError::UnknownMiddleware { ref name, .. } if name == "auth:magic"));
}

#[tokio::test]
async fn test_serves_over_tcp_and_shuts_down() {
    let h = harness();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = ShutdownSignal::new();
    let running = tokio::spawn(h.server.serve(listener, shutdown.clone()));

    let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"GET /health HTTP/1.1\r\nhost: localhost\r\nconnection: close\r\n\r\n")
        .await
        .unwrap();
    let mut raw = String::new();
    stream.read_to_string(&mut raw).await.unwrap();
    assert!(raw.starts_with("HTTP/1.1 200 OK"));
    assert!(raw.contains("x-trace-id"));
    assert!(raw.ends_with(r#"{"status":"ok"}"#));

    shutdown.trigger();
    running.await.unwrap().unwrap();
}
