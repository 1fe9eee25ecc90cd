//! End-to-end scenarios for the user service.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use bytes::Bytes;
use heron::core::{DataStore, HeronError, IdentityProfile, IdentityProvider, UserKey};
use heron::middleware::Response;
use heron::server::{Server, ServerConfig};
use heron_users::{build_server, AppleIdentity, MemoryStore, UserService};
use http::{header, Method, Request, StatusCode};
use http_body_util::{BodyExt, Full};
use serde_json::{json, Value};

/// Accepts `good-<name>` tokens for `<name>@gmail.com`.
struct FakeGoogle;

#[async_trait]
impl IdentityProvider for FakeGoogle {
    async fn resolve(&self, access_token: &str) -> Result<IdentityProfile, HeronError> {
        let name = access_token
            .strip_prefix("good-")
            .ok_or_else(|| HeronError::external("Failed to get user data from Google", Some("google")))?;
        Ok(IdentityProfile {
            email: format!("{name}@gmail.com"),
            name: name.to_string(),
            picture: Some(format!("https://example.com/{name}.png")),
        })
    }
}

struct App {
    server: Server,
    store: Arc<MemoryStore>,
}

fn app_with(config: ServerConfig) -> App {
    let store = Arc::new(MemoryStore::new());
    store.connect();
    let service = Arc::new(UserService::new(
        store.clone(),
        Arc::new(FakeGoogle),
        Arc::new(AppleIdentity::new()),
    ));
    let server = build_server(config, store.clone(), service).unwrap();
    App { server, store }
}

fn app() -> App {
    app_with(ServerConfig::default())
}

fn get(uri: &str, token: Option<&str>) -> Request<Full<Bytes>> {
    let mut builder = Request::builder().method(Method::GET).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Full::new(Bytes::new())).unwrap()
}

fn post_json(uri: &str, body: &Value) -> Request<Full<Bytes>> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap()
}

async fn json_body(response: Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn register(app: &App, register_type: &str, token: &str) -> (StatusCode, Value) {
    let response = app
        .server
        .handle(post_json(
            "/api/register",
            &json!({ "registerType": register_type, "accessToken": token }),
        ))
        .await;
    (response.status(), json_body(response).await)
}

fn apple_token(payload: &Value) -> String {
    format!(
        "{}.{}.signature",
        URL_SAFE_NO_PAD.encode(br#"{"alg":"ES256"}"#),
        URL_SAFE_NO_PAD.encode(payload.to_string())
    )
}

#[tokio::test]
async fn test_register_google_new_then_existing() {
    let app = app();

    let (status, first) = register(&app, "google", "good-ada").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["type"], "new");
    let token = first["token"].as_str().unwrap().to_string();
    assert!(!token.is_empty());

    let (status, second) = register(&app, "google", "good-ada").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second, json!({ "token": token, "type": "existing" }));
    assert_eq!(app.store.len(), 1);
}

#[tokio::test]
async fn test_register_rejects_unknown_type() {
    let app = app();
    let (status, body) = register(&app, "facebook", "good-ada").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let messages: Vec<&str> = body["errors"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|e| e["message"].as_str())
        .collect();
    assert!(messages
        .iter()
        .any(|m| m.contains(r#"Invalid registerType, must be "apple" or "google""#)));
    assert!(app.store.is_empty());
}

#[tokio::test]
async fn test_register_google_failure_is_bad_gateway() {
    let app = app();
    let (status, body) = register(&app, "google", "expired").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body, json!({ "message": "Failed to get user data from Google" }));
}

#[tokio::test]
async fn test_register_apple() {
    let app = app();
    let token = apple_token(&json!({ "email": "tim@icloud.com" }));
    let (status, body) = register(&app, "apple", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["type"], "new");

    let user = app
        .store
        .find_user(UserKey::Email("tim@icloud.com"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(user.name, "tim");
    assert_eq!(user.picture, None);
}

#[tokio::test]
async fn test_register_apple_errors() {
    let app = app();
    let (status, body) = register(&app, "apple", &apple_token(&json!({ "sub": "1" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "message": "Failed to get email from Apple." }));

    let (status, body) =
        register(&app, "apple", &apple_token(&json!({ "email": "@icloud.com" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "message": "Invalid email from Apple." }));
}

#[tokio::test]
async fn test_who_am_i() {
    let app = app();
    let (_, registered) = register(&app, "google", "good-grace").await;
    let token = registered["token"].as_str().unwrap();

    let response = app.server.handle(get("/api/whoAmI", Some(token))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let profile = json_body(response).await;
    assert_eq!(profile["email"], "grace@gmail.com");
    assert_eq!(profile["username"], "grace");
    assert_eq!(profile["registerType"], "google");
    assert!(profile.get("token").is_none());
}

#[tokio::test]
async fn test_who_am_i_without_token() {
    let app = app();
    let response = app.server.handle(get("/api/whoAmI", None)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await, json!({ "message": "Unauthorized." }));
}

#[tokio::test]
async fn test_get_user_info() {
    let app = app();
    let (_, ada) = register(&app, "google", "good-ada").await;
    register(&app, "google", "good-grace").await;
    let grace = app
        .store
        .find_user(UserKey::Email("grace@gmail.com"))
        .await
        .unwrap()
        .unwrap();

    let uri = format!("/api/getUserInfo?userId={}", grace.uid);
    let response = app
        .server
        .handle(get(&uri, ada["token"].as_str()))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let profile = json_body(response).await;
    assert_eq!(profile["email"], "grace@gmail.com");
    assert!(profile.get("token").is_none());
    assert!(profile.get("uid").is_none());
}

#[tokio::test]
async fn test_get_user_info_unknown_id() {
    let app = app();
    let (_, ada) = register(&app, "google", "good-ada").await;
    let response = app
        .server
        .handle(get("/api/getUserInfo?userId=ghost", ada["token"].as_str()))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(response).await,
        json!({ "errors": [{ "message": "userId 'ghost' is not found from userid." }] })
    );
}

#[tokio::test]
async fn test_store_not_connected() {
    let store = Arc::new(MemoryStore::new());
    let service = Arc::new(UserService::new(
        store.clone(),
        Arc::new(FakeGoogle),
        Arc::new(AppleIdentity::new()),
    ));
    let server = build_server(ServerConfig::default(), store, service).unwrap();

    let response = server
        .handle(post_json(
            "/api/register",
            &json!({ "registerType": "google", "accessToken": "good-ada" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        json_body(response).await,
        json!({ "message": "Database connection not started" })
    );

    let response = server.handle(get("/ready", None)).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_options_and_unknown_routes() {
    let app = app();
    let response = app
        .server
        .handle(
            Request::builder()
                .method(Method::OPTIONS)
                .uri("/api/register")
                .body(Full::new(Bytes::new()))
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::ALLOW], "POST");

    let response = app.server.handle(get("/api/register", None)).await;
    assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);
    assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    assert!(response.headers().contains_key("x-trace-id"));
}

#[tokio::test]
async fn test_document_lists_user_endpoints() {
    let app = app();
    let response = app.server.handle(get("/opendocs", None)).await;
    let doc = json_body(response).await;
    let register = &doc["paths"]["/api/register"]["post"];
    assert_eq!(register["description"], "Register the user");
    assert_eq!(register["tags"], json!(["User"]));
    assert!(register["responses"]["502"].is_object());
    assert!(doc["paths"]["/api/getUserInfo"]["get"].is_object());
}

#[tokio::test(start_paused = true)]
async fn test_slow_identity_provider_times_out() {
    struct Stalled;

    #[async_trait]
    impl IdentityProvider for Stalled {
        async fn resolve(&self, _token: &str) -> Result<IdentityProfile, HeronError> {
            tokio::time::sleep(Duration::from_secs(120)).await;
            Err(HeronError::external("unreachable", Some("google")))
        }
    }

    let store = Arc::new(MemoryStore::new());
    store.connect();
    let service = Arc::new(UserService::new(
        store.clone(),
        Arc::new(Stalled),
        Arc::new(AppleIdentity::new()),
    ));
    let config = ServerConfig::builder()
        .request_timeout(Duration::from_secs(1))
        .build();
    let server = build_server(config, store, service).unwrap();

    let response = server
        .handle(post_json(
            "/api/register",
            &json!({ "registerType": "google", "accessToken": "x" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
}
