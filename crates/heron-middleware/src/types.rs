//! Request and response types used throughout the pipeline.

use bytes::Bytes;
use http::{header, HeaderValue, StatusCode};
use http_body_util::Full;
use serde_json::Value;

/// An HTTP request whose body has already been collected.
pub type Request = http::Request<Bytes>;

/// The HTTP response type produced by stages and handlers.
pub type Response = http::Response<Full<Bytes>>;

/// Constructors for common response shapes.
pub trait ResponseExt {
    /// A JSON response.
    fn json(status: StatusCode, body: &Value) -> Response;

    /// A plain-text response.
    fn text(status: StatusCode, body: &str) -> Response;

    /// A JSON error in the `{"error":{"code","message"}}` shape.
    fn json_error(status: StatusCode, code: &str, message: &str) -> Response;
}

impl ResponseExt for Response {
    fn json(status: StatusCode, body: &Value) -> Response {
        with_body(
            status,
            "application/json",
            Bytes::from(body.to_string()),
        )
    }

    fn text(status: StatusCode, body: &str) -> Response {
        with_body(
            status,
            "text/plain; charset=utf-8",
            Bytes::from(body.to_string()),
        )
    }

    fn json_error(status: StatusCode, code: &str, message: &str) -> Response {
        let body = serde_json::json!({
            "error": {
                "code": code,
                "message": message
            }
        });
        Self::json(status, &body)
    }
}

fn with_body(status: StatusCode, content_type: &'static str, body: Bytes) -> Response {
    let mut response = http::Response::new(Full::new(body));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}
