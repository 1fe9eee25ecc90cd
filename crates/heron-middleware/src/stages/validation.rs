//! Request validation.
//!
//! Validation is split in two. This module holds the pure half: it checks
//! every declared query field and the body without any I/O, and queues
//! reference fields for the resolution stage that always runs next.
//!
//! Errors are collected, never short-circuited: every declared field is
//! evaluated even after an earlier one failed.

use heron_core::{ReferenceKind, Rule, Validation};
use http::Method;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::context::MiddlewareContext;
use crate::middleware::{BoxFuture, Middleware, MiddlewareOutcome};
use crate::types::Request;

/// Name of the validation stage; the validated query and body are stored
/// under it.
pub const VALIDATION_STAGE: &str = "dataValidation";

/// One validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// Query parameter name, or `body`.
    #[serde(skip)]
    pub field: String,
    /// Client-facing description.
    pub message: String,
}

impl FieldError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// A reference field waiting for its external lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingReference {
    /// Query parameter name.
    pub field: String,
    /// Resolver to use.
    pub kind: ReferenceKind,
    /// The raw id.
    pub id: String,
}

/// Result of the pure validation pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CheckedRequest {
    /// Query values that passed their schema. Reference fields hold the
    /// raw id until resolved.
    pub query: Map<String, Value>,
    /// The parsed body, if one is declared and parses.
    pub body: Option<Value>,
    /// Reference fields to resolve.
    pub pending: Vec<PendingReference>,
    /// Every failure found so far.
    pub errors: Vec<FieldError>,
}

impl CheckedRequest {
    /// The patch stored for handlers: `{"query": {...}, "body": ...}`.
    #[must_use]
    pub fn to_patch(&self) -> Value {
        serde_json::json!({
            "query": self.query,
            "body": self.body.clone().unwrap_or(Value::Null),
        })
    }
}

/// Errors and queued references handed from the validation stage to the
/// resolution stage.
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    /// Failures of the pure pass.
    pub errors: Vec<FieldError>,
    /// References still to resolve.
    pub pending: Vec<PendingReference>,
}

/// Checks a request against `validation` without any I/O.
///
/// `raw_query` is the undecoded query string; `body` the collected bytes.
#[must_use]
pub fn check(
    validation: &Validation,
    method: &Method,
    raw_query: Option<&str>,
    body: &[u8],
) -> CheckedRequest {
    let mut checked = CheckedRequest::default();
    let params = parse_query(raw_query.unwrap_or_default());

    for (name, rule) in &validation.query {
        let raw = params
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str());

        match rule {
            Rule::Schema(field) => match raw {
                None if field.optional => {}
                None => checked.errors.push(FieldError::new(
                    name,
                    format!("Invalid query parameter for '{name}', Required"),
                )),
                Some(raw) => match field.schema.check_raw(raw) {
                    Ok(value) => {
                        checked.query.insert(name.clone(), value);
                    }
                    Err(messages) => checked.errors.extend(messages.into_iter().map(|m| {
                        FieldError::new(name, format!("Invalid query parameter for '{name}', {m}"))
                    })),
                },
            },
            Rule::Reference(kind) => match raw {
                Some(id) if !id.is_empty() => {
                    checked.query.insert(name.clone(), Value::String(id.to_string()));
                    checked.pending.push(PendingReference {
                        field: name.clone(),
                        kind: *kind,
                        id: id.to_string(),
                    });
                }
                _ => checked
                    .errors
                    .push(FieldError::new(name, format!("{name} is required"))),
            },
        }
    }

    if let Some(schema) = &validation.body {
        match serde_json::from_slice::<Value>(body) {
            Ok(value) => {
                checked.errors.extend(schema.check(&value).into_iter().map(|v| {
                    let message = if v.path.is_empty() {
                        format!("Invalid body, {}", v.message)
                    } else {
                        format!("Invalid body, {}: {}", v.path, v.message)
                    };
                    FieldError::new("body", message)
                }));
                checked.body = Some(value);
            }
            Err(_) => {
                let mut message = "Invalid body, expected JSON.".to_string();
                if carries_no_body(method) {
                    message.push_str(&format!(" {method} requests usually carry no body."));
                }
                checked.errors.push(FieldError::new("body", message));
            }
        }
    }

    checked
}

fn carries_no_body(method: &Method) -> bool {
    matches!(
        *method,
        Method::GET | Method::DELETE | Method::OPTIONS | Method::HEAD
    )
}

/// Decodes a query string. The first occurrence of a repeated key wins.
fn parse_query(raw: &str) -> Vec<(String, String)> {
    match serde_urlencoded::from_str::<Vec<(String, String)>>(raw) {
        Ok(pairs) => pairs,
        Err(e) => {
            tracing::debug!(error = %e, query = raw, "undecodable query string");
            Vec::new()
        }
    }
}

/// The implicit pure-validation stage.
///
/// Always continues: its failures travel in a [`ValidationReport`] so the
/// resolution stage can append reference errors before answering.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidationStage;

impl Middleware for ValidationStage {
    fn name(&self) -> &'static str {
        VALIDATION_STAGE
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: &'a Request,
    ) -> BoxFuture<'a, MiddlewareOutcome> {
        Box::pin(async move {
            let checked = check(
                &ctx.descriptor().validation,
                request.method(),
                request.uri().query(),
                request.body(),
            );
            let patch = checked.to_patch();
            ctx.set_extension(ValidationReport {
                errors: checked.errors,
                pending: checked.pending,
            });
            MiddlewareOutcome::Continue(Some(patch))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use heron_core::{ObjectSchema, Schema, StringRule};
    use serde_json::json;

    fn register() -> Validation {
        Validation::new().body(
            ObjectSchema::new()
                .field(
                    "registerType",
                    StringRule::new()
                        .one_of(["apple", "google"])
                        .message(r#"Invalid registerType, must be "apple" or "google""#),
                )
                .field("accessToken", Schema::string()),
        )
    }

    fn messages(checked: &CheckedRequest) -> Vec<&str> {
        checked.errors.iter().map(|e| e.message.as_str()).collect()
    }

    #[test]
    fn test_valid_body() {
        let body = br#"{"registerType":"google","accessToken":"abc"}"#;
        let checked = check(&register(), &Method::POST, None, body);
        assert!(checked.errors.is_empty());
        assert_eq!(checked.body.unwrap()["accessToken"], "abc");
    }

    #[test]
    fn test_body_violations_use_custom_message() {
        let body = br#"{"registerType":"facebook","accessToken":5}"#;
        let checked = check(&register(), &Method::POST, None, body);
        assert_eq!(
            messages(&checked),
            [
                r#"Invalid body, registerType: Invalid registerType, must be "apple" or "google""#,
                "Invalid body, accessToken: Expected string, received number",
            ]
        );
    }

    #[test]
    fn test_unparseable_body() {
        let checked = check(&register(), &Method::POST, None, b"not json");
        assert_eq!(messages(&checked), ["Invalid body, expected JSON."]);

        let checked = check(&register(), &Method::GET, None, b"");
        assert_eq!(
            messages(&checked),
            ["Invalid body, expected JSON. GET requests usually carry no body."]
        );
    }

    #[test]
    fn test_root_type_mismatch() {
        let checked = check(&register(), &Method::POST, None, b"[1]");
        assert_eq!(messages(&checked), ["Invalid body, Expected object, received array"]);
    }

    #[test]
    fn test_body_ignored_when_not_declared() {
        let checked = check(&Validation::new(), &Method::POST, None, b"garbage");
        assert!(checked.errors.is_empty());
        assert!(checked.body.is_none());
    }

    #[test]
    fn test_query_fields_all_evaluated() {
        let validation = Validation::new()
            .query("limit", Rule::required(Schema::integer_between(1, 50)))
            .query("cursor", Rule::optional(Schema::string()))
            .query("verbose", Rule::required(Schema::Boolean))
            .query("userId", Rule::user_id());

        let checked = check(&validation, &Method::GET, Some("limit=99&verbose=maybe"), b"");
        assert_eq!(
            messages(&checked),
            [
                "Invalid query parameter for 'limit', Number must be less than or equal to 50",
                "Invalid query parameter for 'verbose', Expected boolean, received 'maybe'",
                "userId is required",
            ]
        );
        assert!(checked.pending.is_empty());
    }

    #[test]
    fn test_missing_required_query_field() {
        let validation = Validation::new().query("limit", Rule::required(Schema::integer()));
        let checked = check(&validation, &Method::GET, None, b"");
        assert_eq!(
            messages(&checked),
            ["Invalid query parameter for 'limit', Required"]
        );
    }

    #[test]
    fn test_query_values_are_typed_and_decoded() {
        let validation = Validation::new()
            .query("limit", Rule::required(Schema::integer()))
            .query("q", Rule::required(Schema::string()));
        let checked = check(&validation, &Method::GET, Some("q=grace%20hopper&limit=3"), b"");
        assert!(checked.errors.is_empty());
        assert_eq!(checked.query["limit"], json!(3));
        assert_eq!(checked.query["q"], json!("grace hopper"));
    }

    #[test]
    fn test_reference_fields_are_queued() {
        let validation = Validation::new().query("userId", Rule::user_id());
        let checked = check(&validation, &Method::GET, Some("userId=u-42"), b"");
        assert!(checked.errors.is_empty());
        assert_eq!(
            checked.pending,
            [PendingReference {
                field: "userId".to_string(),
                kind: ReferenceKind::UserId,
                id: "u-42".to_string(),
            }]
        );

        let checked = check(&validation, &Method::GET, Some("userId="), b"");
        assert_eq!(messages(&checked), ["userId is required"]);
    }

    #[test]
    fn test_patch_shape() {
        let validation = Validation::new().query("limit", Rule::required(Schema::integer()));
        let checked = check(&validation, &Method::GET, Some("limit=1"), b"");
        assert_eq!(checked.to_patch(), json!({ "query": { "limit": 1 }, "body": null }));
    }
}
