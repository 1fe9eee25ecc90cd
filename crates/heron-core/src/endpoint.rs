//! Endpoint descriptors.
//!
//! An [`EndpointDescriptor`] is the immutable record of one
//! (path, method) route: which middleware runs, how the query and body are
//! validated, and how the route is documented.

use std::fmt;
use std::str::FromStr;

use http::{Method, StatusCode};
use indexmap::IndexMap;
use thiserror::Error;

use crate::schema::{Field, Schema};

/// The closed set of middleware an endpoint may list.
///
/// Declarations refer to middleware by name; the name is parsed once when
/// the route table is built, so a typo is a startup error instead of a
/// silently skipped step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MiddlewareName {
    /// `auth:validToken`: bearer-token authentication.
    ValidToken,
    /// `db:ready`: rejects requests while the data store is unavailable.
    StoreReady,
}

impl MiddlewareName {
    /// Every known middleware.
    pub const ALL: [Self; 2] = [Self::ValidToken, Self::StoreReady];

    /// The name used in declarations and as the context patch key.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ValidToken => "auth:validToken",
            Self::StoreReady => "db:ready",
        }
    }
}

impl fmt::Display for MiddlewareName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A middleware name that matches nothing in [`MiddlewareName`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown middleware '{0}'")]
pub struct UnknownMiddleware(pub String);

impl FromStr for MiddlewareName {
    type Err = UnknownMiddleware;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| UnknownMiddleware(s.to_string()))
    }
}

/// External lookups a query field can be resolved through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceKind {
    /// Resolves a user id to the stored user.
    UserId,
}

impl ReferenceKind {
    /// The resolver's name, as it appears in error messages.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::UserId => "userid",
        }
    }
}

/// How one query field is validated.
#[derive(Debug, Clone, PartialEq)]
pub enum Rule {
    /// Checked purely from the raw value.
    Schema(Field),
    /// Looked up externally; the resolved entity replaces the raw value.
    Reference(ReferenceKind),
}

impl Rule {
    /// A required field checked against `schema`.
    #[must_use]
    pub fn required(schema: impl Into<Schema>) -> Self {
        Self::Schema(Field::required(schema))
    }

    /// An optional field checked against `schema` when present.
    #[must_use]
    pub fn optional(schema: impl Into<Schema>) -> Self {
        Self::Schema(Field::optional(schema))
    }

    /// A field holding a user id, resolved to the user.
    #[must_use]
    pub const fn user_id() -> Self {
        Self::Reference(ReferenceKind::UserId)
    }
}

/// Validation declared for an endpoint.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Validation {
    /// Query rules by parameter name, in declaration order.
    pub query: IndexMap<String, Rule>,
    /// Schema of the JSON body, if the endpoint takes one.
    pub body: Option<Schema>,
}

impl Validation {
    /// No query fields, no body.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a query parameter.
    #[must_use]
    pub fn query(mut self, name: impl Into<String>, rule: Rule) -> Self {
        self.query.insert(name.into(), rule);
        self
    }

    /// Declares the body schema.
    #[must_use]
    pub fn body(mut self, schema: impl Into<Schema>) -> Self {
        self.body = Some(schema.into());
        self
    }
}

/// One documented response.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseDoc {
    /// Media type of the body.
    pub media_type: String,
    /// Body shape; `None` documents a plain string.
    pub schema: Option<Schema>,
}

impl ResponseDoc {
    /// A JSON response with the given schema.
    #[must_use]
    pub fn json(schema: impl Into<Schema>) -> Self {
        Self {
            media_type: "application/json".to_string(),
            schema: Some(schema.into()),
        }
    }

    /// A plain-text response.
    #[must_use]
    pub fn text() -> Self {
        Self {
            media_type: "text/plain".to_string(),
            schema: None,
        }
    }
}

/// Documentation metadata for an endpoint.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocMeta {
    /// Operation description.
    pub description: String,
    /// Grouping tags.
    pub tags: Vec<String>,
    /// Responses by status code, in declaration order.
    pub responses: IndexMap<u16, ResponseDoc>,
}

impl DocMeta {
    /// Metadata with a description.
    #[must_use]
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..Self::default()
        }
    }

    /// Adds a tag.
    #[must_use]
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Documents a response.
    #[must_use]
    pub fn response(mut self, status: StatusCode, doc: ResponseDoc) -> Self {
        self.responses.insert(status.as_u16(), doc);
        self
    }
}

/// The immutable description of one (path, method) route.
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointDescriptor {
    /// Path pattern, e.g. `/api/users/{id}`.
    pub path: String,
    /// HTTP method.
    pub method: Method,
    /// Middleware to run, in order.
    pub middleware: Vec<MiddlewareName>,
    /// Query and body validation.
    pub validation: Validation,
    /// Documentation metadata.
    pub doc: DocMeta,
}

impl EndpointDescriptor {
    /// Whether the endpoint lists `name`.
    #[must_use]
    pub fn uses(&self, name: MiddlewareName) -> bool {
        self.middleware.contains(&name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_middleware_names_parse() {
        assert_eq!(
            "auth:validToken".parse::<MiddlewareName>(),
            Ok(MiddlewareName::ValidToken)
        );
        assert_eq!("db:ready".parse::<MiddlewareName>(), Ok(MiddlewareName::StoreReady));
    }

    #[test]
    fn test_unknown_middleware_is_an_error() {
        let err = "auth:magic".parse::<MiddlewareName>().unwrap_err();
        assert_eq!(err.to_string(), "unknown middleware 'auth:magic'");
    }

    #[test]
    fn test_names_round_trip() {
        for name in MiddlewareName::ALL {
            assert_eq!(name.to_string().parse::<MiddlewareName>(), Ok(name));
        }
    }

    #[test]
    fn test_validation_keeps_declaration_order() {
        let v = Validation::new()
            .query("b", Rule::optional(Schema::string()))
            .query("a", Rule::user_id());
        let keys: Vec<_> = v.query.keys().map(String::as_str).collect();
        assert_eq!(keys, ["b", "a"]);
    }
}
