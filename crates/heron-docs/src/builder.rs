//! Building the API document from endpoint descriptors.
//!
//! ```rust
//! use heron_core::{DocMeta, EndpointDescriptor, MiddlewareName, ResponseDoc, Validation};
//! use heron_docs::ApiDocumentBuilder;
//! use http::{Method, StatusCode};
//!
//! let mut builder = ApiDocumentBuilder::init("Users", "User service", Vec::new(), [Method::OPTIONS]);
//! builder.add_endpoint(&EndpointDescriptor {
//!     path: "/api/whoAmI".into(),
//!     method: Method::GET,
//!     middleware: vec![MiddlewareName::ValidToken],
//!     validation: Validation::new(),
//!     doc: DocMeta::new("Current user").response(StatusCode::OK, ResponseDoc::text()),
//! });
//!
//! let doc = builder.build();
//! let op = doc.operation("/api/whoAmI", &Method::GET).unwrap();
//! assert_eq!(op.operation_id, "get__api_whoAmI");
//! assert_eq!(op.security[0]["bearerAuth"], Vec::<String>::new());
//! ```

use std::sync::OnceLock;

use heron_core::{EndpointDescriptor, MiddlewareName, Rule, Schema as RuleSchema};
use http::Method;
use indexmap::IndexMap;
use regex::Regex;

use crate::openapi::{
    ApiDocument, Components, Info, MediaType, Operation, Parameter, ParameterIn, RequestBody,
    Response, Schema, SchemaType, SecurityScheme, Server,
};

/// Name of the bearer security scheme.
pub const BEARER_AUTH: &str = "bearerAuth";

const BEARER_DESCRIPTION: &str = "Use Bearer Token for authorization. Format: 'Bearer <token>'";

/// Accumulates operations into an [`ApiDocument`].
#[derive(Debug, Clone)]
pub struct ApiDocumentBuilder {
    document: ApiDocument,
    excluded: Vec<Method>,
}

impl ApiDocumentBuilder {
    /// Starts an empty document.
    ///
    /// Endpoints whose method is in `excluded_methods` are never added.
    #[must_use]
    pub fn init(
        title: impl Into<String>,
        description: impl Into<String>,
        servers: Vec<Server>,
        excluded_methods: impl IntoIterator<Item = Method>,
    ) -> Self {
        let mut components = Components::default();
        components.security_schemes.insert(
            BEARER_AUTH.to_string(),
            SecurityScheme {
                scheme_type: "http".to_string(),
                scheme: "bearer".to_string(),
                description: BEARER_DESCRIPTION.to_string(),
            },
        );

        Self {
            document: ApiDocument {
                openapi: "3.1.0".to_string(),
                info: Info {
                    title: title.into(),
                    description: description.into(),
                    version: "1.0.0".to_string(),
                },
                servers,
                paths: IndexMap::new(),
                components,
            },
            excluded: excluded_methods.into_iter().collect(),
        }
    }

    /// Documents one endpoint.
    ///
    /// Returns the operation previously documented for the same
    /// (path, method), which the new one replaces. Other methods on the
    /// path are kept. Excluded methods are skipped and return `None`.
    pub fn add_endpoint(&mut self, descriptor: &EndpointDescriptor) -> Option<Operation> {
        if self.excluded.contains(&descriptor.method) {
            return None;
        }

        let operation = operation_for(descriptor);
        let Some(slot) = self
            .document
            .paths
            .entry(descriptor.path.clone())
            .or_default()
            .slot_mut(&descriptor.method)
        else {
            tracing::warn!(
                method = %descriptor.method,
                path = %descriptor.path,
                "method has no OpenAPI operation slot"
            );
            return None;
        };

        let previous = slot.replace(operation);
        if previous.is_some() {
            tracing::debug!(
                method = %descriptor.method,
                path = %descriptor.path,
                "replaced documented operation"
            );
        }
        previous
    }

    /// The document built so far.
    #[must_use]
    pub fn document(&self) -> &ApiDocument {
        &self.document
    }

    /// Finishes the document.
    #[must_use]
    pub fn build(self) -> ApiDocument {
        self.document
    }
}

/// `<method>_<path with non-alphanumerics replaced by _>`.
#[must_use]
pub fn operation_id(method: &Method, path: &str) -> String {
    let path: String = path
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    format!("{}_{path}", method.as_str().to_ascii_lowercase())
}

fn operation_for(descriptor: &EndpointDescriptor) -> Operation {
    let mut parameters: Vec<Parameter> = path_parameters(&descriptor.path)
        .into_iter()
        .map(|name| Parameter {
            name,
            location: ParameterIn::Path,
            required: true,
            schema: Schema::string(),
        })
        .collect();

    parameters.extend(descriptor.validation.query.iter().map(|(name, rule)| {
        let (required, schema) = match rule {
            Rule::Schema(field) => (!field.optional, shallow(&field.schema)),
            Rule::Reference(_) => (true, Schema::string()),
        };
        Parameter {
            name: name.clone(),
            location: ParameterIn::Query,
            required,
            schema,
        }
    }));

    let request_body = descriptor.validation.body.as_ref().map(|schema| RequestBody {
        required: true,
        content: IndexMap::from([(
            "application/json".to_string(),
            MediaType {
                schema: shallow(schema),
            },
        )]),
    });

    let responses = descriptor
        .doc
        .responses
        .iter()
        .map(|(status, doc)| {
            let schema = doc.schema.as_ref().map_or_else(Schema::string, shallow);
            (
                status.to_string(),
                Response {
                    description: format!("Response for status code {status}"),
                    content: IndexMap::from([(doc.media_type.clone(), MediaType { schema })]),
                },
            )
        })
        .collect();

    let security = if descriptor.uses(MiddlewareName::ValidToken) {
        vec![IndexMap::from([(BEARER_AUTH.to_string(), Vec::new())])]
    } else {
        Vec::new()
    };

    Operation {
        operation_id: operation_id(&descriptor.method, &descriptor.path),
        description: descriptor.doc.description.clone(),
        tags: descriptor.doc.tags.clone(),
        parameters,
        request_body,
        responses,
        security,
    }
}

/// Top-level shape only: object properties keep their scalar types, and
/// nested arrays and objects collapse to bare placeholders.
fn shallow(schema: &RuleSchema) -> Schema {
    match schema {
        RuleSchema::Object(object) => {
            let mut out = Schema::of(SchemaType::Object);
            out.properties = object
                .fields
                .iter()
                .map(|(name, field)| (name.clone(), placeholder(&field.schema)))
                .collect();
            out
        }
        other => placeholder(other),
    }
}

fn placeholder(schema: &RuleSchema) -> Schema {
    match schema {
        RuleSchema::String(_) => Schema::of(SchemaType::String),
        RuleSchema::Integer { .. } => Schema::of(SchemaType::Integer),
        RuleSchema::Number => Schema::of(SchemaType::Number),
        RuleSchema::Boolean => Schema::of(SchemaType::Boolean),
        RuleSchema::Array(_) => Schema::of(SchemaType::Array),
        RuleSchema::Object(_) => Schema::of(SchemaType::Object),
        RuleSchema::Any => Schema::default(),
    }
}

fn path_parameters(path: &str) -> Vec<String> {
    static PATTERN: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();
    match PATTERN.get_or_init(|| Regex::new(r"\{([^}]+)\}")) {
        Ok(re) => re
            .captures_iter(path)
            .filter_map(|cap| cap.get(1))
            .map(|m| m.as_str().to_string())
            .collect(),
        Err(e) => {
            tracing::warn!(error = %e, "path parameter pattern failed to compile");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use heron_core::{DocMeta, ObjectSchema, ResponseDoc, StringRule, Validation};
    use http::StatusCode;
    use serde_json::json;

    fn builder() -> ApiDocumentBuilder {
        ApiDocumentBuilder::init(
            "Heron",
            "Test API",
            vec![Server::new("http://localhost:8080")],
            [Method::OPTIONS],
        )
    }

    fn descriptor(path: &str, method: Method) -> EndpointDescriptor {
        EndpointDescriptor {
            path: path.to_string(),
            method,
            middleware: Vec::new(),
            validation: Validation::new(),
            doc: DocMeta::new("An endpoint"),
        }
    }

    #[test]
    fn test_fresh_document() {
        let doc = builder().build();
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["openapi"], "3.1.0");
        assert_eq!(json["info"]["version"], "1.0.0");
        assert_eq!(json["servers"][0]["url"], "http://localhost:8080");
        assert_eq!(
            json["components"]["securitySchemes"]["bearerAuth"],
            json!({
                "type": "http",
                "scheme": "bearer",
                "description": "Use Bearer Token for authorization. Format: 'Bearer <token>'"
            })
        );
    }

    #[test]
    fn test_operation_id() {
        assert_eq!(operation_id(&Method::POST, "/api/register"), "post__api_register");
        assert_eq!(
            operation_id(&Method::GET, "/api/users/{id}"),
            "get__api_users__id_"
        );
    }

    #[test]
    fn test_excluded_methods_are_skipped() {
        let mut builder = builder();
        assert!(builder
            .add_endpoint(&descriptor("/api/whoAmI", Method::OPTIONS))
            .is_none());
        assert!(builder.document().paths.is_empty());
    }

    #[test]
    fn test_same_key_replaces_other_methods_merge() {
        let mut builder = builder();
        assert!(builder
            .add_endpoint(&descriptor("/api/things", Method::GET))
            .is_none());
        assert!(builder
            .add_endpoint(&descriptor("/api/things", Method::POST))
            .is_none());

        let mut again = descriptor("/api/things", Method::GET);
        again.doc.description = "Second".to_string();
        let previous = builder.add_endpoint(&again).unwrap();
        assert_eq!(previous.description, "An endpoint");

        let doc = builder.build();
        assert_eq!(doc.paths.len(), 1);
        assert_eq!(doc.operation_count(), 2);
        assert_eq!(
            doc.operation("/api/things", &Method::GET).unwrap().description,
            "Second"
        );
    }

    #[test]
    fn test_parameters_body_and_responses() {
        let mut d = descriptor("/api/users/{id}", Method::POST);
        d.middleware = vec![MiddlewareName::ValidToken];
        d.validation = Validation::new()
            .query("userId", Rule::user_id())
            .query("limit", Rule::optional(RuleSchema::integer()))
            .body(
                ObjectSchema::new()
                    .field("name", StringRule::new().min_len(1))
                    .field("tags", RuleSchema::array(RuleSchema::string()))
                    .optional(
                        "meta",
                        ObjectSchema::new().field("deep", RuleSchema::Boolean),
                    ),
            );
        d.doc = DocMeta::new("Update")
            .tag("Users")
            .response(
                StatusCode::OK,
                ResponseDoc::json(ObjectSchema::new().field("token", RuleSchema::string())),
            )
            .response(StatusCode::BAD_REQUEST, ResponseDoc::text());

        let mut builder = builder();
        builder.add_endpoint(&d);
        let json = serde_json::to_value(builder.build()).unwrap();
        let op = &json["paths"]["/api/users/{id}"]["post"];

        assert_eq!(op["operationId"], "post__api_users__id_");
        assert_eq!(op["tags"], json!(["Users"]));
        assert_eq!(
            op["parameters"],
            json!([
                { "name": "id", "in": "path", "required": true, "schema": { "type": "string" } },
                { "name": "userId", "in": "query", "required": true, "schema": { "type": "string" } },
                { "name": "limit", "in": "query", "required": false, "schema": { "type": "integer" } }
            ])
        );
        assert_eq!(
            op["requestBody"],
            json!({
                "required": true,
                "content": { "application/json": { "schema": {
                    "type": "object",
                    "properties": {
                        "name": { "type": "string" },
                        "tags": { "type": "array" },
                        "meta": { "type": "object" }
                    }
                } } }
            })
        );
        assert_eq!(
            op["responses"]["200"],
            json!({
                "description": "Response for status code 200",
                "content": { "application/json": { "schema": {
                    "type": "object",
                    "properties": { "token": { "type": "string" } }
                } } }
            })
        );
        assert_eq!(
            op["responses"]["400"]["content"]["text/plain"]["schema"],
            json!({ "type": "string" })
        );
        assert_eq!(op["security"], json!([{ "bearerAuth": [] }]));
    }

    #[test]
    fn test_no_security_without_auth() {
        let mut builder = builder();
        builder.add_endpoint(&descriptor("/api/register", Method::POST));
        let doc = builder.build();
        assert!(doc
            .operation("/api/register", &Method::POST)
            .unwrap()
            .security
            .is_empty());
    }
}
