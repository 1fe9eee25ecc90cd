//! Endpoint declarations.
//!
//! A declaration names a path, the middleware to run, what to validate,
//! how to document it, and one handler per HTTP verb. Declarations are
//! plain values; [`EndpointRegistry::build`](crate::EndpointRegistry::build)
//! turns a set of them into routes.
//!
//! ```rust
//! use heron_core::{DocMeta, Rule, Validation};
//! use heron_middleware::{Response, ResponseExt};
//! use heron_server::{EndpointDeclaration, FnHandler};
//! use http::StatusCode;
//!
//! let decl = EndpointDeclaration::new("/api/getUserInfo")
//!     .middleware("auth:validToken")
//!     .validation(Validation::new().query("userId", Rule::user_id()))
//!     .doc(DocMeta::new("Get user info").tag("Users"))
//!     .get(FnHandler::new(|_ctx| {
//!         Box::pin(async move { Ok(Response::text(StatusCode::OK, "ok")) })
//!     }));
//!
//! assert_eq!(decl.path(), "/api/getUserInfo");
//! assert_eq!(decl.methods().count(), 1);
//! ```

use std::sync::Arc;

use heron_core::{DocMeta, Validation};
use http::Method;

use crate::handler::{BoxedHandler, Handler};

/// One declared path and its handlers.
#[derive(Clone)]
pub struct EndpointDeclaration {
    path: String,
    middleware: Vec<String>,
    validation: Validation,
    doc: DocMeta,
    handlers: Vec<(Method, BoxedHandler)>,
}

impl std::fmt::Debug for EndpointDeclaration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EndpointDeclaration")
            .field("path", &self.path)
            .field("middleware", &self.middleware)
            .field("methods", &self.methods().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl EndpointDeclaration {
    /// A declaration for `path` with no middleware, validation or handlers.
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            middleware: Vec::new(),
            validation: Validation::default(),
            doc: DocMeta::default(),
            handlers: Vec::new(),
        }
    }

    /// Appends a middleware by name, e.g. `auth:validToken`.
    ///
    /// The name is checked when the registry is built.
    #[must_use]
    pub fn middleware(mut self, name: impl Into<String>) -> Self {
        self.middleware.push(name.into());
        self
    }

    /// Sets the query and body rules.
    #[must_use]
    pub fn validation(mut self, validation: Validation) -> Self {
        self.validation = validation;
        self
    }

    /// Sets the documentation metadata.
    #[must_use]
    pub fn doc(mut self, doc: DocMeta) -> Self {
        self.doc = doc;
        self
    }

    /// Adds a handler for `method`.
    ///
    /// Registering the same method twice is a build error, as is any
    /// method other than GET, POST, PUT, DELETE and PATCH.
    #[must_use]
    pub fn handler(mut self, method: Method, handler: impl Handler) -> Self {
        self.handlers.push((method, Arc::new(handler)));
        self
    }

    /// Adds a GET handler.
    #[must_use]
    pub fn get(self, handler: impl Handler) -> Self {
        self.handler(Method::GET, handler)
    }

    /// Adds a POST handler.
    #[must_use]
    pub fn post(self, handler: impl Handler) -> Self {
        self.handler(Method::POST, handler)
    }

    /// Adds a PUT handler.
    #[must_use]
    pub fn put(self, handler: impl Handler) -> Self {
        self.handler(Method::PUT, handler)
    }

    /// Adds a DELETE handler.
    #[must_use]
    pub fn delete(self, handler: impl Handler) -> Self {
        self.handler(Method::DELETE, handler)
    }

    /// Adds a PATCH handler.
    #[must_use]
    pub fn patch(self, handler: impl Handler) -> Self {
        self.handler(Method::PATCH, handler)
    }

    /// Path pattern.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Declared middleware names, unparsed.
    #[must_use]
    pub fn middleware_names(&self) -> &[String] {
        &self.middleware
    }

    /// Methods with a handler, in declaration order.
    pub fn methods(&self) -> impl Iterator<Item = &Method> {
        self.handlers.iter().map(|(method, _)| method)
    }

    pub(crate) fn into_parts(self) -> DeclarationParts {
        DeclarationParts {
            path: self.path,
            middleware: self.middleware,
            validation: self.validation,
            doc: self.doc,
            handlers: self.handlers,
        }
    }
}

pub(crate) struct DeclarationParts {
    pub path: String,
    pub middleware: Vec<String>,
    pub validation: Validation,
    pub doc: DocMeta,
    pub handlers: Vec<(Method, BoxedHandler)>,
}
