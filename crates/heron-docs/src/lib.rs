//! # Heron Docs
//!
//! Derives an OpenAPI 3.1 document from the same endpoint declarations
//! that drive routing and validation, so there is no separate schema to
//! keep in sync.
//!
//! The document is built once at startup with [`ApiDocumentBuilder`] and
//! served read-only by the server at `GET /opendocs`.

#![warn(missing_docs)]

mod builder;
mod error;
mod openapi;

pub use builder::{operation_id, ApiDocumentBuilder, BEARER_AUTH};
pub use error::{DocsError, DocsResult};
pub use openapi::{
    ApiDocument, Components, Info, MediaType, Operation, Parameter, ParameterIn, PathItem,
    RequestBody, Response, Schema, SchemaType, SecurityRequirement, SecurityScheme, Server,
};
