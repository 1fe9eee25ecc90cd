//! # Heron Core
//!
//! Core types for the Heron declarative endpoint framework.
//!
//! This crate provides the foundational types used throughout Heron:
//!
//! - [`EndpointDescriptor`] - Immutable description of one (path, method) route
//! - [`Rule`] / [`Schema`] - Query and body validation rules
//! - [`RequestId`] - UUID v7 request identifier, also used as the trace id
//! - [`HeronError`] - Standard error type
//! - [`DataStore`], [`ObjectStore`], [`IdentityProvider`] - Collaborator contracts
//! - [`User`] - The user entity
//! - [`fixtures`] - In-memory store and sample users for tests

#![doc(html_root_url = "https://docs.rs/heron-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod context;
pub mod endpoint;
mod error;
pub mod fixtures;
pub mod schema;
pub mod store;
mod user;

pub use context::RequestId;
pub use endpoint::{
    DocMeta, EndpointDescriptor, MiddlewareName, ReferenceKind, ResponseDoc, Rule,
    UnknownMiddleware, Validation,
};
pub use error::{ErrorCategory, ErrorDetail, ErrorEnvelope, HeronError, HeronResult};
pub use schema::{Field, ObjectSchema, Schema, SchemaViolation, StringRule};
pub use store::{
    Blob, DataStore, IdentityProfile, IdentityProvider, ObjectStore, StoreError, StoreResult,
    StoreState, UserKey,
};
pub use user::{RegisterType, SocialMedia, User};
