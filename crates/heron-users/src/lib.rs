//! # Heron Users
//!
//! The user service: registration through Google or Apple, the current
//! user's profile, and profile lookup by id.
//!
//! Collaborators are injected: [`MemoryStore`] and [`MemoryObjectStore`]
//! for storage, [`GoogleIdentity`] and [`AppleIdentity`] for sign-in.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod endpoints;
pub mod identity;
pub mod objects;
pub mod service;
pub mod store;

use std::sync::Arc;

use heron::core::DataStore;
use heron::server::{Server, ServerConfig, ServerResult};

pub use identity::{AppleIdentity, GoogleIdentity};
pub use objects::{ImageStore, MemoryObjectStore};
pub use service::{Registration, RegistrationKind, UserService};
pub use store::MemoryStore;

/// Builds the server with every user endpoint.
pub fn build_server(
    config: ServerConfig,
    store: Arc<dyn DataStore>,
    service: Arc<UserService>,
) -> ServerResult<Server> {
    Server::builder(store)
        .config(config)
        .endpoints(endpoints::all(service))
        .build()
}
