//! Contracts for the service's external collaborators.
//!
//! The framework only needs a handful of operations from its data store,
//! object store and identity providers. Implementations live with the
//! service (see `heron-users`), so the core stays free of any driver.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use crate::error::HeronError;
use crate::user::User;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by a store backend.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The backend is not connected.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A write collided with an existing record.
    #[error("conflict on {key}")]
    Conflict {
        /// The colliding key.
        key: String,
    },

    /// Update of a record that does not exist.
    #[error("no record for {key}")]
    Missing {
        /// The missing key.
        key: String,
    },

    /// Anything the backend reports.
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

impl From<StoreError> for HeronError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict { .. } => Self::conflict(err.to_string()),
            StoreError::Missing { .. } => Self::not_found(err.to_string()),
            other => Self::internal_with_source("data store failure", other),
        }
    }
}

/// Connection state of a data store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreState {
    /// `connect` has not been called.
    NotStarted,
    /// Connection in progress.
    Connecting,
    /// Ready for queries.
    Connected,
    /// The last connection attempt failed.
    Failed,
}

impl StoreState {
    /// Response text for requests rejected in this state.
    #[must_use]
    pub const fn describe(&self) -> &'static str {
        match self {
            Self::NotStarted => "Database connection not started",
            Self::Connecting => "Database connection in progress",
            Self::Connected => "Database connected",
            Self::Failed => "Database connection failed",
        }
    }
}

/// A key a user can be looked up by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserKey<'a> {
    /// The user's `uid`.
    Id(&'a str),
    /// The user's session token.
    Token(&'a str),
    /// The user's email.
    Email(&'a str),
}

impl UserKey<'_> {
    /// Query label used in trace annotations.
    #[must_use]
    pub const fn query_name(&self) -> &'static str {
        match self {
            Self::Id(_) => "findUserByUserID",
            Self::Token(_) => "findUserByToken",
            Self::Email(_) => "findUserByEmail",
        }
    }
}

/// Persistent user storage.
#[async_trait]
pub trait DataStore: Send + Sync + 'static {
    /// Current connection state.
    fn state(&self) -> StoreState;

    /// Finds a user by key.
    async fn find_user(&self, key: UserKey<'_>) -> StoreResult<Option<User>>;

    /// Inserts a new user. Fails with [`StoreError::Conflict`] if the uid,
    /// email or token is taken.
    async fn save_user(&self, user: User) -> StoreResult<()>;

    /// Replaces an existing user, matched by uid.
    async fn update_user(&self, user: User) -> StoreResult<()>;
}

/// A stored blob with its media type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    /// Raw bytes.
    pub bytes: Bytes,
    /// Media type, e.g. `image/heic`.
    pub content_type: String,
}

/// Blob storage keyed by name.
#[async_trait]
pub trait ObjectStore: Send + Sync + 'static {
    /// Stores `blob` under `key`, replacing any previous value.
    async fn put(&self, key: &str, blob: Blob) -> StoreResult<()>;

    /// Fetches the blob under `key`.
    async fn get(&self, key: &str) -> StoreResult<Option<Blob>>;

    /// Removes the blob under `key`; returns whether one existed.
    async fn delete(&self, key: &str) -> StoreResult<bool>;
}

/// Profile fields an identity provider vouches for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityProfile {
    /// Verified email.
    pub email: String,
    /// Display name.
    pub name: String,
    /// Avatar URL, if the provider has one.
    pub picture: Option<String>,
}

/// Resolves an opaque access token to profile fields.
///
/// Errors are returned as [`HeronError`] so the provider decides the status
/// the client sees (bad token vs. unreachable upstream).
#[async_trait]
pub trait IdentityProvider: Send + Sync + 'static {
    /// Resolves `access_token`.
    async fn resolve(&self, access_token: &str) -> Result<IdentityProfile, HeronError>;
}
