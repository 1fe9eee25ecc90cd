//! Built-in pipeline stages.
//!
//! Named stages, selected per endpoint by [`MiddlewareName`](heron_core::MiddlewareName):
//!
//! - [`auth::ValidTokenMiddleware`] (`auth:validToken`)
//! - [`store_ready::StoreReadyMiddleware`] (`db:ready`)
//!
//! Implicit stages, appended to every pipeline:
//!
//! - [`validation::ValidationStage`]: pure query and body checks
//! - [`resolution::ResolutionStage`]: reference lookups and the 400 answer

pub mod auth;
pub mod resolution;
pub mod store_ready;
pub mod validation;

pub use auth::{bearer_token, AuthPatch, ValidTokenMiddleware};
pub use resolution::{ResolutionStage, RESOLUTION_STAGE};
pub use store_ready::StoreReadyMiddleware;
pub use validation::{
    check, CheckedRequest, FieldError, PendingReference, ValidationReport, ValidationStage,
    VALIDATION_STAGE,
};
