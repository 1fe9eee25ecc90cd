//! Reference resolution.
//!
//! The second validation stage. It looks up every reference field queued
//! by [`ValidationStage`](super::validation::ValidationStage), swaps the
//! raw id for the resolved entity, and answers 400 with the complete error
//! list when anything was missing. A failing store ends the request with a
//! fault instead.

use std::sync::Arc;
use std::time::Instant;

use heron_core::{DataStore, ReferenceKind, StoreError, StoreResult, UserKey};
use http::StatusCode;
use serde_json::Value;

use crate::context::MiddlewareContext;
use crate::middleware::{BoxFuture, Middleware, MiddlewareOutcome};
use crate::stages::validation::{FieldError, PendingReference, ValidationReport, VALIDATION_STAGE};
use crate::types::Request;

/// Name of the resolution stage.
pub const RESOLUTION_STAGE: &str = "dataResolution";

/// Resolves queued references through the [`DataStore`].
#[derive(Clone)]
pub struct ResolutionStage {
    store: Arc<dyn DataStore>,
}

impl std::fmt::Debug for ResolutionStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolutionStage").finish_non_exhaustive()
    }
}

impl ResolutionStage {
    /// Creates the stage.
    #[must_use]
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self { store }
    }

    /// Looks up one reference.
    ///
    /// `Ok(Err(_))` is the client-facing miss; `Err` is a store failure,
    /// which is not the client's fault and must not be reported as a miss.
    pub async fn resolve(
        &self,
        ctx: &mut MiddlewareContext,
        pending: &PendingReference,
    ) -> StoreResult<Result<Value, FieldError>> {
        match pending.kind {
            ReferenceKind::UserId => {
                let key = UserKey::Id(&pending.id);
                let started = Instant::now();
                let found = self.store.find_user(key).await;
                ctx.trace_mut().annotate(format!(
                    "db_query:{} - duration: {}ms",
                    key.query_name(),
                    started.elapsed().as_millis()
                ));
                match found? {
                    Some(user) => serde_json::to_value(user)
                        .map(Ok)
                        .map_err(|e| StoreError::Backend(e.into())),
                    None => Ok(Err(FieldError {
                        field: pending.field.clone(),
                        message: format!(
                            "{} '{}' is not found from {}.",
                            pending.field,
                            pending.id,
                            pending.kind.as_str()
                        ),
                    })),
                }
            }
        }
    }
}

impl Middleware for ResolutionStage {
    fn name(&self) -> &'static str {
        RESOLUTION_STAGE
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        _request: &'a Request,
    ) -> BoxFuture<'a, MiddlewareOutcome> {
        Box::pin(async move {
            let Some(report) = ctx.remove_extension::<ValidationReport>() else {
                return MiddlewareOutcome::proceed();
            };
            let mut errors = report.errors;

            for pending in &report.pending {
                match self.resolve(ctx, pending).await {
                    Ok(Ok(entity)) => {
                        if let Some(query) = ctx
                            .patch_mut(VALIDATION_STAGE)
                            .and_then(|p| p.get_mut("query"))
                            .and_then(Value::as_object_mut)
                        {
                            query.insert(pending.field.clone(), entity);
                        }
                    }
                    Ok(Err(error)) => errors.push(error),
                    Err(e) => {
                        return MiddlewareOutcome::fault(
                            &format!("Failed to resolve {}.", pending.field),
                            format_args!("{} lookup failed: {e}", pending.field),
                        );
                    }
                }
            }

            if errors.is_empty() {
                MiddlewareOutcome::proceed()
            } else {
                tracing::debug!(
                    request_id = %ctx.request_id(),
                    errors = errors.len(),
                    "request failed validation"
                );
                MiddlewareOutcome::end(
                    StatusCode::BAD_REQUEST,
                    serde_json::json!({ "errors": errors }),
                )
            }
        })
    }
}
