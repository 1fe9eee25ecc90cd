//! Bearer-token authentication (`auth:validToken`).
//!
//! Reads `Authorization: Bearer <token>`, looks the token up in the data
//! store and stores `{token, user}` for later stages and the handler.

use std::sync::Arc;
use std::time::Instant;

use heron_core::{DataStore, MiddlewareName, User, UserKey};
use http::{header, StatusCode};
use serde::{Deserialize, Serialize};

use crate::context::MiddlewareContext;
use crate::middleware::{BoxFuture, Middleware, MiddlewareOutcome};
use crate::types::Request;

const BEARER_PREFIX: &str = "Bearer ";

/// The patch stored by [`ValidTokenMiddleware`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthPatch {
    /// The presented token.
    pub token: String,
    /// The user owning it.
    pub user: User,
}

/// Extracts the bearer token from a request.
///
/// Returns `None` when the header is missing, not `Bearer`, or empty.
#[must_use]
pub fn bearer_token(request: &Request) -> Option<&str> {
    let value = request.headers().get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix(BEARER_PREFIX)?.trim();
    (!token.is_empty()).then_some(token)
}

/// Rejects requests without a token that belongs to a stored user.
#[derive(Clone)]
pub struct ValidTokenMiddleware {
    store: Arc<dyn DataStore>,
}

impl std::fmt::Debug for ValidTokenMiddleware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidTokenMiddleware").finish_non_exhaustive()
    }
}

impl ValidTokenMiddleware {
    /// Creates the middleware.
    #[must_use]
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self { store }
    }
}

impl Middleware for ValidTokenMiddleware {
    fn name(&self) -> &'static str {
        MiddlewareName::ValidToken.as_str()
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: &'a Request,
    ) -> BoxFuture<'a, MiddlewareOutcome> {
        Box::pin(async move {
            let Some(token) = bearer_token(request) else {
                return MiddlewareOutcome::message(StatusCode::UNAUTHORIZED, "Unauthorized.");
            };

            let key = UserKey::Token(token);
            let started = Instant::now();
            let found = self.store.find_user(key).await;
            ctx.trace_mut().annotate(format!(
                "db_query:{} - duration: {}ms",
                key.query_name(),
                started.elapsed().as_millis()
            ));

            match found {
                Ok(Some(user)) => MiddlewareOutcome::patch(&AuthPatch {
                    token: token.to_string(),
                    user,
                }),
                Ok(None) => MiddlewareOutcome::message(StatusCode::UNAUTHORIZED, "User not found."),
                Err(e) => MiddlewareOutcome::fault(
                    "Failed to verify token.",
                    format_args!("token lookup failed: {e}"),
                ),
            }
        })
    }
}
