//! Data-store readiness gate (`db:ready`).

use std::sync::Arc;

use heron_core::{DataStore, MiddlewareName, StoreState};
use http::StatusCode;

use crate::context::MiddlewareContext;
use crate::middleware::{BoxFuture, Middleware, MiddlewareOutcome};
use crate::types::Request;

/// Ends with 500 unless the data store reports [`StoreState::Connected`].
#[derive(Clone)]
pub struct StoreReadyMiddleware {
    store: Arc<dyn DataStore>,
}

impl std::fmt::Debug for StoreReadyMiddleware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreReadyMiddleware")
            .field("state", &self.store.state())
            .finish()
    }
}

impl StoreReadyMiddleware {
    /// Creates the gate.
    #[must_use]
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self { store }
    }
}

impl Middleware for StoreReadyMiddleware {
    fn name(&self) -> &'static str {
        MiddlewareName::StoreReady.as_str()
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        _request: &'a Request,
    ) -> BoxFuture<'a, MiddlewareOutcome> {
        Box::pin(async move {
            match self.store.state() {
                StoreState::Connected => MiddlewareOutcome::proceed(),
                state => {
                    tracing::warn!(
                        request_id = %ctx.request_id(),
                        state = ?state,
                        "data store not ready"
                    );
                    MiddlewareOutcome::message(StatusCode::INTERNAL_SERVER_ERROR, state.describe())
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use heron_core::fixtures::FixtureStore;
    use heron_core::{DocMeta, EndpointDescriptor, RequestId, Validation};
    use heron_telemetry::RequestTrace;
    use http::Method;
    use serde_json::json;

    #[tokio::test]
    async fn test_gate_follows_store_state() {
        let store = Arc::new(FixtureStore::new());
        let gate = StoreReadyMiddleware::new(store.clone());
        let descriptor = EndpointDescriptor {
            path: "/api/register".to_string(),
            method: Method::POST,
            middleware: vec![MiddlewareName::StoreReady],
            validation: Validation::new(),
            doc: DocMeta::default(),
        };
        let mut ctx = MiddlewareContext::new(Arc::new(descriptor), RequestTrace::begin(RequestId::new()));
        let request = http::Request::post("/api/register")
            .body(bytes::Bytes::new())
            .unwrap();

        assert_eq!(gate.process(&mut ctx, &request).await, MiddlewareOutcome::proceed());

        store.set_state(StoreState::Connecting);
        assert_eq!(
            gate.process(&mut ctx, &request).await,
            MiddlewareOutcome::end(
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "message": "Database connection in progress" })
            )
        );

        store.set_state(StoreState::Failed);
        let MiddlewareOutcome::End(end) = gate.process(&mut ctx, &request).await else {
            panic!("expected End");
        };
        assert_eq!(end.body["message"], "Database connection failed");
    }
}
