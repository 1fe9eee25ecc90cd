//! Built-in `/health` and `/ready` endpoints.
//!
//! `/health` answers as long as the process serves requests. `/ready`
//! reflects the data store connection and turns 503 once shutdown starts.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use heron_core::{DataStore, StoreState};
use http::StatusCode;
use serde::Serialize;

/// Liveness path.
pub const HEALTH_PATH: &str = "/health";

/// Readiness path.
pub const READY_PATH: &str = "/ready";

/// Body of `/health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthStatus {
    /// Always `ok`.
    pub status: &'static str,
}

/// Body of `/ready`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReadinessStatus {
    /// Whether the service takes traffic.
    pub ready: bool,
    /// Data store connection, as reported to clients.
    pub store: &'static str,
}

impl ReadinessStatus {
    /// 200 when ready, 503 otherwise.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        if self.ready {
            StatusCode::OK
        } else {
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

/// Readiness derived from the data store and the shutdown state.
#[derive(Clone)]
pub struct ReadinessCheck {
    store: Option<Arc<dyn DataStore>>,
    shutting_down: Arc<AtomicBool>,
}

impl std::fmt::Debug for ReadinessCheck {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadinessCheck")
            .field("has_store", &self.store.is_some())
            .field("shutting_down", &self.shutting_down.load(Ordering::SeqCst))
            .finish()
    }
}

impl ReadinessCheck {
    /// Ready whenever `store` is connected. Without a store, ready until
    /// shutdown.
    #[must_use]
    pub fn new(store: Option<Arc<dyn DataStore>>) -> Self {
        Self {
            store,
            shutting_down: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Marks the service as draining.
    pub fn set_shutting_down(&self) {
        self.shutting_down.store(true, Ordering::SeqCst);
    }

    /// Current readiness.
    #[must_use]
    pub fn status(&self) -> ReadinessStatus {
        let state = self
            .store
            .as_ref()
            .map_or(StoreState::Connected, |store| store.state());
        ReadinessStatus {
            ready: state == StoreState::Connected && !self.shutting_down.load(Ordering::SeqCst),
            store: state.describe(),
        }
    }
}

/// Liveness body.
#[must_use]
pub fn health() -> HealthStatus {
    HealthStatus { status: "ok" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use heron_core::fixtures::FixtureStore;

    #[test]
    fn test_health_body() {
        assert_eq!(
            serde_json::to_value(health()).unwrap(),
            serde_json::json!({"status": "ok"})
        );
    }

    #[test]
    fn test_ready_follows_store_state() {
        let store = Arc::new(FixtureStore::new());
        let check = ReadinessCheck::new(Some(store.clone()));
        assert_eq!(check.status().status_code(), StatusCode::OK);

        store.set_state(StoreState::Connecting);
        let status = check.status();
        assert_eq!(status.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(status.store, "Database connection in progress");
    }

    #[test]
    fn test_not_ready_while_shutting_down() {
        let check = ReadinessCheck::new(None);
        assert!(check.status().ready);
        check.set_shutting_down();
        assert!(!check.status().ready);
    }
}
