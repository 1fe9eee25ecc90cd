//! Named middleware resolution.
//!
//! The set of middleware names is closed ([`MiddlewareName`]), so every
//! name resolves to exactly one implementation here and an unknown name
//! can only fail earlier, when the declaration is parsed.

use std::sync::Arc;

use heron_core::{DataStore, EndpointDescriptor, MiddlewareName};

use crate::pipeline::{BoxedMiddleware, Pipeline};
use crate::stages::{ResolutionStage, StoreReadyMiddleware, ValidTokenMiddleware, ValidationStage};

/// Middleware implementations built from the service's collaborators.
#[derive(Clone)]
pub struct MiddlewareRegistry {
    valid_token: BoxedMiddleware,
    store_ready: BoxedMiddleware,
    validation: BoxedMiddleware,
    resolution: BoxedMiddleware,
}

impl std::fmt::Debug for MiddlewareRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MiddlewareRegistry")
            .field("names", &MiddlewareName::ALL)
            .finish()
    }
}

impl MiddlewareRegistry {
    /// Builds every stage over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self {
            valid_token: Arc::new(ValidTokenMiddleware::new(store.clone())),
            store_ready: Arc::new(StoreReadyMiddleware::new(store.clone())),
            validation: Arc::new(ValidationStage),
            resolution: Arc::new(ResolutionStage::new(store)),
        }
    }

    /// Replaces the implementation behind `name`.
    #[must_use]
    pub fn with_override(mut self, name: MiddlewareName, middleware: BoxedMiddleware) -> Self {
        *self.slot_mut(name) = middleware;
        self
    }

    /// The implementation behind `name`.
    #[must_use]
    pub fn resolve(&self, name: MiddlewareName) -> BoxedMiddleware {
        match name {
            MiddlewareName::ValidToken => self.valid_token.clone(),
            MiddlewareName::StoreReady => self.store_ready.clone(),
        }
    }

    fn slot_mut(&mut self, name: MiddlewareName) -> &mut BoxedMiddleware {
        match name {
            MiddlewareName::ValidToken => &mut self.valid_token,
            MiddlewareName::StoreReady => &mut self.store_ready,
        }
    }

    /// The pipeline for `descriptor`: its middleware in declared order,
    /// then validation, then resolution.
    #[must_use]
    pub fn pipeline_for(&self, descriptor: &EndpointDescriptor) -> Pipeline {
        descriptor
            .middleware
            .iter()
            .fold(Pipeline::builder(), |builder, name| {
                builder.stage(self.resolve(*name))
            })
            .stage(self.validation.clone())
            .stage(self.resolution.clone())
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::{FnMiddleware, MiddlewareOutcome};
    use heron_core::fixtures::FixtureStore;
    use heron_core::{DocMeta, Validation};
    use http::Method;

    fn descriptor(middleware: Vec<MiddlewareName>) -> EndpointDescriptor {
        EndpointDescriptor {
            path: "/api/x".to_string(),
            method: Method::GET,
            middleware,
            validation: Validation::new(),
            doc: DocMeta::default(),
        }
    }

    #[test]
    fn test_every_name_resolves_to_its_stage() {
        let registry = MiddlewareRegistry::new(Arc::new(FixtureStore::new()));
        for name in MiddlewareName::ALL {
            assert_eq!(registry.resolve(name).name(), name.as_str());
        }
    }

    #[test]
    fn test_pipeline_order() {
        let registry = MiddlewareRegistry::new(Arc::new(FixtureStore::new()));

        let pipeline = registry.pipeline_for(&descriptor(vec![
            MiddlewareName::StoreReady,
            MiddlewareName::ValidToken,
        ]));
        assert_eq!(
            pipeline.stage_names(),
            ["db:ready", "auth:validToken", "dataValidation", "dataResolution"]
        );

        let pipeline = registry.pipeline_for(&descriptor(Vec::new()));
        assert_eq!(pipeline.stage_names(), ["dataValidation", "dataResolution"]);
    }

    #[test]
    fn test_override_keeps_position() {
        let registry = MiddlewareRegistry::new(Arc::new(FixtureStore::new())).with_override(
            MiddlewareName::StoreReady,
            Arc::new(FnMiddleware::new("db:always-ready", |_, _| {
                MiddlewareOutcome::proceed()
            })),
        );
        let pipeline = registry.pipeline_for(&descriptor(vec![MiddlewareName::StoreReady]));
        assert_eq!(pipeline.stage_names()[0], "db:always-ready");
    }
}
