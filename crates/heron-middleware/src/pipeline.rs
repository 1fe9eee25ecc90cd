//! Ordered middleware pipeline.
//!
//! A pipeline is built once per endpoint and is immutable afterwards. Its
//! stages are the endpoint's declared middleware, in declaration order,
//! followed by the implicit validation and resolution stages (see
//! [`MiddlewareRegistry::pipeline_for`](crate::MiddlewareRegistry::pipeline_for)).
//!
//! ## Short-circuit semantics
//!
//! Stages run one at a time. A `Continue` patch is stored in the context
//! under the stage's name before the next stage starts. The first `End`
//! stops the pipeline: no later stage runs and the handler is skipped.
//!
//! Each stage runs inside a trace span named after it.

use std::ops::ControlFlow;
use std::sync::Arc;

use crate::context::MiddlewareContext;
use crate::middleware::{EndResponse, Middleware, MiddlewareOutcome};
use crate::types::Request;

/// A type-erased middleware that can be stored in a vector.
pub type BoxedMiddleware = Arc<dyn Middleware>;

/// The stages to run before an endpoint's handler.
#[derive(Clone, Default)]
pub struct Pipeline {
    stages: Vec<BoxedMiddleware>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stage_names())
            .finish()
    }
}

impl Pipeline {
    /// Creates a new pipeline builder.
    #[must_use]
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// Runs every stage in order.
    ///
    /// Returns `Continue(())` when the handler should run, or `Break` with
    /// the response of the stage that ended the request.
    pub async fn run(
        &self,
        ctx: &mut MiddlewareContext,
        request: &Request,
    ) -> ControlFlow<EndResponse> {
        for stage in &self.stages {
            let name = stage.name();
            ctx.trace_mut().start_span(name);
            let outcome = stage.process(ctx, request).await;
            ctx.trace_mut().end_span(name);

            match outcome {
                MiddlewareOutcome::Continue(Some(patch)) => ctx.insert_patch(name, patch),
                MiddlewareOutcome::Continue(None) => {}
                MiddlewareOutcome::End(end) => {
                    tracing::debug!(
                        request_id = %ctx.request_id(),
                        stage = name,
                        http.status_code = end.status.as_u16(),
                        "pipeline ended early"
                    );
                    return ControlFlow::Break(end);
                }
            }
        }
        ControlFlow::Continue(())
    }

    /// Stage names in execution order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Number of stages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Returns true if the pipeline has no stages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

/// Builder for [`Pipeline`].
#[derive(Default)]
pub struct PipelineBuilder {
    stages: Vec<BoxedMiddleware>,
}

impl PipelineBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a stage.
    #[must_use]
    pub fn stage(mut self, middleware: BoxedMiddleware) -> Self {
        self.stages.push(middleware);
        self
    }

    /// Appends a stage by value.
    #[must_use]
    pub fn with<M: Middleware>(self, middleware: M) -> Self {
        self.stage(Arc::new(middleware))
    }

    /// Builds the pipeline.
    #[must_use]
    pub fn build(self) -> Pipeline {
        Pipeline {
            stages: self.stages,
        }
    }
}
