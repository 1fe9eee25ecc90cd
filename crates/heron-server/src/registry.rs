//! Endpoint registry.
//!
//! Turns declarations into a route table and the API document. Everything
//! that can be wrong with a declaration set is detected here, before the
//! server accepts a connection:
//!
//! - a (path, method) pair declared twice;
//! - a middleware name that does not exist;
//! - a method that cannot be declared (OPTIONS, HEAD, ...);
//! - a malformed path pattern;
//! - a path the server answers itself (`/health`, `/ready`, `/opendocs`).

use std::sync::Arc;

use bytes::Bytes;
use heron_core::{EndpointDescriptor, MiddlewareName};
use heron_docs::{ApiDocument, ApiDocumentBuilder};
use heron_middleware::{MiddlewareRegistry, Pipeline};
use heron_router::{RouteMatch, RouteTable};
use http::Method;
use tracing::{debug, info};

use crate::endpoint::EndpointDeclaration;
use crate::error::{ServerError, ServerResult};
use crate::handler::BoxedHandler;
use crate::health::{HEALTH_PATH, READY_PATH};
use crate::server::DOCS_PATH;

const RESERVED_PATHS: [&str; 3] = [HEALTH_PATH, READY_PATH, DOCS_PATH];

/// A registered (path, method): its descriptor, the stages to run first,
/// and the handler.
#[derive(Clone)]
pub struct CompiledEndpoint {
    /// The immutable descriptor.
    pub descriptor: Arc<EndpointDescriptor>,
    /// Declared middleware, then validation and resolution.
    pub pipeline: Pipeline,
    /// The handler.
    pub handler: BoxedHandler,
}

impl std::fmt::Debug for CompiledEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledEndpoint")
            .field("method", &self.descriptor.method)
            .field("path", &self.descriptor.path)
            .field("pipeline", &self.pipeline)
            .finish_non_exhaustive()
    }
}

/// Routes and documentation built from a declaration set.
#[derive(Debug)]
pub struct EndpointRegistry {
    routes: RouteTable<CompiledEndpoint>,
    document: ApiDocument,
    document_json: Bytes,
}

impl EndpointRegistry {
    /// Builds the registry.
    ///
    /// Each declared verb becomes one route whose pipeline comes from
    /// `middleware` and whose operation is added to `docs`.
    pub fn build<I>(
        declarations: I,
        middleware: &MiddlewareRegistry,
        mut docs: ApiDocumentBuilder,
    ) -> ServerResult<Self>
    where
        I: IntoIterator<Item = EndpointDeclaration>,
    {
        let mut routes = RouteTable::new();

        for declaration in declarations {
            let parts = declaration.into_parts();
            if is_reserved(&parts.path) {
                return Err(ServerError::ReservedPath { path: parts.path });
            }
            let names = parts
                .middleware
                .iter()
                .map(|name| {
                    name.parse::<MiddlewareName>()
                        .map_err(|_| ServerError::UnknownMiddleware {
                            name: name.clone(),
                            path: parts.path.clone(),
                        })
                })
                .collect::<ServerResult<Vec<_>>>()?;

            if parts.handlers.is_empty() {
                tracing::warn!(path = %parts.path, "endpoint declares no handler, skipping");
            }

            for (method, handler) in parts.handlers {
                let descriptor = Arc::new(EndpointDescriptor {
                    path: parts.path.clone(),
                    method: method.clone(),
                    middleware: names.clone(),
                    validation: parts.validation.clone(),
                    doc: parts.doc.clone(),
                });
                let pipeline = middleware.pipeline_for(&descriptor);
                debug!(
                    http.method = %method,
                    http.path = %parts.path,
                    stages = ?pipeline.stage_names(),
                    "registering endpoint"
                );

                routes.insert(
                    &parts.path,
                    &method,
                    CompiledEndpoint {
                        descriptor: descriptor.clone(),
                        pipeline,
                        handler,
                    },
                )?;
                docs.add_endpoint(&descriptor);
            }
        }

        let document = docs.build();
        let document_json = Bytes::from(document.to_json()?);
        info!(
            routes = routes.len(),
            documented = document.operation_count(),
            "endpoint registry built"
        );

        Ok(Self {
            routes,
            document,
            document_json,
        })
    }

    /// Matches a request. `None` means no route.
    #[must_use]
    pub fn dispatch(&self, method: &Method, path: &str) -> Option<RouteMatch<'_, CompiledEndpoint>> {
        self.routes.dispatch(method, path)
    }

    /// The API document.
    #[must_use]
    pub fn document(&self) -> &ApiDocument {
        &self.document
    }

    /// The API document, serialized once at build.
    #[must_use]
    pub fn document_json(&self) -> Bytes {
        self.document_json.clone()
    }

    /// Number of declared routes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Returns true if no route is declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

/// Built-in paths are matched before routing, so a declaration on one
/// would never run.
fn is_reserved(path: &str) -> bool {
    let normalized = format!("/{}", path.trim_matches('/'));
    RESERVED_PATHS.contains(&normalized.as_str())
}
