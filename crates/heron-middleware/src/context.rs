//! Per-request middleware context.
//!
//! One [`MiddlewareContext`] is created for each matched request and
//! threaded through every stage and then the handler. It carries:
//!
//! - the request id and the endpoint being served;
//! - the [`RequestTrace`] for this request;
//! - the JSON patches produced by `Continue` outcomes, keyed by stage name;
//! - typed extensions that stages use to hand data to each other.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use heron_core::{EndpointDescriptor, HeronError, HeronResult, MiddlewareName, RequestId, User};
use heron_telemetry::RequestTrace;
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::stages::auth::AuthPatch;
use crate::stages::validation::VALIDATION_STAGE;

/// Shared state of one request.
pub struct MiddlewareContext {
    request_id: RequestId,
    descriptor: Arc<EndpointDescriptor>,
    trace: RequestTrace,
    patches: IndexMap<&'static str, Value>,
    extensions: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl std::fmt::Debug for MiddlewareContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MiddlewareContext")
            .field("request_id", &self.request_id)
            .field("method", &self.descriptor.method)
            .field("path", &self.descriptor.path)
            .field("patches", &self.patches)
            .field("extensions", &self.extensions.len())
            .finish_non_exhaustive()
    }
}

impl MiddlewareContext {
    /// Creates the context for `descriptor`, taking over `trace`.
    #[must_use]
    pub fn new(descriptor: Arc<EndpointDescriptor>, trace: RequestTrace) -> Self {
        Self {
            request_id: trace.id(),
            descriptor,
            trace,
            patches: IndexMap::new(),
            extensions: HashMap::new(),
        }
    }

    /// Returns the request ID.
    #[must_use]
    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// The endpoint being served.
    #[must_use]
    pub fn descriptor(&self) -> &EndpointDescriptor {
        &self.descriptor
    }

    /// The request trace.
    #[must_use]
    pub fn trace(&self) -> &RequestTrace {
        &self.trace
    }

    /// Mutable access to the request trace.
    pub fn trace_mut(&mut self) -> &mut RequestTrace {
        &mut self.trace
    }

    /// Gives back the trace once the request is answered.
    #[must_use]
    pub fn into_trace(self) -> RequestTrace {
        self.trace
    }

    /// Stores `patch` under `name`, replacing an earlier one.
    pub fn insert_patch(&mut self, name: &'static str, patch: Value) {
        self.patches.insert(name, patch);
    }

    /// The patch stored under `name`.
    #[must_use]
    pub fn patch(&self, name: &str) -> Option<&Value> {
        self.patches.get(name)
    }

    /// Mutable access to the patch stored under `name`.
    pub fn patch_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.patches.get_mut(name)
    }

    /// Deserializes the patch stored under `name`.
    #[must_use]
    pub fn patch_as<T: DeserializeOwned>(&self, name: &str) -> Option<T> {
        let value = self.patches.get(name)?;
        match serde_json::from_value(value.clone()) {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!(patch = name, error = %e, "patch has an unexpected shape");
                None
            }
        }
    }

    /// Names of the stored patches, in insertion order.
    pub fn patch_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.patches.keys().copied()
    }

    /// The authenticated user, when `auth:validToken` ran.
    #[must_use]
    pub fn user(&self) -> Option<User> {
        self.patch_as::<AuthPatch>(MiddlewareName::ValidToken.as_str())
            .map(|auth| auth.user)
    }

    /// The authenticated user, or an authentication error.
    pub fn require_user(&self) -> HeronResult<User> {
        self.user()
            .ok_or_else(|| HeronError::authentication("Unauthorized."))
    }

    /// A validated query value. Reference fields hold the resolved entity.
    #[must_use]
    pub fn query(&self, name: &str) -> Option<&Value> {
        self.patch(VALIDATION_STAGE)?.get("query")?.get(name)
    }

    /// Deserializes a validated query value.
    pub fn query_as<T: DeserializeOwned>(&self, name: &str) -> HeronResult<T> {
        let value = self
            .query(name)
            .ok_or_else(|| HeronError::validation(format!("{name} is required")))?;
        serde_json::from_value(value.clone())
            .map_err(|e| HeronError::validation(format!("Invalid query parameter for '{name}', {e}")))
    }

    /// The validated JSON body.
    #[must_use]
    pub fn body(&self) -> Option<&Value> {
        self.patch(VALIDATION_STAGE)?
            .get("body")
            .filter(|v| !v.is_null())
    }

    /// Deserializes the validated JSON body.
    pub fn body_as<T: DeserializeOwned>(&self) -> HeronResult<T> {
        let value = self
            .body()
            .ok_or_else(|| HeronError::validation("Invalid body, expected JSON."))?;
        serde_json::from_value(value.clone())
            .map_err(|e| HeronError::validation(format!("Invalid body, {e}")))
    }

    /// Stores a typed extension value.
    pub fn set_extension<T: Send + Sync + 'static>(&mut self, value: T) {
        self.extensions.insert(TypeId::of::<T>(), Box::new(value));
    }

    /// Retrieves a typed extension value.
    #[must_use]
    pub fn get_extension<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.extensions
            .get(&TypeId::of::<T>())
            .and_then(|v| v.downcast_ref::<T>())
    }

    /// Removes and returns a typed extension value.
    pub fn remove_extension<T: Send + Sync + 'static>(&mut self) -> Option<T> {
        self.extensions
            .remove(&TypeId::of::<T>())
            .and_then(|v| v.downcast::<T>().ok())
            .map(|v| *v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use heron_core::fixtures;
    use heron_core::{DocMeta, Validation};
    use http::Method;
    use serde_json::json;

    fn context() -> MiddlewareContext {
        let descriptor = EndpointDescriptor {
            path: "/api/whoAmI".to_string(),
            method: Method::GET,
            middleware: vec![MiddlewareName::ValidToken],
            validation: Validation::new(),
            doc: DocMeta::new("Current user"),
        };
        MiddlewareContext::new(Arc::new(descriptor), RequestTrace::begin(RequestId::new()))
    }

    #[test]
    fn test_request_id_is_trace_id() {
        let ctx = context();
        assert_eq!(ctx.request_id(), ctx.trace().id());
        assert_eq!(ctx.descriptor().path, "/api/whoAmI");
    }

    #[test]
    fn test_patches_keep_order_and_replace() {
        let mut ctx = context();
        ctx.insert_patch("b", json!(1));
        ctx.insert_patch("a", json!(2));
        ctx.insert_patch("b", json!(3));
        assert_eq!(ctx.patch_names().collect::<Vec<_>>(), ["b", "a"]);
        assert_eq!(ctx.patch("b"), Some(&json!(3)));
        assert_eq!(ctx.patch_as::<u32>("a"), Some(2));
        assert_eq!(ctx.patch_as::<String>("a"), None);
    }

    #[test]
    fn test_user_from_auth_patch() {
        let mut ctx = context();
        assert!(ctx.require_user().is_err());

        let user = fixtures::user("u-1", "ada@example.com", "t-1");
        ctx.insert_patch(
            "auth:validToken",
            json!({ "token": "t-1", "user": serde_json::to_value(&user).unwrap() }),
        );
        assert_eq!(ctx.require_user().unwrap(), user);
    }

    #[test]
    fn test_validated_accessors() {
        let mut ctx = context();
        assert!(ctx.body().is_none());
        assert!(ctx.query_as::<i64>("limit").is_err());

        ctx.insert_patch(
            VALIDATION_STAGE,
            json!({ "query": { "limit": 5 }, "body": { "name": "ada" } }),
        );
        assert_eq!(ctx.query_as::<i64>("limit").unwrap(), 5);
        assert_eq!(ctx.body().unwrap()["name"], "ada");

        #[derive(serde::Deserialize)]
        struct Body {
            name: String,
        }
        assert_eq!(ctx.body_as::<Body>().unwrap().name, "ada");
    }

    #[test]
    fn test_extensions() {
        #[derive(Debug, PartialEq)]
        struct Marker(u8);

        let mut ctx = context();
        assert!(ctx.get_extension::<Marker>().is_none());
        ctx.set_extension(Marker(7));
        assert_eq!(ctx.get_extension::<Marker>(), Some(&Marker(7)));
        assert_eq!(ctx.remove_extension::<Marker>(), Some(Marker(7)));
        assert!(ctx.get_extension::<Marker>().is_none());
    }
}
