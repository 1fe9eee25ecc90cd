//! The route table.

use http::Method;

use crate::error::{RouterError, RouterResult};
use crate::method_table::{MethodTable, Verb};
use crate::node::Node;
use crate::params::Params;

/// What a matched route resolves to.
#[derive(Debug, PartialEq, Eq)]
pub enum Target<'a, T> {
    /// A declared endpoint.
    Endpoint(&'a T),
    /// The derived OPTIONS route of a path. Carries the `Allow` value:
    /// every declared verb on the path, OPTIONS itself excluded.
    Preflight {
        /// `Allow` header value, e.g. `GET, POST`.
        allow: &'a str,
    },
}

/// A matched route with its captured path parameters.
#[derive(Debug, PartialEq, Eq)]
pub struct RouteMatch<'a, T> {
    /// The route target.
    pub target: Target<'a, T>,
    /// Captured path parameters.
    pub params: Params,
}

/// Maps (path pattern, method) pairs to route targets.
///
/// Every path with at least one declared verb also answers OPTIONS. That
/// route is derived from the table and cannot be declared or replaced.
///
/// ```rust
/// use heron_router::{RouteTable, Target};
/// use http::Method;
///
/// let mut table = RouteTable::new();
/// table.insert("/api/users/{id}", &Method::GET, "getUser").unwrap();
/// table.insert("/api/users/{id}", &Method::DELETE, "deleteUser").unwrap();
///
/// let m = table.dispatch(&Method::GET, "/api/users/7").unwrap();
/// assert_eq!(m.target, Target::Endpoint(&"getUser"));
/// assert_eq!(m.params.get("id"), Some("7"));
///
/// let m = table.dispatch(&Method::OPTIONS, "/api/users/7").unwrap();
/// assert_eq!(m.target, Target::Preflight { allow: "GET, DELETE" });
///
/// assert!(table.dispatch(&Method::PUT, "/api/users/7").is_none());
/// ```
#[derive(Debug, Clone)]
pub struct RouteTable<T> {
    root: Node<T>,
    route_count: usize,
}

impl<T> Default for RouteTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> RouteTable<T> {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            root: Node::root(),
            route_count: 0,
        }
    }

    /// Registers `target` for (`path`, `method`).
    ///
    /// Fails if the pair is already registered, if `method` is not a
    /// declarable verb (OPTIONS, HEAD, ...), or if the pattern is malformed.
    pub fn insert(&mut self, path: &str, method: &Method, target: T) -> RouterResult<()> {
        let verb = Verb::from_method(method).ok_or_else(|| RouterError::UnsupportedMethod {
            method: method.clone(),
            path: path.to_string(),
        })?;
        self.root
            .table_mut(path)?
            .insert(verb, target)
            .map_err(|_| RouterError::Conflict {
                method: method.clone(),
                path: path.to_string(),
            })?;
        self.route_count += 1;
        Ok(())
    }

    /// Resolves a request.
    ///
    /// `None` means no route: the caller answers with a fixed
    /// "not implemented" response.
    #[must_use]
    pub fn dispatch(&self, method: &Method, path: &str) -> Option<RouteMatch<'_, T>> {
        let (table, params) = self.root.match_path(path)?;
        let target = if *method == Method::OPTIONS {
            Target::Preflight {
                allow: table.allow(),
            }
        } else {
            Target::Endpoint(table.get(Verb::from_method(method)?)?)
        };
        Some(RouteMatch { target, params })
    }

    /// The method table matching `path`, without choosing a verb.
    #[must_use]
    pub fn match_path(&self, path: &str) -> Option<(&MethodTable<T>, Params)> {
        self.root.match_path(path)
    }

    /// Number of declared (path, verb) routes. Derived OPTIONS routes are
    /// not counted.
    #[must_use]
    pub fn len(&self) -> usize {
        self.route_count
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.route_count == 0
    }
}
