//! Radix tree node implementation.

use crate::error::{RouterError, RouterResult};
use crate::method_table::MethodTable;
use crate::params::Params;

/// Type of path segment in the radix tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SegmentKind {
    /// Static path segment (e.g., "users", "api")
    Static,
    /// Named parameter (e.g., "{id}")
    Param(String),
    /// Catch-all wildcard (e.g., "*path")
    Wildcard(String),
}

/// A node in the radix tree.
///
/// Nodes at route boundaries carry a [`MethodTable`].
#[derive(Debug, Clone)]
pub struct Node<T> {
    segment: String,
    kind: SegmentKind,
    methods: Option<MethodTable<T>>,
    /// Sorted by segment for binary search.
    static_children: Vec<Node<T>>,
    param_child: Option<Box<Node<T>>>,
    wildcard_child: Option<Box<Node<T>>>,
}

impl<T> Node<T> {
    fn with_kind(segment: String, kind: SegmentKind) -> Self {
        Self {
            segment,
            kind,
            methods: None,
            static_children: Vec::new(),
            param_child: None,
            wildcard_child: None,
        }
    }

    /// Creates a root node for the tree.
    #[must_use]
    pub fn root() -> Self {
        Self::with_kind(String::new(), SegmentKind::Static)
    }

    /// Returns the method table for `path`, creating nodes as needed.
    pub fn table_mut(&mut self, path: &str) -> RouterResult<&mut MethodTable<T>> {
        let segments = parse_path(path);
        if let Some(pos) = segments
            .iter()
            .position(|(_, k)| matches!(k, SegmentKind::Wildcard(_)))
        {
            if pos + 1 != segments.len() {
                return Err(RouterError::WildcardNotLast(path.to_string()));
            }
        }
        self.descend(path, &segments)
    }

    fn descend(
        &mut self,
        path: &str,
        segments: &[(String, SegmentKind)],
    ) -> RouterResult<&mut MethodTable<T>> {
        let Some(((segment, kind), remaining)) = segments.split_first() else {
            return Ok(self.methods.get_or_insert_with(MethodTable::new));
        };

        let child = match kind {
            SegmentKind::Static => {
                let idx = match self
                    .static_children
                    .binary_search_by(|c| c.segment.as_str().cmp(segment))
                {
                    Ok(i) => i,
                    Err(i) => {
                        self.static_children
                            .insert(i, Self::with_kind(segment.clone(), SegmentKind::Static));
                        i
                    }
                };
                &mut self.static_children[idx]
            }
            SegmentKind::Param(name) | SegmentKind::Wildcard(name) => {
                let slot = if matches!(kind, SegmentKind::Param(_)) {
                    &mut self.param_child
                } else {
                    &mut self.wildcard_child
                };
                let child =
                    slot.get_or_insert_with(|| Box::new(Self::with_kind(segment.clone(), kind.clone())));
                if child.kind != *kind {
                    return Err(RouterError::ParamConflict {
                        path: path.to_string(),
                        existing: child.name().to_string(),
                        new: name.clone(),
                    });
                }
                child.as_mut()
            }
        };
        child.descend(path, remaining)
    }

    fn name(&self) -> &str {
        match &self.kind {
            SegmentKind::Static => &self.segment,
            SegmentKind::Param(name) | SegmentKind::Wildcard(name) => name,
        }
    }

    /// Matches a concrete request path.
    ///
    /// Static segments win over parameters, parameters over wildcards.
    #[must_use]
    pub fn match_path(&self, path: &str) -> Option<(&MethodTable<T>, Params)> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let mut params = Params::new();
        let table = self.match_segments(&segments, &mut params)?;
        Some((table, params))
    }

    fn match_segments<'a>(
        &'a self,
        segments: &[&str],
        params: &mut Params,
    ) -> Option<&'a MethodTable<T>> {
        let Some((segment, remaining)) = segments.split_first() else {
            return self.methods.as_ref();
        };

        if let Ok(i) = self
            .static_children
            .binary_search_by(|c| c.segment.as_str().cmp(segment))
        {
            if let Some(found) = self.static_children[i].match_segments(remaining, params) {
                return Some(found);
            }
        }

        if let Some(child) = &self.param_child {
            params.push(child.name(), *segment);
            if let Some(found) = child.match_segments(remaining, params) {
                return Some(found);
            }
            params.pop();
        }

        if let Some(child) = &self.wildcard_child {
            if let Some(methods) = &child.methods {
                params.push(child.name(), segments.join("/"));
                return Some(methods);
            }
        }

        None
    }
}

/// Splits a pattern into typed segments.
fn parse_path(path: &str) -> Vec<(String, SegmentKind)> {
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(|s| {
            let kind = if let Some(name) = s.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
                SegmentKind::Param(name.to_string())
            } else if let Some(name) = s.strip_prefix('*') {
                SegmentKind::Wildcard(name.to_string())
            } else {
                SegmentKind::Static
            };
            (s.to_string(), kind)
        })
        .collect()
}
