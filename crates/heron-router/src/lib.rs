//! Radix tree route table for Heron.
//!
//! Routes are keyed by (path pattern, verb) and resolve to an arbitrary
//! target type `T`; the server stores one compiled endpoint per route.
//!
//! # Features
//!
//! - **Radix Tree Matching**: lookup time proportional to path length
//! - **Path Parameters**: `/users/{id}`
//! - **Wildcards**: `/files/*path`
//! - **Derived OPTIONS**: every path answers OPTIONS with its `Allow` list
//! - **Fail-Fast Registration**: duplicate (path, verb) pairs are an error
//!
//! # Architecture
//!
//! ```text
//!                    (root)
//!                      │
//!                    "api"
//!              ┌───────┴───────┐
//!          "register"       "users"
//!           [POST]             │
//!                            "{id}"
//!                          [GET, DELETE]
//! ```

mod error;
mod method_table;
mod node;
mod params;
mod router;

pub use error::{RouterError, RouterResult};
pub use method_table::{MethodTable, Verb};
pub use node::{Node, SegmentKind};
pub use params::Params;
pub use router::{RouteMatch, RouteTable, Target};
