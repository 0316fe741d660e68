//! Fluent, lazily executed query client for the platform's data gateway.
//!
//! Queries read like an embedded relational client but every resolution is
//! one JSON request to a remote gateway function:
//!
//! - chaining (`eq`, `order`, `range`, ...) only builds a descriptor;
//! - `select`, `single`, `maybe_single`, `insert` and awaiting a builder send it;
//! - `update`/`delete` hand back a nested builder that sends when awaited.
//!
//! Inserts run through the per-entity defaulting registry first because the
//! store behind the gateway generates no ids or timestamps itself.

mod builder;
mod client;
mod resolution;

pub use builder::{DeleteBuilder, QueryBuilder, UpdateBuilder};
pub use client::Client;
pub use resolution::Resolution;

pub use plaza_defaults::PolicyRegistry;
pub use plaza_query::{Filterable, Operator, Predicate, QueryDescriptor};
pub use plaza_transport::{GatewayConfig, HttpGateway, ProxyError, RecordingTransport, Transport};
pub use plaza_types::{Action, Entity, Payload, Row};
