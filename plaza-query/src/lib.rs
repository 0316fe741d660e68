//! Query descriptor model for the gateway proxy.
//!
//! A descriptor is plain data: entity, action, filters, ordering, window and
//! write payload. It knows how to render itself as the gateway's JSON action
//! envelope but never talks to the network.

pub mod descriptor;
pub mod filter;
pub mod predicate;

pub use descriptor::{GatewayRequest, OrderBy, QueryDescriptor, QueryOptions, ALL_COLUMNS};
pub use filter::Filterable;
pub use predicate::{Filters, Operator, Predicate, OR_KEY};
