use plaza_types::{Action, Entity, Payload};
use serde::Serialize;

use crate::predicate::{Filters, Predicate};

/// Default projection when none was asked for.
pub const ALL_COLUMNS: &str = "*";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OrderBy {
    pub column: String,
    pub ascending: bool,
}

/// Accumulated description of one pending operation.
///
/// Every builder step takes the descriptor by value and hands back the
/// updated one; nothing is shared between two descriptors.
#[derive(Clone, Debug, PartialEq)]
pub struct QueryDescriptor {
    pub entity: Entity,
    pub action: Action,
    pub filters: Filters,
    pub projection: Option<String>,
    pub order: Vec<OrderBy>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    pub payload: Option<Payload>,
}

impl QueryDescriptor {
    pub fn new(entity: Entity, action: Action) -> Self {
        Self {
            entity,
            action,
            filters: Filters::new(),
            projection: None,
            order: Vec::new(),
            limit: None,
            offset: None,
            payload: None,
        }
    }

    pub fn select(entity: Entity) -> Self {
        Self::new(entity, Action::Select)
    }

    pub fn with_action(mut self, action: Action) -> Self {
        self.action = action;
        self
    }

    pub fn with_filter(mut self, column: impl Into<String>, predicate: Predicate) -> Self {
        self.filters.set(column, predicate);
        self
    }

    pub fn with_or(mut self, expr: impl Into<String>) -> Self {
        self.filters.set_or(expr);
        self
    }

    pub fn with_projection(mut self, projection: impl Into<String>) -> Self {
        self.projection = Some(projection.into());
        self
    }

    pub fn with_order(mut self, column: impl Into<String>, ascending: bool) -> Self {
        self.order.push(OrderBy {
            column: column.into(),
            ascending,
        });
        self
    }

    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Inclusive row window: `offset = from`, `limit = to - from + 1`.
    ///
    /// A window with `to < from` collapses to a zero limit.
    pub fn with_range(mut self, from: u64, to: u64) -> Self {
        self.offset = Some(from);
        self.limit = Some(to.saturating_add(1).saturating_sub(from));
        self
    }

    pub fn with_payload(mut self, payload: impl Into<Payload>) -> Self {
        self.payload = Some(payload.into());
        self
    }

    /// Freeze into the wire body sent to the gateway.
    ///
    /// Selects always carry a projection; `*` when none was set.
    pub fn into_request(self) -> GatewayRequest {
        let columns = match (self.action, self.projection) {
            (_, Some(p)) => Some(p),
            (Action::Select, None) => Some(ALL_COLUMNS.to_string()),
            (_, None) => None,
        };
        GatewayRequest {
            action: self.action,
            table: self.entity,
            data: self.payload,
            filters: self.filters,
            options: QueryOptions {
                columns,
                order: self.order,
                limit: self.limit,
                offset: self.offset,
            },
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct QueryOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub columns: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub order: Vec<OrderBy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
}

/// The JSON action envelope the gateway function accepts.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GatewayRequest {
    pub action: Action,
    pub table: Entity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Payload>,
    pub filters: Filters,
    pub options: QueryOptions,
}
