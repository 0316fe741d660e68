use plaza_transport::ProxyError;
use plaza_types::Row;
use tracing::debug;

use crate::builder::QueryBuilder;

/// A query slot that is either still being built or already answered.
///
/// Moving from `Unresolved` to `Resolved` is one-way, and only the
/// unresolved side can be chained further.
#[derive(Clone)]
pub enum Resolution {
    Unresolved(QueryBuilder),
    Resolved(Vec<Row>),
}

impl Resolution {
    pub fn is_resolved(&self) -> bool {
        matches!(self, Resolution::Resolved(_))
    }

    /// Apply a chaining step to a pending query. On a resolved slot the step
    /// is discarded without running and the rows are returned as they were.
    pub fn chain(self, f: impl FnOnce(QueryBuilder) -> QueryBuilder) -> Self {
        match self {
            Resolution::Unresolved(q) => Resolution::Unresolved(f(q)),
            resolved => {
                debug!("chaining step on a resolved slot discarded");
                resolved
            }
        }
    }

    /// Send the pending query (as a select) if there is one. Resolving an
    /// already resolved slot does not dispatch again.
    pub async fn resolve(self) -> Result<Self, ProxyError> {
        match self {
            Resolution::Unresolved(q) => Ok(Resolution::Resolved(q.await?)),
            resolved => Ok(resolved),
        }
    }

    pub fn rows(&self) -> Option<&[Row]> {
        match self {
            Resolution::Resolved(rows) => Some(rows),
            Resolution::Unresolved(_) => None,
        }
    }
}
