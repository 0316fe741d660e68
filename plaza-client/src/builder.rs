use std::future::IntoFuture;

use futures_util::future::BoxFuture;
use plaza_query::{Filterable, Predicate, QueryDescriptor};
use plaza_transport::{dispatch, ProxyError};
use plaza_types::{Action, Entity, Payload, Row};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::client::Client;
use crate::resolution::Resolution;

/// Chainable, lazy query against one table.
///
/// Nothing is sent until a terminal method runs or the builder is awaited.
/// Terminal methods consume the builder, so one value dispatches at most
/// once; clone it first to send the same query twice.
///
/// ```no_run
/// # async fn demo(client: plaza_client::Client) -> Result<(), plaza_client::ProxyError> {
/// use plaza_client::{Entity, Filterable};
///
/// let open = client
///     .table(Entity::Posts)
///     .eq("room_id", "r1")
///     .order("created_at", false)
///     .range(0, 19)
///     .await?;
/// # Ok(()) }
/// ```
#[derive(Clone)]
pub struct QueryBuilder {
    client: Client,
    descriptor: QueryDescriptor,
}

impl QueryBuilder {
    pub(crate) fn new(client: Client, entity: Entity) -> Self {
        Self {
            client,
            descriptor: QueryDescriptor::select(entity),
        }
    }

    pub fn entity(&self) -> Entity {
        self.descriptor.entity
    }

    pub fn descriptor(&self) -> &QueryDescriptor {
        &self.descriptor
    }

    pub fn order(self, column: impl Into<String>, ascending: bool) -> Self {
        self.map(|d| d.with_order(column, ascending))
    }

    pub fn limit(self, n: u64) -> Self {
        self.map(|d| d.with_limit(n))
    }

    /// Inclusive window: rows `from..=to`.
    pub fn range(self, from: u64, to: u64) -> Self {
        self.map(|d| d.with_range(from, to))
    }

    /// Fetch every matching row with the given projection (`"*"` or `"a,b"`).
    pub async fn select(self, projection: &str) -> Result<Vec<Row>, ProxyError> {
        let descriptor = self
            .descriptor
            .with_action(Action::Select)
            .with_projection(projection);
        run(&self.client, descriptor).await
    }

    pub async fn select_all(self) -> Result<Vec<Row>, ProxyError> {
        self.select(plaza_query::ALL_COLUMNS).await
    }

    /// First row or `None`; an empty result is not an error.
    pub async fn single(self) -> Result<Option<Row>, ProxyError> {
        let descriptor = self.descriptor.with_action(Action::Select).with_limit(1);
        Ok(run(&self.client, descriptor).await?.into_iter().next())
    }

    /// Identical to [`single`](Self::single); kept for callers that spell out
    /// that an absent row is expected.
    pub async fn maybe_single(self) -> Result<Option<Row>, ProxyError> {
        self.single().await
    }

    pub async fn select_as<T: DeserializeOwned>(
        self,
        projection: &str,
    ) -> Result<Vec<T>, ProxyError> {
        self.select(projection).await?.into_iter().map(decode).collect()
    }

    pub async fn single_as<T: DeserializeOwned>(self) -> Result<Option<T>, ProxyError> {
        self.single().await?.map(decode).transpose()
    }

    /// Insert one row or a batch, filling absent ids/timestamps first.
    /// Sends immediately.
    pub async fn insert(self, data: impl Into<Payload>) -> Result<Vec<Row>, ProxyError> {
        let entity = self.descriptor.entity;
        let payload = self.client.defaults().apply_defaults(entity, data.into());
        let descriptor = QueryDescriptor::new(entity, Action::Insert).with_payload(payload);
        run(&self.client, descriptor).await
    }

    /// Start an update. Filters already on this builder carry over; the
    /// payload is sent as given.
    pub fn update(self, data: impl Into<Payload>) -> UpdateBuilder {
        UpdateBuilder {
            inner: self.into_write(Action::Update).map(|d| d.with_payload(data)),
        }
    }

    /// Start a delete. Filters already on this builder carry over.
    pub fn delete(self) -> DeleteBuilder {
        DeleteBuilder {
            inner: self.into_write(Action::Delete),
        }
    }

    pub fn into_resolution(self) -> Resolution {
        Resolution::Unresolved(self)
    }

    fn into_write(self, action: Action) -> Self {
        let mut descriptor = QueryDescriptor::new(self.descriptor.entity, action);
        descriptor.filters = self.descriptor.filters;
        Self {
            client: self.client,
            descriptor,
        }
    }

    fn map(mut self, f: impl FnOnce(QueryDescriptor) -> QueryDescriptor) -> Self {
        self.descriptor = f(self.descriptor);
        self
    }
}

impl Filterable for QueryBuilder {
    fn filter(self, column: impl Into<String>, predicate: Predicate) -> Self {
        self.map(|d| d.with_filter(column, predicate))
    }

    fn or(self, expr: impl Into<String>) -> Self {
        self.map(|d| d.with_or(expr))
    }
}

/// Awaiting the builder directly runs it as a select, `*` unless a
/// projection was given.
impl IntoFuture for QueryBuilder {
    type Output = Result<Vec<Row>, ProxyError>;
    type IntoFuture = BoxFuture<'static, Self::Output>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(async move {
            let descriptor = self.descriptor.with_action(Action::Select);
            run(&self.client, descriptor).await
        })
    }
}

/// Pending update: filter chaining, then await to send.
#[derive(Clone)]
pub struct UpdateBuilder {
    inner: QueryBuilder,
}

impl UpdateBuilder {
    pub fn descriptor(&self) -> &QueryDescriptor {
        &self.inner.descriptor
    }
}

impl Filterable for UpdateBuilder {
    fn filter(self, column: impl Into<String>, predicate: Predicate) -> Self {
        Self {
            inner: self.inner.filter(column, predicate),
        }
    }

    fn or(self, expr: impl Into<String>) -> Self {
        Self {
            inner: self.inner.or(expr),
        }
    }
}

impl IntoFuture for UpdateBuilder {
    type Output = Result<Vec<Row>, ProxyError>;
    type IntoFuture = BoxFuture<'static, Self::Output>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(async move { run(&self.inner.client, self.inner.descriptor).await })
    }
}

/// Pending delete: filter chaining, then await to send.
#[derive(Clone)]
pub struct DeleteBuilder {
    inner: QueryBuilder,
}

impl DeleteBuilder {
    pub fn descriptor(&self) -> &QueryDescriptor {
        &self.inner.descriptor
    }
}

impl Filterable for DeleteBuilder {
    fn filter(self, column: impl Into<String>, predicate: Predicate) -> Self {
        Self {
            inner: self.inner.filter(column, predicate),
        }
    }

    fn or(self, expr: impl Into<String>) -> Self {
        Self {
            inner: self.inner.or(expr),
        }
    }
}

impl IntoFuture for DeleteBuilder {
    type Output = Result<Vec<Row>, ProxyError>;
    type IntoFuture = BoxFuture<'static, Self::Output>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(async move { run(&self.inner.client, self.inner.descriptor).await })
    }
}

async fn run(client: &Client, descriptor: QueryDescriptor) -> Result<Vec<Row>, ProxyError> {
    dispatch(client.transport().as_ref(), descriptor.into_request()).await
}

fn decode<T: DeserializeOwned>(row: Row) -> Result<T, ProxyError> {
    serde_json::from_value(Value::Object(row)).map_err(|e| ProxyError::Decode(e.to_string()))
}
