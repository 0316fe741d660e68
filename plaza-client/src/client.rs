use std::sync::Arc;

use plaza_defaults::PolicyRegistry;
use plaza_transport::{GatewayConfig, HttpGateway, ProxyError, Transport};
use plaza_types::Entity;

use crate::builder::QueryBuilder;

/// Entry point: a transport plus the insert-defaulting registry.
///
/// Cheap to clone; builders carry their own copy.
#[derive(Clone)]
pub struct Client {
    transport: Arc<dyn Transport>,
    defaults: Arc<PolicyRegistry>,
}

impl Client {
    /// Client over `transport` with the standard defaulting catalogue.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self::with_defaults(transport, PolicyRegistry::standard())
    }

    pub fn with_defaults(transport: Arc<dyn Transport>, defaults: PolicyRegistry) -> Self {
        Self {
            transport,
            defaults: Arc::new(defaults),
        }
    }

    /// Client talking HTTP to the configured gateway function.
    pub fn from_config(config: &GatewayConfig) -> Result<Self, ProxyError> {
        Ok(Self::new(Arc::new(HttpGateway::new(config)?)))
    }

    pub fn table(&self, entity: Entity) -> QueryBuilder {
        QueryBuilder::new(self.clone(), entity)
    }

    /// Like [`table`](Self::table) for a name only known at runtime.
    pub fn table_named(&self, name: &str) -> Result<QueryBuilder, ProxyError> {
        Ok(self.table(name.parse()?))
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    pub fn defaults(&self) -> &PolicyRegistry {
        &self.defaults
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plaza_transport::RecordingTransport;

    #[test]
    fn unknown_table_name_is_rejected() {
        let client = Client::new(Arc::new(RecordingTransport::new()));
        let err = client.table_named("accounts").err().unwrap();
        assert_eq!(err.to_string(), "unknown entity: accounts");
        assert_eq!(
            client.table_named("poll_votes").ok().map(|q| q.entity()),
            Some(Entity::PollVotes)
        );
    }

    #[tokio::test]
    async fn custom_registry_replaces_standard_catalogue() {
        let transport = Arc::new(RecordingTransport::new());
        let client = Client::with_defaults(transport.clone(), PolicyRegistry::empty());
        client
            .table(Entity::Posts)
            .insert(serde_json::Map::new())
            .await
            .unwrap();
        let body = &transport.request_bodies().await[0];
        assert_eq!(body["data"], serde_json::json!({}));
    }
}
