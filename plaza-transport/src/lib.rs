use async_trait::async_trait;
use plaza_query::GatewayRequest;
use plaza_types::{InvalidPayload, Row, UnknownEntity};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

pub mod config;
pub use config::GatewayConfig;

pub mod http;
pub use http::HttpGateway;

pub mod recording;
pub use recording::RecordingTransport;

/// Everything a resolved query can fail with.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProxyError {
    /// The call never produced a usable envelope.
    #[error("transport error: {0}")]
    Transport(String),
    /// The gateway answered with an error; shown verbatim.
    #[error("{0}")]
    Gateway(String),
    #[error(transparent)]
    UnknownEntity(#[from] UnknownEntity),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("config error: {0}")]
    Config(String),
}

impl From<InvalidPayload> for ProxyError {
    fn from(e: InvalidPayload) -> Self {
        ProxyError::Decode(e.to_string())
    }
}

/// `{data, error}` wrapper the gateway returns for every call.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ResponseEnvelope {
    pub fn rows(rows: Vec<Row>) -> Self {
        Self {
            data: Some(Value::Array(rows.into_iter().map(Value::Object).collect())),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            data: None,
            error: Some(message.into()),
        }
    }

    /// Unwrap into rows. A set `error` wins over any `data`.
    pub fn into_rows(self) -> Result<Vec<Row>, ProxyError> {
        if let Some(message) = self.error {
            return Err(ProxyError::Gateway(message));
        }
        match self.data {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Object(row)) => Ok(vec![row]),
            Some(Value::Array(items)) => items
                .into_iter()
                .map(|item| match item {
                    Value::Object(row) => Ok(row),
                    other => Err(ProxyError::Decode(format!("row is not an object: {other}"))),
                })
                .collect(),
            Some(other) => Err(ProxyError::Decode(format!(
                "unexpected data in envelope: {other}"
            ))),
        }
    }
}

/// The single-call boundary to the gateway function.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one request and return the gateway's envelope as-is.
    async fn send(&self, request: &GatewayRequest) -> Result<ResponseEnvelope, ProxyError>;
}

/// Send one request, one attempt, and unwrap the envelope into rows.
pub async fn dispatch(
    transport: &dyn Transport,
    request: GatewayRequest,
) -> Result<Vec<Row>, ProxyError> {
    debug!(
        table = %request.table,
        action = %request.action,
        filters = request.filters.len(),
        "dispatching gateway request"
    );
    let result = transport.send(&request).await.and_then(ResponseEnvelope::into_rows);
    match &result {
        Ok(rows) => debug!(table = %request.table, rows = rows.len(), "gateway request ok"),
        Err(e) => warn!(
            table = %request.table,
            action = %request.action,
            error = %e,
            "gateway request failed"
        ),
    }
    result
}
