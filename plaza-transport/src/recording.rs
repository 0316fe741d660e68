use std::collections::VecDeque;

use async_trait::async_trait;
use plaza_query::GatewayRequest;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::{ProxyError, ResponseEnvelope, Transport};

/// In-process transport that records every request and answers from a script.
///
/// Scripted replies are consumed in order; once the script runs dry every
/// call gets an empty `{data: [], error: null}` envelope. Used by tests and
/// by the CLI's dry-run mode.
///
/// NOTE: nothing here evaluates filters; it is not a fake store.
#[derive(Default)]
pub struct RecordingTransport {
    requests: Mutex<Vec<GatewayRequest>>,
    script: Mutex<VecDeque<Result<ResponseEnvelope, ProxyError>>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn push_response(&self, envelope: ResponseEnvelope) {
        self.script.lock().await.push_back(Ok(envelope));
    }

    /// Make the next call fail before an envelope exists.
    pub async fn push_failure(&self, error: ProxyError) {
        self.script.lock().await.push_back(Err(error));
    }

    pub async fn requests(&self) -> Vec<GatewayRequest> {
        self.requests.lock().await.clone()
    }

    /// Wire form of every recorded request, in call order.
    pub async fn request_bodies(&self) -> Vec<Value> {
        self.requests
            .lock()
            .await
            .iter()
            .map(|r| serde_json::to_value(r).unwrap_or(Value::Null))
            .collect()
    }

    pub async fn call_count(&self) -> usize {
        self.requests.lock().await.len()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send(&self, request: &GatewayRequest) -> Result<ResponseEnvelope, ProxyError> {
        self.requests.lock().await.push(request.clone());
        self.script
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Ok(ResponseEnvelope::rows(Vec::new())))
    }
}
