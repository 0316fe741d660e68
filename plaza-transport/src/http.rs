use std::time::Duration;

use async_trait::async_trait;
use plaza_query::GatewayRequest;

use crate::{GatewayConfig, ProxyError, ResponseEnvelope, Transport};

/// Gateway function reached over HTTPS: one POST per request.
pub struct HttpGateway {
    client: reqwest::Client,
    endpoint: String,
    token: Option<String>,
}

impl HttpGateway {
    pub fn new(config: &GatewayConfig) -> Result<Self, ProxyError> {
        let mut builder = reqwest::Client::builder();
        if let Some(ms) = config.timeout_ms {
            builder = builder.timeout(Duration::from_millis(ms));
        }
        let client = builder
            .build()
            .map_err(|e| ProxyError::Config(format!("http client: {e}")))?;
        Ok(Self {
            client,
            endpoint: config.endpoint(),
            token: config.token.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Transport for HttpGateway {
    async fn send(&self, request: &GatewayRequest) -> Result<ResponseEnvelope, ProxyError> {
        let mut call = self.client.post(&self.endpoint).json(request);
        if let Some(token) = &self.token {
            call = call.bearer_auth(token).header("apikey", token);
        }

        let resp = call.send().await.map_err(|e| {
            ProxyError::Transport(format!("gateway request error: {e}"))
        })?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| {
            ProxyError::Transport(format!("gateway body error: {e}"))
        })?;

        if !status.is_success() {
            // An error envelope on a failed status still names the real cause.
            return match serde_json::from_str::<ResponseEnvelope>(&body) {
                Ok(ResponseEnvelope {
                    error: Some(message),
                    ..
                }) => Err(ProxyError::Gateway(message)),
                _ => Err(ProxyError::Transport(format!("gateway status: {status}"))),
            };
        }

        serde_json::from_str(&body)
            .map_err(|e| ProxyError::Decode(format!("gateway envelope: {e}")))
    }
}
