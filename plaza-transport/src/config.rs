use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::ProxyError;

pub const DEFAULT_FUNCTION: &str = "db-proxy";

pub const ENV_URL: &str = "PLAZA_GATEWAY_URL";
pub const ENV_FUNCTION: &str = "PLAZA_GATEWAY_FUNCTION";
pub const ENV_TOKEN: &str = "PLAZA_GATEWAY_TOKEN";
pub const ENV_TIMEOUT_MS: &str = "PLAZA_GATEWAY_TIMEOUT_MS";

fn default_function() -> String {
    DEFAULT_FUNCTION.into()
}

/// Where the gateway function lives and how to call it.
///
/// YAML form:
///
/// ```yaml
/// base_url: https://project.example.co
/// function: db-proxy
/// token: eyJhbGciOi...
/// timeout_ms: 10000
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct GatewayConfig {
    pub base_url: String,
    #[serde(default = "default_function")]
    pub function: String,
    #[serde(default)]
    pub token: Option<String>,
    /// Request timeout applied by the HTTP client; none when unset.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

impl GatewayConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            function: default_function(),
            token: None,
            timeout_ms: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn from_env() -> Result<Self, ProxyError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key/value source; `from_env` is this over the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ProxyError> {
        let base_url = lookup(ENV_URL)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ProxyError::Config(format!("{ENV_URL} is not set")))?;
        let function = lookup(ENV_FUNCTION)
            .filter(|v| !v.is_empty())
            .unwrap_or_else(default_function);
        let token = lookup(ENV_TOKEN).filter(|v| !v.is_empty());
        let timeout_ms = match lookup(ENV_TIMEOUT_MS) {
            Some(v) if !v.is_empty() => Some(v.parse::<u64>().map_err(|e| {
                ProxyError::Config(format!("{ENV_TIMEOUT_MS}: {e}"))
            })?),
            _ => None,
        };
        Ok(Self {
            base_url,
            function,
            token,
            timeout_ms,
        })
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ProxyError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| ProxyError::Config(format!("{}: {e}", path.display())))?;
        serde_yaml::from_str(&text)
            .map_err(|e| ProxyError::Config(format!("{}: {e}", path.display())))
    }

    /// Full URL of the gateway function.
    pub fn endpoint(&self) -> String {
        format!(
            "{}/functions/v1/{}",
            self.base_url.trim_end_matches('/'),
            self.function
        )
    }
}
