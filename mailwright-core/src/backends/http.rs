//! Bearer-token JSON client shared by the backend adapters.

use crate::capabilities::ProviderKind;
use crate::error::BackendError;
use serde_json::Value;
use tracing::debug;

#[derive(Clone)]
pub struct ApiClient {
    provider: ProviderKind,
    base_url: String,
    token: Option<String>,
    client: reqwest::Client,
}

impl ApiClient {
    pub fn new(provider: ProviderKind, base_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            provider,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.trim().is_empty()),
            client: reqwest::Client::new(),
        }
    }

    /// Client whose token comes from the provider's access token variable.
    pub fn from_env(provider: ProviderKind, base_url: impl Into<String>) -> Self {
        Self::new(provider, base_url, std::env::var(provider.token_env()).ok())
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    fn token(&self) -> Result<&str, BackendError> {
        self.token
            .as_deref()
            .ok_or_else(|| BackendError::MissingCredential {
                var: self.provider.token_env().to_string(),
            })
    }

    /// GET `path` (relative to the base URL) and decode the JSON body.
    pub async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value, BackendError> {
        let token = self.token()?;
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        debug!(provider = %self.provider, url = %url, "backend request");

        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {token}"))
            .query(query)
            .send()
            .await
            .map_err(|e| BackendError::Network {
                provider: self.provider.label().to_string(),
                message: if e.is_timeout() {
                    format!("timeout: {e}")
                } else {
                    format!("connection failed: {e}")
                },
            })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| BackendError::Network {
            provider: self.provider.label().to_string(),
            message: format!("failed to read response: {e}"),
        })?;

        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(BackendError::TokenRejected {
                provider: self.provider.label().to_string(),
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            return Err(BackendError::Api {
                provider: self.provider.label().to_string(),
                status: status.as_u16(),
                message: api_error_message(&text),
            });
        }

        serde_json::from_str(&text).map_err(|e| BackendError::Parse {
            provider: self.provider.label().to_string(),
            message: format!("invalid JSON: {e}"),
        })
    }
}

/// Pull `error.message` out of a Google or Graph error body.
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.chars().take(200).collect())
}
