use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::path::looks_like_url;
use crate::{AssetConfig, AssetError, AssetResult, StorageKey};

/// Mints time-limited read URLs.
///
/// Every call is exactly one round trip to the backing service. Implementations
/// must not retry; failures go straight back to the caller, which decides what
/// to do with them.
#[async_trait]
pub trait UrlSigner: Send + Sync {
    /// Generate a signed URL for reading `key`, valid for `expires_in_secs`
    async fn sign_get(&self, key: &StorageKey, expires_in_secs: u64) -> AssetResult<String>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SignRequest {
    expires_in: u64,
}

#[derive(Debug, Deserialize)]
struct SignResponse {
    #[serde(rename = "signedURL", alias = "signedUrl")]
    signed_url: Option<String>,
}

/// Signer for storage services exposing `POST /object/sign/{bucket}/{key}`
#[derive(Debug, Clone)]
pub struct HttpUrlSigner {
    client: reqwest::Client,
    config: AssetConfig,
    base: String,
}

impl HttpUrlSigner {
    /// Create a signer with a default HTTP client
    pub fn new(config: AssetConfig) -> AssetResult<Self> {
        Self::with_client(reqwest::Client::new(), config)
    }

    /// Create a signer with a caller-supplied client (timeouts, proxies, TLS)
    pub fn with_client(client: reqwest::Client, config: AssetConfig) -> AssetResult<Self> {
        config.validate()?;
        let base = config
            .storage_url
            .clone()
            .ok_or_else(|| AssetError::config("HttpUrlSigner requires storage_url"))?;
        Ok(Self { client, config, base })
    }

    /// Turn a possibly relative `signedURL` into an absolute one
    fn absolute(&self, signed: &str) -> String {
        if looks_like_url(signed) {
            signed.to_string()
        } else {
            format!("{}/{}", self.base.trim_end_matches('/'), signed.trim_start_matches('/'))
        }
    }

    fn error_message(body: &str) -> String {
        if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
            for field in ["message", "error", "msg"] {
                if let Some(text) = value.get(field).and_then(|v| v.as_str()) {
                    return text.to_string();
                }
            }
        }
        let trimmed = body.trim();
        if trimmed.is_empty() {
            "no response body".to_string()
        } else {
            trimmed.chars().take(200).collect()
        }
    }
}

#[async_trait]
impl UrlSigner for HttpUrlSigner {
    async fn sign_get(&self, key: &StorageKey, expires_in_secs: u64) -> AssetResult<String> {
        let endpoint = self.config.sign_endpoint(key)?;
        debug!(key = %key, expires_in_secs, "signing asset url");

        let mut request = self.client.post(&endpoint).json(&SignRequest {
            expires_in: expires_in_secs,
        });
        if let Some(token) = &self.config.access_token {
            request = request.bearer_auth(token);
        }
        if let Some(api_key) = &self.config.api_key {
            request = request.header("apikey", api_key);
        }

        let response = request.send().await.map_err(AssetError::transport)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AssetError::authorization(status.as_u16(), Self::error_message(&body)));
        }

        let body: SignResponse = response
            .json()
            .await
            .map_err(|e| AssetError::invalid_response(e.to_string()))?;

        match body.signed_url {
            Some(url) if !url.trim().is_empty() => Ok(self.absolute(url.trim())),
            _ => Err(AssetError::invalid_response("response has no signedURL")),
        }
    }
}
