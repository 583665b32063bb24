use std::time::Duration;

use reqwest::header::AUTHORIZATION;
use serde_json::Value;

use crate::error::{RelayError, Result};

/// Bearer-token HTTP client for the host automation instance. One underlying
/// client with a bounded timeout is built at construction and reused by every
/// handler invocation.
pub struct LocalApi {
    base_url: String,
    token: String,
    client: reqwest::Client,
}

impl LocalApi {
    pub fn new(
        base_url: impl Into<String>,
        token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let base_url: String = base_url.into();
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RelayError::Http(e.to_string()))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.into(),
            client,
        })
    }

    pub fn api_url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub fn webhook_url(&self, webhook_id: &str) -> String {
        format!("{}/api/webhook/{}", self.base_url, webhook_id)
    }

    /// An absolute `url` wins over `path`; a bare path resolves against the
    /// configured base URL.
    pub fn resolve(&self, url: Option<&str>, path: Option<&str>) -> Result<String> {
        if let Some(url) = url {
            if !url.trim().is_empty() {
                return Ok(url.trim().to_string());
            }
        }
        let path = path.unwrap_or("").trim();
        if path.is_empty() {
            return Err(RelayError::Http("missing url or path".to_string()));
        }
        Ok(self.api_url(path))
    }

    pub async fn get(&self, url: &str, query: &Value) -> Result<Value> {
        let mut request = self
            .client
            .get(url)
            .header(AUTHORIZATION, format!("Bearer {}", self.token));
        if let Some(map) = query.as_object() {
            let pairs: Vec<(String, String)> = map
                .iter()
                .map(|(k, v)| {
                    let value = v
                        .as_str()
                        .map(|s| s.to_string())
                        .unwrap_or_else(|| v.to_string());
                    (k.clone(), value)
                })
                .collect();
            if !pairs.is_empty() {
                request = request.query(&pairs);
            }
        }
        Self::decode(request.send().await).await
    }

    pub async fn post(&self, url: &str, body: &Value) -> Result<Value> {
        let request = self
            .client
            .post(url)
            .header(AUTHORIZATION, format!("Bearer {}", self.token))
            .json(body);
        Self::decode(request.send().await).await
    }

    async fn decode(result: reqwest::Result<reqwest::Response>) -> Result<Value> {
        let response = result.map_err(|e| RelayError::Http(e.to_string()))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| RelayError::Http(e.to_string()))?;
        if !status.is_success() {
            return Err(RelayError::Http(format!(
                "status {}: {}",
                status.as_u16(),
                text
            )));
        }
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| RelayError::Http(e.to_string()))
    }
}
