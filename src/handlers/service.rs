use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::error::{RelayError, Result};
use crate::interfaces::handlers::{Handler, ResponseMode};
use crate::local_api::LocalApi;

/// Invokes a named service on the host: `{domain, service, data}` posted to
/// `api/services/{domain}/{service}`. Treated as fire-and-forget unless the
/// host reports state changes.
pub struct ServiceHandler {
    api: Arc<LocalApi>,
}

impl ServiceHandler {
    pub fn new(api: Arc<LocalApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl Handler for ServiceHandler {
    fn name(&self) -> &str {
        "call_service"
    }

    fn response_mode(&self) -> ResponseMode {
        ResponseMode::WhenResult
    }

    async fn handle(&self, payload: Value) -> Result<Option<Value>> {
        let domain = payload
            .get("domain")
            .and_then(|v| v.as_str())
            .ok_or_else(|| RelayError::Runtime("missing domain".to_string()))?;
        let service = payload
            .get("service")
            .and_then(|v| v.as_str())
            .ok_or_else(|| RelayError::Runtime("missing service".to_string()))?;
        let data = payload.get("data").cloned().unwrap_or_else(|| json!({}));
        let url = self.api.api_url(&format!("api/services/{domain}/{service}"));
        let body = self.api.post(&url, &data).await?;
        Ok(if body.is_null() { None } else { Some(body) })
    }
}
