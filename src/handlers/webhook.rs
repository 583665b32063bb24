use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::error::{RelayError, Result};
use crate::interfaces::handlers::{Handler, ResponseMode};
use crate::local_api::LocalApi;

/// Forwards `{webhook_id, data}` to the host's webhook endpoint. Webhooks are
/// often fire-and-forget; a response is only published when the endpoint
/// returned a body.
pub struct WebhookHandler {
    api: Arc<LocalApi>,
}

impl WebhookHandler {
    pub fn new(api: Arc<LocalApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl Handler for WebhookHandler {
    fn name(&self) -> &str {
        "webhook"
    }

    fn response_mode(&self) -> ResponseMode {
        ResponseMode::WhenResult
    }

    async fn handle(&self, payload: Value) -> Result<Option<Value>> {
        let webhook_id = payload
            .get("webhook_id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| RelayError::Runtime("missing webhook_id".to_string()))?;
        let url = self.api.webhook_url(webhook_id);
        let data = payload.get("data").cloned().unwrap_or_else(|| json!({}));
        let body = self.api.post(&url, &data).await?;
        Ok(if body.is_null() { None } else { Some(body) })
    }
}
