use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{RelayError, Result};
use crate::interfaces::handlers::{Handler, ResponseMode};
use crate::local_api::LocalApi;

/// Forwards a request to the local REST surface. Payload shape:
/// `{method, url?, path?, data}` where GET sends `data` as query parameters
/// and POST sends it as the JSON body.
pub struct RestHandler {
    api: Arc<LocalApi>,
}

impl RestHandler {
    pub fn new(api: Arc<LocalApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl Handler for RestHandler {
    fn name(&self) -> &str {
        "rest"
    }

    // The remote caller issued an explicit API call; it always gets the
    // outcome back, success or error-shaped.
    fn response_mode(&self) -> ResponseMode {
        ResponseMode::Always
    }

    async fn handle(&self, payload: Value) -> Result<Option<Value>> {
        let method = payload
            .get("method")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_lowercase();
        let url = self.api.resolve(
            payload.get("url").and_then(|v| v.as_str()),
            payload.get("path").and_then(|v| v.as_str()),
        )?;
        let data = payload.get("data").cloned().unwrap_or(Value::Null);
        let body = match method.as_str() {
            "get" => self.api.get(&url, &data).await?,
            "post" => self.api.post(&url, &data).await?,
            other => {
                return Err(RelayError::Runtime(format!(
                    "unsupported method '{other}'"
                )))
            }
        };
        Ok(Some(body))
    }
}
