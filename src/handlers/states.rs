use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::interfaces::handlers::{Handler, ResponseMode};
use crate::local_api::LocalApi;

/// Returns the host's full state snapshot from `api/states`. Takes no
/// payload.
pub struct StatesHandler {
    api: Arc<LocalApi>,
}

impl StatesHandler {
    pub fn new(api: Arc<LocalApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl Handler for StatesHandler {
    fn name(&self) -> &str {
        "states"
    }

    fn response_mode(&self) -> ResponseMode {
        ResponseMode::Always
    }

    async fn handle(&self, _payload: Value) -> Result<Option<Value>> {
        let url = self.api.api_url("api/states");
        let body = self.api.get(&url, &Value::Null).await?;
        Ok(Some(body))
    }
}
