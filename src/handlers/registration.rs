use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::error::Result;
use crate::interfaces::handlers::{Handler, ResponseMode};
use crate::local_api::LocalApi;

/// Posts `{data}` to the fixed device-registration endpoint. The registering
/// client needs the returned webhook credentials, so the outcome is always
/// published back.
pub struct RegistrationHandler {
    api: Arc<LocalApi>,
}

impl RegistrationHandler {
    pub fn new(api: Arc<LocalApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl Handler for RegistrationHandler {
    fn name(&self) -> &str {
        "registrations"
    }

    fn response_mode(&self) -> ResponseMode {
        ResponseMode::Always
    }

    async fn handle(&self, payload: Value) -> Result<Option<Value>> {
        let url = self.api.api_url("mobile_app/registrations");
        let data = payload.get("data").cloned().unwrap_or_else(|| json!({}));
        let body = self.api.post(&url, &data).await?;
        Ok(Some(body))
    }
}
