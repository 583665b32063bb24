use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

/// Whether a response envelope is published when a handler yields no result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseMode {
    /// Always publish: null data when there is no result, an error-shaped
    /// payload when the handler fails, so the remote caller observes the
    /// outcome either way.
    Always,
    /// Publish only when the handler produced a result; failures and empty
    /// outcomes are logged locally and answered with silence.
    WhenResult,
}

/// A pluggable command action. Implementations perform at most one outbound
/// call to the local HTTP surface and must not retry internally.
#[async_trait]
pub trait Handler: Send + Sync {
    /// The command kind this handler answers to (the envelope `type` field).
    fn name(&self) -> &str;

    fn response_mode(&self) -> ResponseMode {
        ResponseMode::WhenResult
    }

    async fn handle(&self, payload: Value) -> Result<Option<Value>>;
}
