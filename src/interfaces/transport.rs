use async_trait::async_trait;

use crate::envelope::Envelope;

/// Outbound side of the relay. Publishing is fire-and-forget: a response that
/// cannot be delivered has no recipient to notify, so implementations log
/// failures instead of returning them.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, topic: &str, envelope: &Envelope);
}
