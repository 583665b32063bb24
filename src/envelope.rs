use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The unit exchanged in both directions. Requests carry a reply-to `topic`;
/// responses echo the request `id` and `type` and omit `topic`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub id: String,
    /// Sender-set seconds since epoch, used for the freshness check.
    pub time: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: Value,
}

impl Envelope {
    /// Builds the response to this request: same `id` and `type`, fresh
    /// timestamp, no reply-to topic.
    pub fn response(&self, data: Value) -> Envelope {
        Envelope {
            id: self.id.clone(),
            time: unix_now(),
            topic: None,
            kind: self.kind.clone(),
            data,
        }
    }
}

pub fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
