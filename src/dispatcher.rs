use std::sync::{Arc, Mutex};

use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::codec::DayCodec;
use crate::dedup::DedupCache;
use crate::envelope::{unix_now, Envelope};
use crate::handlers::HandlerRegistry;
use crate::interfaces::handlers::ResponseMode;
use crate::interfaces::transport::Publisher;

/// Routes each inbound broker message: decrypt, validate freshness and
/// novelty, dispatch to the matching handler on its own task, publish the
/// response per the handler's policy. A malformed or malicious message is
/// dropped, never an error out of this type.
pub struct Dispatcher {
    codec: Arc<DayCodec>,
    registry: Arc<HandlerRegistry>,
    publisher: Arc<dyn Publisher>,
    cache: Mutex<DedupCache>,
    freshness_window_secs: i64,
}

impl Dispatcher {
    pub fn new(
        codec: Arc<DayCodec>,
        registry: Arc<HandlerRegistry>,
        publisher: Arc<dyn Publisher>,
        freshness_window_secs: i64,
        dedup_window_secs: i64,
    ) -> Self {
        Self {
            codec,
            registry,
            publisher,
            cache: Mutex::new(DedupCache::new(dedup_window_secs)),
            freshness_window_secs,
        }
    }

    /// Consumes the inbound channel until the connection side drops it.
    pub async fn run(self: Arc<Self>, mut inbound: mpsc::Receiver<String>) {
        while let Some(raw) = inbound.recv().await {
            self.handle_raw(&raw);
        }
    }

    /// Accepts or drops one raw message; an accepted envelope is dispatched
    /// on its own task so a slow handler never blocks intake. Returns the
    /// task handle for the spawned dispatch, if any.
    pub fn handle_raw(self: &Arc<Self>, raw: &str) -> Option<JoinHandle<()>> {
        let envelope = self.accept(raw, unix_now())?;
        let dispatcher = self.clone();
        Some(tokio::spawn(async move {
            dispatcher.dispatch(envelope).await;
        }))
    }

    /// The intake gate: decrypt, parse, sweep the dedup cache, enforce
    /// freshness, reject duplicates, record the id. `now` is explicit so the
    /// time-window behavior is testable.
    pub fn accept(&self, raw: &str, now: i64) -> Option<Envelope> {
        let plaintext = match self.codec.decrypt(raw) {
            Ok(plaintext) => plaintext,
            Err(e) => {
                debug!(error = %e, "dropping undecryptable message");
                return None;
            }
        };
        let envelope: Envelope = match serde_json::from_str(&plaintext) {
            Ok(envelope) => envelope,
            Err(e) => {
                debug!(error = %e, "dropping malformed envelope");
                return None;
            }
        };

        let mut cache = self
            .cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        cache.sweep(now);
        if now - envelope.time > self.freshness_window_secs {
            info!(id = %envelope.id, age_secs = now - envelope.time, "dropping expired envelope");
            return None;
        }
        if cache.contains(&envelope.id) {
            info!(id = %envelope.id, "dropping duplicate envelope");
            return None;
        }
        cache.insert(envelope.id.clone(), now);
        Some(envelope)
    }

    async fn dispatch(&self, envelope: Envelope) {
        let Some(handler) = self.registry.get(&envelope.kind).await else {
            debug!(kind = %envelope.kind, id = %envelope.id, "no handler for command kind");
            return;
        };

        let data = match handler.handle(envelope.data.clone()).await {
            Ok(Some(data)) => Some(data),
            Ok(None) => match handler.response_mode() {
                ResponseMode::Always => Some(Value::Null),
                ResponseMode::WhenResult => None,
            },
            Err(e) => {
                warn!(kind = %envelope.kind, id = %envelope.id, error = %e, "handler failed");
                match handler.response_mode() {
                    ResponseMode::Always => Some(json!({ "error": e.to_string() })),
                    ResponseMode::WhenResult => None,
                }
            }
        };
        let Some(data) = data else { return };
        let Some(reply_to) = envelope.topic.as_deref() else {
            debug!(id = %envelope.id, "request carries no reply topic, not responding");
            return;
        };
        let response = envelope.response(data);
        self.publisher.publish(reply_to, &response).await;
    }
}
