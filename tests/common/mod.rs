#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use hearth_relay::codec::DayCodec;
use hearth_relay::dispatcher::Dispatcher;
use hearth_relay::envelope::Envelope;
use hearth_relay::error::{RelayError, Result};
use hearth_relay::handlers::HandlerRegistry;
use hearth_relay::interfaces::handlers::{Handler, ResponseMode};
use hearth_relay::interfaces::transport::Publisher;

pub const SECRET: &str = "secret-token";

#[derive(Default)]
pub struct RecordingPublisher {
    published: Mutex<Vec<(String, Envelope)>>,
}

impl RecordingPublisher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub async fn published(&self) -> Vec<(String, Envelope)> {
        self.published.lock().await.clone()
    }
}

#[async_trait]
impl Publisher for RecordingPublisher {
    async fn publish(&self, topic: &str, envelope: &Envelope) {
        self.published
            .lock()
            .await
            .push((topic.to_string(), envelope.clone()));
    }
}

pub struct StaticHandler {
    name: String,
    mode: ResponseMode,
    reply: Option<Value>,
    calls: AtomicUsize,
}

impl StaticHandler {
    pub fn new(name: &str, mode: ResponseMode, reply: Option<Value>) -> Self {
        Self {
            name: name.to_string(),
            mode,
            reply,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Handler for StaticHandler {
    fn name(&self) -> &str {
        &self.name
    }

    fn response_mode(&self) -> ResponseMode {
        self.mode
    }

    async fn handle(&self, _payload: Value) -> Result<Option<Value>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.reply.clone())
    }
}

pub struct FailingHandler {
    name: String,
    mode: ResponseMode,
}

impl FailingHandler {
    pub fn new(name: &str, mode: ResponseMode) -> Self {
        Self {
            name: name.to_string(),
            mode,
        }
    }
}

#[async_trait]
impl Handler for FailingHandler {
    fn name(&self) -> &str {
        &self.name
    }

    fn response_mode(&self) -> ResponseMode {
        self.mode
    }

    async fn handle(&self, _payload: Value) -> Result<Option<Value>> {
        Err(RelayError::Http("boom".to_string()))
    }
}

pub async fn dispatcher_with(
    handlers: Vec<Arc<dyn Handler>>,
    publisher: Arc<RecordingPublisher>,
) -> Arc<Dispatcher> {
    let codec = Arc::new(DayCodec::new(SECRET));
    let registry = Arc::new(HandlerRegistry::new());
    for handler in handlers {
        registry.register(handler).await;
    }
    Arc::new(Dispatcher::new(codec, registry, publisher, 5, 10))
}

pub fn request_envelope(
    id: &str,
    time: i64,
    topic: Option<&str>,
    kind: &str,
    data: Value,
) -> Envelope {
    Envelope {
        id: id.to_string(),
        time,
        topic: topic.map(|t| t.to_string()),
        kind: kind.to_string(),
        data,
    }
}

/// Encrypts an envelope the way a remote client would.
pub fn seal(envelope: &Envelope) -> String {
    seal_text(&serde_json::to_string(envelope).unwrap())
}

pub fn seal_text(text: &str) -> String {
    DayCodec::new(SECRET).encrypt(text).unwrap()
}
