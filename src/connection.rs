use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rumqttc::{AsyncClient, Event, EventLoop, Incoming, MqttOptions, QoS};
use tokio::sync::{mpsc, oneshot, watch, Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::codec::DayCodec;
use crate::config::BrokerConfig;
use crate::envelope::Envelope;
use crate::error::{RelayError, Result};
use crate::interfaces::transport::Publisher;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const INBOUND_CHANNEL_CAPACITY: usize = 256;

/// Owns the broker session. A spawned delivery loop polls the MQTT event
/// loop, forwards inbound publishes to the dispatcher channel, and exits on
/// the first connection error: there is no background retry. Reconnection is
/// demand-driven from `publish`, so an idle relay with a flaky broker never
/// busy-loops.
pub struct ConnectionManager {
    broker: BrokerConfig,
    topic: String,
    codec: Arc<DayCodec>,
    state_tx: watch::Sender<ConnectionState>,
    client: RwLock<Option<AsyncClient>>,
    inbound_tx: mpsc::Sender<String>,
    connect_lock: Mutex<()>,
}

impl ConnectionManager {
    /// Returns the manager plus the receiving end of the inbound message
    /// channel. The receiver survives reconnects; every delivery loop feeds
    /// the same channel.
    pub fn new(
        broker: BrokerConfig,
        topic: impl Into<String>,
        codec: Arc<DayCodec>,
    ) -> (Arc<Self>, mpsc::Receiver<String>) {
        let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_CHANNEL_CAPACITY);
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        let manager = Arc::new(Self {
            broker,
            topic: topic.into(),
            codec,
            state_tx,
            client: RwLock::new(None),
            inbound_tx,
            connect_lock: Mutex::new(()),
        });
        (manager, inbound_rx)
    }

    pub fn state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    /// Begins connecting, deferred until the one-shot host-ready signal fires
    /// when one is supplied. A dropped sender counts as ready so a host that
    /// skips the signal does not wedge the relay.
    pub fn start(self: &Arc<Self>, ready: Option<oneshot::Receiver<()>>) {
        let manager = self.clone();
        tokio::spawn(async move {
            if let Some(ready) = ready {
                let _ = ready.await;
            }
            if let Err(e) = manager.connect().await {
                warn!(error = %e, "initial broker connect failed");
            }
        });
    }

    /// Establishes the session and waits until the delivery loop has
    /// subscribed, bounded by a connect timeout. Safe to call concurrently;
    /// only one attempt runs at a time and an already-connected session is a
    /// no-op.
    pub async fn connect(&self) -> Result<()> {
        let _guard = self.connect_lock.lock().await;
        if self.state() == ConnectionState::Connected {
            return Ok(());
        }

        let mut options = MqttOptions::new(
            self.broker.client_id(),
            self.broker.host.as_str(),
            self.broker.port,
        );
        options.set_keep_alive(Duration::from_secs(self.broker.keep_alive_secs));

        let (client, eventloop) = AsyncClient::new(options, 64);
        self.state_tx.send_replace(ConnectionState::Connecting);
        *self.client.write().await = Some(client.clone());
        self.spawn_delivery_loop(client, eventloop);

        let mut state_rx = self.state_tx.subscribe();
        let settled = tokio::time::timeout(
            CONNECT_TIMEOUT,
            state_rx.wait_for(|state| *state != ConnectionState::Connecting),
        )
        .await;
        match settled {
            Ok(Ok(state)) if *state == ConnectionState::Connected => Ok(()),
            Ok(Ok(_)) => Err(RelayError::Transport(
                "broker session closed before subscribe".to_string(),
            )),
            Ok(Err(_)) => Err(RelayError::Transport(
                "connection state channel closed".to_string(),
            )),
            Err(_) => {
                self.state_tx.send_replace(ConnectionState::Disconnected);
                Err(RelayError::Transport("broker connect timed out".to_string()))
            }
        }
    }

    fn spawn_delivery_loop(&self, client: AsyncClient, mut eventloop: EventLoop) {
        let state_tx = self.state_tx.clone();
        let inbound_tx = self.inbound_tx.clone();
        let topic = self.topic.clone();
        tokio::spawn(async move {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Incoming(Incoming::ConnAck(_))) => {
                        // Subscribe with exactly-once delivery before
                        // reporting the session usable.
                        match client.subscribe(topic.as_str(), QoS::ExactlyOnce).await {
                            Ok(()) => {
                                info!(topic = %topic, "subscribed to inbound topic");
                                state_tx.send_replace(ConnectionState::Connected);
                            }
                            Err(e) => {
                                warn!(error = %e, topic = %topic, "subscribe failed");
                                state_tx.send_replace(ConnectionState::Disconnected);
                                return;
                            }
                        }
                    }
                    Ok(Event::Incoming(Incoming::Publish(publish))) => {
                        let payload = String::from_utf8_lossy(&publish.payload).to_string();
                        if inbound_tx.send(payload).await.is_err() {
                            debug!("inbound channel closed, stopping delivery loop");
                            state_tx.send_replace(ConnectionState::Disconnected);
                            return;
                        }
                    }
                    Ok(Event::Incoming(Incoming::Disconnect)) => {
                        info!("broker closed the session");
                        state_tx.send_replace(ConnectionState::Disconnected);
                        return;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!(error = %e, "broker connection lost");
                        state_tx.send_replace(ConnectionState::Disconnected);
                        return;
                    }
                }
            }
        });
    }

    /// Encrypts and publishes a response at at-least-once delivery. If the
    /// last observed state is not connected, the session is re-established
    /// first. Failures are logged, never raised: a response that cannot be
    /// published has no recipient to notify.
    pub async fn publish(&self, topic: &str, envelope: &Envelope) {
        if self.state() != ConnectionState::Connected {
            debug!(topic = %topic, "reconnecting before publish");
            if let Err(e) = self.connect().await {
                warn!(error = %e, topic = %topic, "reconnect failed, dropping response");
                return;
            }
        }
        let payload = match self.encode(envelope) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, id = %envelope.id, "failed to encode response");
                return;
            }
        };
        let client = self.client.read().await.clone();
        let Some(client) = client else {
            warn!(topic = %topic, "no broker session, dropping response");
            return;
        };
        if let Err(e) = client.publish(topic, QoS::AtLeastOnce, false, payload).await {
            warn!(error = %e, topic = %topic, "publish failed");
        }
    }

    /// Serialized, encrypted wire form of an envelope.
    pub fn encode(&self, envelope: &Envelope) -> Result<String> {
        let plaintext =
            serde_json::to_string(envelope).map_err(|e| RelayError::Serialization(e.to_string()))?;
        self.codec.encrypt(&plaintext)
    }

    /// Gracefully disconnects. Idempotent.
    pub async fn stop(&self) {
        let client = self.client.write().await.take();
        if let Some(client) = client {
            if let Err(e) = client.disconnect().await {
                debug!(error = %e, "disconnect");
            }
        }
        self.state_tx.send_replace(ConnectionState::Disconnected);
    }
}

#[async_trait]
impl Publisher for ConnectionManager {
    async fn publish(&self, topic: &str, envelope: &Envelope) {
        ConnectionManager::publish(self, topic, envelope).await;
    }
}
