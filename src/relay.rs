use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};

use crate::codec::DayCodec;
use crate::config::Config;
use crate::connection::ConnectionManager;
use crate::dispatcher::Dispatcher;
use crate::error::Result;
use crate::handlers::HandlerRegistry;
use crate::interfaces::handlers::Handler;
use crate::local_api::LocalApi;

/// The assembled relay: codec, handler registry, broker connection, and
/// dispatcher wired together from a config.
pub struct Relay {
    connection: Arc<ConnectionManager>,
    dispatcher: Arc<Dispatcher>,
    registry: Arc<HandlerRegistry>,
    inbound: Option<mpsc::Receiver<String>>,
}

impl Relay {
    pub async fn from_config(config: Config) -> Result<Self> {
        let codec = Arc::new(DayCodec::new(config.token.clone()));
        let api = Arc::new(LocalApi::new(
            config.local.base_url.clone(),
            config.token.clone(),
            Duration::from_secs(config.local.timeout_secs),
        )?);
        let registry = Arc::new(HandlerRegistry::with_builtins(api).await);
        let (connection, inbound) =
            ConnectionManager::new(config.broker.clone(), config.topic.clone(), codec.clone());
        let dispatcher = Arc::new(Dispatcher::new(
            codec,
            registry.clone(),
            connection.clone(),
            config.freshness_window_secs,
            config.dedup_window_secs,
        ));
        Ok(Self {
            connection,
            dispatcher,
            registry,
            inbound: Some(inbound),
        })
    }

    /// Adds a custom command kind next to the built-ins. Returns false when
    /// the kind is already registered.
    pub async fn register_handler(&self, handler: Arc<dyn Handler>) -> bool {
        self.registry.register(handler).await
    }

    /// Spawns the dispatch loop and begins connecting, gated on the host
    /// ready signal when one is supplied. Subsequent calls only retrigger the
    /// connection side.
    pub fn start(&mut self, ready: Option<oneshot::Receiver<()>>) {
        if let Some(inbound) = self.inbound.take() {
            tokio::spawn(self.dispatcher.clone().run(inbound));
        }
        self.connection.start(ready);
    }

    pub async fn stop(&self) {
        self.connection.stop().await;
    }

    pub fn connection(&self) -> &Arc<ConnectionManager> {
        &self.connection
    }
}
