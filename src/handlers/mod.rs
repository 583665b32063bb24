use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::interfaces::handlers::Handler;
use crate::local_api::LocalApi;

pub mod registration;
pub mod rest;
pub mod service;
pub mod states;
pub mod webhook;

/// Command-kind to handler mapping. Open registry: callers can add their own
/// kinds next to the built-ins.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: RwLock<HashMap<String, Arc<dyn Handler>>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
        }
    }

    /// Registry preloaded with the built-in command kinds, all talking to the
    /// same local HTTP surface.
    pub async fn with_builtins(api: Arc<LocalApi>) -> Self {
        let registry = Self::new();
        registry
            .register(Arc::new(rest::RestHandler::new(api.clone())))
            .await;
        registry
            .register(Arc::new(webhook::WebhookHandler::new(api.clone())))
            .await;
        registry
            .register(Arc::new(registration::RegistrationHandler::new(api.clone())))
            .await;
        registry
            .register(Arc::new(service::ServiceHandler::new(api.clone())))
            .await;
        registry
            .register(Arc::new(states::StatesHandler::new(api)))
            .await;
        registry
    }

    /// Returns false without replacing when the kind is already taken.
    pub async fn register(&self, handler: Arc<dyn Handler>) -> bool {
        let mut handlers = self.handlers.write().await;
        let name = handler.name().to_string();
        if handlers.contains_key(&name) {
            return false;
        }
        handlers.insert(name, handler);
        true
    }

    pub async fn get(&self, kind: &str) -> Option<Arc<dyn Handler>> {
        self.handlers.read().await.get(kind).cloned()
    }

    pub async fn list(&self) -> Vec<String> {
        let mut kinds: Vec<String> = self.handlers.read().await.keys().cloned().collect();
        kinds.sort();
        kinds
    }
}
