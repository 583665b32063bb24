use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{RelayError, Result};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BrokerConfig {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default = "default_keep_alive")]
    pub keep_alive_secs: u64,
}

impl BrokerConfig {
    /// Configured client id, or a fresh per-process one so two relays on the
    /// same broker never evict each other's session.
    pub fn client_id(&self) -> String {
        self.client_id
            .clone()
            .unwrap_or_else(|| format!("hearth-relay-{}", uuid::Uuid::new_v4()))
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LocalApiConfig {
    pub base_url: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub broker: BrokerConfig,
    /// Bearer credential for the local HTTP surface; also the codec secret.
    pub token: String,
    /// This instance's private inbound topic.
    pub topic: String,
    pub local: LocalApiConfig,
    #[serde(default = "default_freshness")]
    pub freshness_window_secs: i64,
    #[serde(default = "default_dedup")]
    pub dedup_window_secs: i64,
}

fn default_port() -> u16 {
    1883
}

fn default_keep_alive() -> u64 {
    60
}

fn default_timeout() -> u64 {
    10
}

fn default_freshness() -> i64 {
    5
}

fn default_dedup() -> i64 {
    10
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content =
            fs::read_to_string(path.as_ref()).map_err(|e| RelayError::Config(e.to_string()))?;
        let config: Config =
            serde_json::from_str(&content).map_err(|e| RelayError::Config(e.to_string()))?;
        Ok(config)
    }
}
