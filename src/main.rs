use clap::Parser;
use tokio::signal;
use tracing_subscriber::EnvFilter;

use hearth_relay::config::Config;
use hearth_relay::error::{RelayError, Result};
use hearth_relay::relay::Relay;

#[derive(Parser, Debug)]
#[command(name = "hearth-relay")]
#[command(about = "Encrypted MQTT command relay for a private home-automation instance")]
struct Cli {
    #[arg(long, default_value = "./relay.json")]
    config: String,

    #[arg(long, env = "HEARTH_RELAY_TOKEN", help = "Overrides the config token")]
    token: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,hearth_relay=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let mut config = Config::from_file(&cli.config)?;
    if let Some(token) = cli.token {
        config.token = token;
    }

    let mut relay = Relay::from_config(config).await?;
    // Standalone process: networking is already up, no ready gate needed.
    relay.start(None);

    signal::ctrl_c()
        .await
        .map_err(|e| RelayError::Runtime(e.to_string()))?;
    relay.stop().await;
    Ok(())
}
