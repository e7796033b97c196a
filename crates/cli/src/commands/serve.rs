//! `opsweave serve` — Start the agent runtime and HTTP gateway.

use std::path::Path;
use tracing::{info, warn};

pub async fn run(
    config_path: Option<&Path>,
    port_override: Option<u16>,
    host_override: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = super::load_config(config_path).map_err(|e| format!("Failed to load config: {e}"))?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }
    if let Some(host) = host_override {
        config.gateway.host = host;
    }

    let mode = if config.has_api_key() { "live" } else { "simulated" };
    println!("🛰  OpsWeave");
    println!("   Listening: {}:{}", config.gateway.host, config.gateway.port);
    println!("   Mode:      {mode}");
    println!("   Dataset:   {} clients, {} servers", config.dataset.clients, config.dataset.servers);

    let shutdown = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Ctrl-C received, shutting down"),
            Err(e) => {
                warn!(error = %e, "Failed to listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        }
    };
    opsweave_gateway::start(config, shutdown).await?;

    Ok(())
}
