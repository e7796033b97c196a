//! `opsweave config` — Configuration management commands.

use opsweave_config::AppConfig;
use std::path::Path;

pub fn validate(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    println!("🔍 Validating configuration...");

    match super::load_config(config_path) {
        Ok(config) => {
            println!("   ✅ Config parsed and validated");

            let mut warnings = Vec::new();
            if !config.has_api_key() {
                warnings.push("No API key set (set OPSWEAVE_API_KEY or ANTHROPIC_API_KEY); running simulated");
            }
            if config.gateway.host == "0.0.0.0" {
                warnings.push("Gateway bound to 0.0.0.0; the API has no authentication");
            }
            for w in &warnings {
                println!("   ⚠️  {w}");
            }

            println!();
            println!("   Model:      {}", config.inference.model);
            println!("   Gateway:    {}:{}", config.gateway.host, config.gateway.port);
            println!(
                "   Intervals:  cycle {}s simulated / {}s live, broadcast {}ms",
                config.scheduler.simulated_interval_secs,
                config.scheduler.live_interval_secs,
                config.broadcast.interval_ms
            );
            println!(
                "   Dataset:    {} clients, {} servers, seed {}",
                config.dataset.clients,
                config.dataset.servers,
                config
                    .dataset
                    .seed
                    .map_or_else(|| "random".to_string(), |s| s.to_string())
            );
        }
        Err(e) => {
            println!("   ❌ Config error: {e}");
            return Err(e.into());
        }
    }

    Ok(())
}

pub fn show(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = super::load_config(config_path).map_err(|e| format!("Failed to load config: {e}"))?;
    if config.inference.api_key.is_some() {
        config.inference.api_key = Some("***".into());
    }
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

pub fn path(config_path: Option<&Path>) {
    println!("{}", super::config_path(config_path).display());
}

pub fn init() {
    print!("{}", AppConfig::default_toml());
}
