//! `opsweave doctor` — Diagnose configuration and credentials.

use std::path::Path;

pub async fn run(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    println!("🩺 OpsWeave Doctor — System Diagnostics");
    println!("=======================================\n");

    let mut issues = 0;

    let path = super::config_path(config_path);
    if path.exists() {
        println!("  ✅ Config file found at {}", path.display());
    } else {
        println!("  ⚠️  No config file at {} — defaults apply", path.display());
    }

    match super::load_config(config_path) {
        Ok(config) => {
            println!("  ✅ Configuration valid");

            if config.has_api_key() {
                println!("  ✅ Inference key configured — live mode ({})", config.inference.model);
                match opsweave_providers::build_client(&config.inference) {
                    Ok(client) => println!("  ✅ Inference client ready: {}", client.name()),
                    Err(e) => {
                        println!("  ❌ Inference client failed: {e}");
                        issues += 1;
                    }
                }
            } else {
                println!("  ⚠️  No inference key — simulated mode (set OPSWEAVE_API_KEY or ANTHROPIC_API_KEY)");
            }

            match opsweave_dataset::generate(&config.dataset) {
                Ok(data) => println!(
                    "  ✅ Dataset: {} clients, {} servers, {} at risk",
                    data.clients.len(),
                    data.servers.len(),
                    data.at_risk_servers(config.simulation.risk_threshold).len()
                ),
                Err(e) => {
                    println!("  ❌ Dataset generation failed: {e}");
                    issues += 1;
                }
            }
        }
        Err(e) => {
            println!("  ❌ Configuration invalid: {e}");
            issues += 1;
        }
    }

    // Summary
    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
