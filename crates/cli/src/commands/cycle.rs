//! `opsweave cycle` — Run agent cycles offline and print the results.

use opsweave_config::AppConfig;
use opsweave_core::MetricsSnapshot;
use opsweave_engine::{CycleReport, Orchestrator, SimulatedOrchestrator, StateStore};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub struct CycleSummary {
    pub cycles: Vec<CycleReport>,
    pub metrics: MetricsSnapshot,
}

pub async fn run(
    config_path: Option<&Path>,
    count: u32,
    seed: Option<u64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = super::load_config(config_path).map_err(|e| format!("Failed to load config: {e}"))?;
    if seed.is_some() {
        config.dataset.seed = seed;
    }

    let summary = run_cycles(&config, count).await?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

/// Always simulated: offline runs never spend inference credits.
pub async fn run_cycles(config: &AppConfig, count: u32) -> Result<CycleSummary, Box<dyn std::error::Error>> {
    let data = opsweave_dataset::generate(&config.dataset)?;
    let store = Arc::new(StateStore::new(Arc::new(data)));
    let orchestrator = SimulatedOrchestrator::new(store, config);

    let mut cycles = Vec::with_capacity(count as usize);
    for _ in 0..count {
        cycles.push(orchestrator.run_cycle().await);
    }
    Ok(CycleSummary {
        cycles,
        metrics: orchestrator.metrics(),
    })
}
