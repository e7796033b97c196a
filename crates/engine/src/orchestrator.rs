//! The orchestrator interface and its simulated and live implementations.
//!
//! The scheduler, broadcaster and gateway only ever see
//! `Arc<dyn Orchestrator>`. Which implementation sits behind it is decided
//! once at startup by [`from_config`].

use async_trait::async_trait;
use opsweave_config::AppConfig;
use opsweave_core::{
    ActivityLogEntry, AgentState, Assignment, Decision, InferenceClient, MetricsSnapshot, Prediction,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::advisor::Advisor;
use crate::cycle::CycleRunner;
use crate::pipeline::{CycleReport, Pipeline};
use crate::store::StateStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Heuristic text only
    Simulated,
    /// Reasoning text from the hosted model
    Live,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Simulated => write!(f, "simulated"),
            Mode::Live => write!(f, "live"),
        }
    }
}

/// Runs cycles and answers queries over the state they produce.
///
/// The query methods have default implementations over [`Orchestrator::store`];
/// every one of them returns owned copies and never mutates.
#[async_trait]
pub trait Orchestrator: Send + Sync {
    fn mode(&self) -> Mode;

    /// Period between cycle starts.
    fn cycle_interval(&self) -> Duration;

    fn store(&self) -> &StateStore;

    async fn run_cycle(&self) -> CycleReport;

    fn last_cycle(&self) -> Option<CycleReport>;

    fn agent_statuses(&self) -> Vec<AgentState> {
        self.store().agents()
    }

    fn agent(&self, id: &str) -> Option<AgentState> {
        self.store().agent(id)
    }

    fn latest_decision(&self) -> Option<Decision> {
        self.store().latest_decision()
    }

    fn recent_decisions(&self, limit: usize) -> Vec<Decision> {
        self.store().recent_decisions(limit)
    }

    fn decision(&self, id: &str) -> Option<Decision> {
        self.store().decision(id)
    }

    fn predictions(&self, limit: usize) -> Vec<Prediction> {
        self.store().predictions(limit)
    }

    fn metrics(&self) -> MetricsSnapshot {
        self.store().metrics()
    }

    fn activity(&self, limit: usize) -> Vec<ActivityLogEntry> {
        self.store().activity(limit)
    }

    fn activity_total(&self) -> usize {
        self.store().activity_len()
    }

    fn assignments(&self, limit: usize) -> Vec<Assignment> {
        self.store().assignments(limit)
    }
}

/// Heuristic reasoning, short cycle period.
pub struct SimulatedOrchestrator {
    runner: CycleRunner,
    interval: Duration,
}

impl SimulatedOrchestrator {
    pub fn new(store: Arc<StateStore>, config: &AppConfig) -> Self {
        let runner = CycleRunner::new(
            store,
            config.simulation.clone(),
            Advisor::simulated(),
            config.dataset.seed,
        );
        Self {
            runner,
            interval: Duration::from_secs(config.scheduler.simulated_interval_secs),
        }
    }

    pub fn with_pipeline(mut self, pipeline: Pipeline) -> Self {
        self.runner = self.runner.with_pipeline(pipeline);
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

#[async_trait]
impl Orchestrator for SimulatedOrchestrator {
    fn mode(&self) -> Mode {
        Mode::Simulated
    }

    fn cycle_interval(&self) -> Duration {
        self.interval
    }

    fn store(&self) -> &StateStore {
        self.runner.store()
    }

    async fn run_cycle(&self) -> CycleReport {
        self.runner.run_cycle().await
    }

    fn last_cycle(&self) -> Option<CycleReport> {
        self.runner.last_cycle()
    }
}

/// Reasoning from the hosted model, longer cycle period to stay inside
/// API rate limits.
pub struct LiveOrchestrator {
    runner: CycleRunner,
    interval: Duration,
}

impl LiveOrchestrator {
    pub fn new(store: Arc<StateStore>, config: &AppConfig, client: Arc<dyn InferenceClient>) -> Self {
        let advisor = Advisor::live(client)
            .with_sampling(config.inference.temperature, config.inference.max_tokens);
        let runner = CycleRunner::new(store, config.simulation.clone(), advisor, config.dataset.seed);
        Self {
            runner,
            interval: Duration::from_secs(config.scheduler.live_interval_secs),
        }
    }

    pub fn with_pipeline(mut self, pipeline: Pipeline) -> Self {
        self.runner = self.runner.with_pipeline(pipeline);
        self
    }

    pub fn client_name(&self) -> Option<&str> {
        self.runner.advisor().client_name()
    }
}

#[async_trait]
impl Orchestrator for LiveOrchestrator {
    fn mode(&self) -> Mode {
        Mode::Live
    }

    fn cycle_interval(&self) -> Duration {
        self.interval
    }

    fn store(&self) -> &StateStore {
        self.runner.store()
    }

    async fn run_cycle(&self) -> CycleReport {
        self.runner.run_cycle().await
    }

    fn last_cycle(&self) -> Option<CycleReport> {
        self.runner.last_cycle()
    }
}

/// Live when an inference client is available, simulated otherwise.
pub fn from_config(
    config: &AppConfig,
    store: Arc<StateStore>,
    client: Option<Arc<dyn InferenceClient>>,
) -> Arc<dyn Orchestrator> {
    match client {
        Some(client) => {
            info!(client = %client.name(), model = %config.inference.model, "Live inference orchestrator selected");
            Arc::new(LiveOrchestrator::new(store, config, client))
        }
        None => {
            info!("No inference credentials, simulated orchestrator selected");
            Arc::new(SimulatedOrchestrator::new(store, config))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FixedClient, five_servers, store_with};
    use opsweave_config::StepGates;

    fn config() -> AppConfig {
        let mut config = AppConfig::default();
        config.simulation.gates = StepGates::always();
        config.dataset.seed = Some(9);
        config
    }

    #[test]
    fn selection_follows_credentials() {
        let config = config();
        let sim = from_config(&config, Arc::new(store_with(five_servers())), None);
        assert_eq!(sim.mode(), Mode::Simulated);
        assert_eq!(sim.cycle_interval(), Duration::from_secs(5));

        let client: Arc<dyn InferenceClient> = Arc::new(FixedClient::new("ok"));
        let live = from_config(&config, Arc::new(store_with(five_servers())), Some(client));
        assert_eq!(live.mode(), Mode::Live);
        assert_eq!(live.cycle_interval(), Duration::from_secs(30));
    }

    #[tokio::test]
    async fn live_cycle_accounts_inference() {
        let client = Arc::new(FixedClient::new("Replace the fan tray."));
        let orch = LiveOrchestrator::new(Arc::new(store_with(five_servers())), &config(), client.clone());
        orch.run_cycle().await;

        let stats = orch.metrics().inference;
        assert!(stats.calls >= 2);
        assert_eq!(stats.fallbacks, 0);
        assert_eq!(u64::from(client.calls.load(std::sync::atomic::Ordering::SeqCst)), stats.calls);
        assert_eq!(orch.latest_decision().unwrap().ai_reasoning, "Replace the fan tray.");
    }

    #[tokio::test]
    async fn simulated_cycle_has_zero_inference_counters() {
        let orch = SimulatedOrchestrator::new(Arc::new(store_with(five_servers())), &config());
        orch.run_cycle().await;
        assert_eq!(orch.metrics().inference.calls, 0);
        assert!(orch.last_cycle().is_some());
    }

    #[tokio::test]
    async fn metrics_are_idempotent_between_cycles() {
        let orch = SimulatedOrchestrator::new(Arc::new(store_with(five_servers())), &config());
        orch.run_cycle().await;
        assert_eq!(orch.metrics(), orch.metrics());
        assert_eq!(orch.agent_statuses(), orch.agent_statuses());
    }
}
