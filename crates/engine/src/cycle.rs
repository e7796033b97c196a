//! Runs one cycle against the store and keeps the running totals.

use opsweave_config::SimulationConfig;
use opsweave_core::{ActivityLevel, AgentRole, AgentStatus};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use tracing::info;

use crate::advisor::Advisor;
use crate::pipeline::{CycleReport, Pipeline};
use crate::steps::{CycleContext, StepEnv};
use crate::store::StateStore;

/// Shared machinery behind both orchestrator flavours.
pub struct CycleRunner {
    store: Arc<StateStore>,
    sim: SimulationConfig,
    advisor: Advisor,
    pipeline: Pipeline,
    rng: Mutex<StdRng>,
    cycles: AtomicU64,
    last: RwLock<Option<CycleReport>>,
}

impl CycleRunner {
    pub fn new(store: Arc<StateStore>, sim: SimulationConfig, advisor: Advisor, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            store,
            sim,
            advisor,
            pipeline: Pipeline::standard(),
            rng: Mutex::new(rng),
            cycles: AtomicU64::new(0),
            last: RwLock::new(None),
        }
    }

    pub fn with_pipeline(mut self, pipeline: Pipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    pub fn store(&self) -> &Arc<StateStore> {
        &self.store
    }

    pub fn advisor(&self) -> &Advisor {
        &self.advisor
    }

    pub fn cycles_run(&self) -> u64 {
        self.cycles.load(Ordering::Relaxed)
    }

    pub fn last_cycle(&self) -> Option<CycleReport> {
        self.last.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Execute one cycle end to end and return its report.
    pub async fn run_cycle(&self) -> CycleReport {
        let n = self.cycles.fetch_add(1, Ordering::Relaxed) + 1;
        let cycle_id = format!("CYCLE-{n:05}");

        // Each cycle owns its rng so no lock is held across the steps' awaits.
        let rng = {
            let mut master = self.rng.lock().unwrap_or_else(|e| e.into_inner());
            StdRng::from_rng(&mut *master)
        };
        let mut cx = CycleContext::new(cycle_id.clone(), rng);

        self.store.log_activity(
            AgentRole::Orchestrator.display_name(),
            "Cycle Coordination",
            format!(
                "Orchestrating agent cycle {cycle_id} - Managing {} autonomous agents",
                AgentRole::ALL.len()
            ),
            ActivityLevel::Info,
        );
        self.store
            .update_agent(AgentRole::Orchestrator, |a| a.status = AgentStatus::Active);

        let env = StepEnv {
            store: &self.store,
            sim: &self.sim,
            advisor: &self.advisor,
        };
        let report = self.pipeline.run(&env, &self.sim.gates, &mut cx).await;

        self.update_metrics(&mut cx);
        self.store.update_agent(AgentRole::Orchestrator, |a| {
            a.tasks_completed += 1;
            a.current_task = format!("Coordinated {cycle_id}");
            a.last_active = Some(chrono::Utc::now());
        });

        info!(
            cycle_id = %cycle_id,
            executed = report.agents_executed.len(),
            skipped = report.skipped.len(),
            status = ?report.status,
            "Cycle completed"
        );
        *self.last.write().unwrap_or_else(|e| e.into_inner()) = Some(report.clone());
        report
    }

    fn update_metrics(&self, cx: &mut CycleContext) {
        let drift = self.sim.accuracy_drift;
        let delta = cx.rng.random_range(drift.min..=drift.max);
        self.store.drift_accuracy(delta, self.sim.accuracy_cap);

        if cx.chance(self.sim.incident_walk_chance) {
            let step = if cx.rng.random_bool(0.5) { 1 } else { -1 };
            self.store.walk_incidents(step);
        }

        let accuracy = self.store.metrics().prediction_accuracy;
        self.store.update_agent(AgentRole::Monitoring, |a| {
            a.accuracy_percent = (accuracy * 10.0).round() / 10.0;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{five_servers, store_with};
    use opsweave_config::StepGates;

    fn runner(seed: u64) -> CycleRunner {
        let sim = SimulationConfig {
            gates: StepGates::always(),
            ..SimulationConfig::default()
        };
        CycleRunner::new(Arc::new(store_with(five_servers())), sim, Advisor::simulated(), Some(seed))
    }

    #[tokio::test]
    async fn cycle_ids_are_sequential() {
        let runner = runner(1);
        assert_eq!(runner.run_cycle().await.cycle_id, "CYCLE-00001");
        assert_eq!(runner.run_cycle().await.cycle_id, "CYCLE-00002");
        assert_eq!(runner.cycles_run(), 2);
        assert_eq!(runner.last_cycle().unwrap().cycle_id, "CYCLE-00002");
    }

    #[tokio::test]
    async fn logs_coordination_and_counts_orchestrator_tasks() {
        let runner = runner(2);
        runner.run_cycle().await;

        let feed = runner.store().activity(200);
        let coordination = feed
            .iter()
            .find(|e| e.action == "Cycle Coordination")
            .unwrap();
        assert_eq!(
            coordination.details,
            "Orchestrating agent cycle CYCLE-00001 - Managing 8 autonomous agents"
        );
        let orchestrator = runner.store().agent("agent-orchestrator-001").unwrap();
        assert_eq!(orchestrator.tasks_completed, 1);
        assert_eq!(orchestrator.status, AgentStatus::Active);
    }

    #[tokio::test]
    async fn accuracy_stays_under_cap() {
        let runner = runner(3);
        for _ in 0..100 {
            runner.run_cycle().await;
        }
        let metrics = runner.store().metrics();
        assert!(metrics.prediction_accuracy <= 95.0);
    }

    #[tokio::test]
    async fn same_seed_same_story() {
        let a = runner(42);
        let b = runner(42);
        for _ in 0..5 {
            let ra = a.run_cycle().await;
            let rb = b.run_cycle().await;
            assert_eq!(ra.agents_executed, rb.agents_executed);
        }
        assert_eq!(a.store().metrics().total_decisions, b.store().metrics().total_decisions);
    }
}
