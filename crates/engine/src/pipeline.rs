//! One cycle: the ordered, probabilistically gated run of agent steps.

use chrono::{DateTime, Utc};
use opsweave_config::StepGates;
use opsweave_core::{AgentRole, AgentStatus};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::steps::{
    AgentStep, CycleContext, DecisionStep, FinancialStep, LearningStep, LifecycleStep,
    MonitoringStep, ResourceStep, SecurityStep, StepEnv, gate_for,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CycleStatus {
    Completed,
    /// At least one step failed; the remaining steps still ran
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkipReason {
    /// Lost the Bernoulli trial
    Gate,
    MissingInput { input: String },
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedStep {
    pub agent: String,
    pub reason: SkipReason,
}

/// What happened in one cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleReport {
    pub cycle_id: String,
    pub started_at: DateTime<Utc>,
    pub agents_executed: Vec<String>,
    pub skipped: Vec<SkippedStep>,
    pub status: CycleStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CycleReport {
    fn new(cycle_id: &str) -> Self {
        Self {
            cycle_id: cycle_id.to_string(),
            started_at: Utc::now(),
            agents_executed: Vec::new(),
            skipped: Vec::new(),
            status: CycleStatus::Completed,
            error: None,
        }
    }

    pub fn executed(&self, role: AgentRole) -> bool {
        self.agents_executed.iter().any(|a| a == role.display_name())
    }
}

/// The ordered step list.
#[derive(Clone)]
pub struct Pipeline {
    steps: Vec<Arc<dyn AgentStep>>,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::standard()
    }
}

impl Pipeline {
    /// Monitoring, decision, resource, lifecycle, financial, security, learning.
    pub fn standard() -> Self {
        Self::new(vec![
            Arc::new(MonitoringStep),
            Arc::new(DecisionStep),
            Arc::new(ResourceStep),
            Arc::new(LifecycleStep),
            Arc::new(FinancialStep),
            Arc::new(SecurityStep),
            Arc::new(LearningStep),
        ])
    }

    pub fn new(steps: Vec<Arc<dyn AgentStep>>) -> Self {
        Self { steps }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Run every step in order. Step failures are recorded and the cycle
    /// moves on; agents whose step did not run end the cycle idle.
    pub async fn run(
        &self,
        env: &StepEnv<'_>,
        gates: &StepGates,
        cx: &mut CycleContext,
    ) -> CycleReport {
        let mut report = CycleReport::new(&cx.cycle_id);

        for step in &self.steps {
            let role = step.role();
            let name = role.display_name();

            let requirement = step.requirement();
            if !requirement.satisfied_by(cx) {
                self.skip(env, &mut report, role, SkipReason::MissingInput {
                    input: requirement.describe().into(),
                });
                continue;
            }
            if !cx.chance(gate_for(gates, role)) {
                self.skip(env, &mut report, role, SkipReason::Gate);
                continue;
            }

            env.store.update_agent(role, |a| a.status = AgentStatus::Processing);
            match step.run(env, cx).await {
                Ok(()) => {
                    debug!(cycle_id = %cx.cycle_id, agent = name, "Step completed");
                    env.store.update_agent(role, |a| {
                        a.status = AgentStatus::Active;
                        a.tasks_completed += 1;
                        a.last_active = Some(Utc::now());
                    });
                    report.agents_executed.push(name.to_string());
                }
                Err(e) => {
                    warn!(cycle_id = %cx.cycle_id, agent = name, error = %e, "Step failed, skipping");
                    if report.error.is_none() {
                        report.error = Some(e.to_string());
                    }
                    report.status = CycleStatus::Error;
                    self.skip(env, &mut report, role, SkipReason::Failed {
                        error: e.to_string(),
                    });
                }
            }
        }

        report
    }

    fn skip(&self, env: &StepEnv<'_>, report: &mut CycleReport, role: AgentRole, reason: SkipReason) {
        env.store.update_agent(role, |a| a.status = AgentStatus::Idle);
        report.skipped.push(SkippedStep {
            agent: role.display_name().to_string(),
            reason,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advisor::Advisor;
    use crate::testing::{five_servers, server, store_with};
    use async_trait::async_trait;
    use opsweave_config::SimulationConfig;
    use opsweave_core::error::StepError;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    struct Broken;

    #[async_trait]
    impl AgentStep for Broken {
        fn role(&self) -> AgentRole {
            AgentRole::Security
        }

        async fn run(&self, _env: &StepEnv<'_>, _cx: &mut CycleContext) -> Result<(), StepError> {
            Err(StepError::Failed {
                step: "security",
                reason: "scanner offline".into(),
            })
        }
    }

    #[tokio::test]
    async fn all_gates_open_runs_every_step() {
        let store = store_with(five_servers());
        let sim = SimulationConfig {
            gates: StepGates::always(),
            ..SimulationConfig::default()
        };
        let advisor = Advisor::simulated();
        let env = StepEnv {
            store: &store,
            sim: &sim,
            advisor: &advisor,
        };
        let mut cx = CycleContext::new("CYCLE-00001", StdRng::seed_from_u64(11));
        let report = Pipeline::standard().run(&env, &sim.gates, &mut cx).await;

        assert_eq!(report.status, CycleStatus::Completed);
        assert_eq!(report.agents_executed.len(), 7);
        assert_eq!(report.agents_executed[0], "Predictive Monitoring");
        assert_eq!(report.agents_executed[1], "Autonomous Decision");
        assert_eq!(report.agents_executed[2], "Resource Optimization");
        assert!(report.skipped.is_empty());
        assert_eq!(store.assignments(10).len(), 1);
    }

    #[tokio::test]
    async fn closed_gates_skip_and_idle() {
        let store = store_with(five_servers());
        let sim = SimulationConfig {
            gates: StepGates {
                monitoring: 0.0,
                lifecycle: 0.0,
                financial: 0.0,
                security: 0.0,
                learning: 0.0,
                ..StepGates::always()
            },
            ..SimulationConfig::default()
        };
        let advisor = Advisor::simulated();
        let env = StepEnv {
            store: &store,
            sim: &sim,
            advisor: &advisor,
        };
        let mut cx = CycleContext::new("CYCLE-00002", StdRng::seed_from_u64(11));
        let report = Pipeline::standard().run(&env, &sim.gates, &mut cx).await;

        assert!(report.agents_executed.is_empty());
        assert_eq!(report.skipped.len(), 7);
        assert_eq!(report.skipped[0].reason, SkipReason::Gate);
        assert_eq!(
            report.skipped[1].reason,
            SkipReason::MissingInput {
                input: "prediction".into()
            }
        );
        assert_eq!(store.active_agent_count(), 1);
    }

    #[tokio::test]
    async fn failing_step_does_not_stop_the_cycle() {
        let store = store_with(five_servers());
        let sim = SimulationConfig {
            gates: StepGates::always(),
            ..SimulationConfig::default()
        };
        let advisor = Advisor::simulated();
        let env = StepEnv {
            store: &store,
            sim: &sim,
            advisor: &advisor,
        };
        let pipeline = Pipeline::new(vec![
            Arc::new(MonitoringStep),
            Arc::new(Broken),
            Arc::new(LearningStep),
        ]);
        let mut cx = CycleContext::new("CYCLE-00003", StdRng::seed_from_u64(11));
        let report = pipeline.run(&env, &sim.gates, &mut cx).await;

        assert_eq!(report.status, CycleStatus::Error);
        assert_eq!(
            report.agents_executed,
            vec!["Predictive Monitoring", "Learning & Adaptation"]
        );
        assert!(report.error.unwrap().contains("scanner offline"));
        let security = store.agent("agent-security-001").unwrap();
        assert_eq!(security.status, AgentStatus::Idle);
    }

    #[tokio::test]
    async fn monitoring_without_candidates_skips_dependents() {
        let store = store_with(vec![server("SRV-COOL", 10.0, 10.0)]);
        let sim = SimulationConfig {
            gates: StepGates::always(),
            ..SimulationConfig::default()
        };
        let advisor = Advisor::simulated();
        let env = StepEnv {
            store: &store,
            sim: &sim,
            advisor: &advisor,
        };
        let mut cx = CycleContext::new("CYCLE-00004", StdRng::seed_from_u64(1));
        let report = Pipeline::standard().run(&env, &sim.gates, &mut cx).await;

        assert!(!report.executed(AgentRole::Monitoring));
        assert!(!report.executed(AgentRole::Decision));
        assert!(report.executed(AgentRole::Lifecycle));
        assert_eq!(store.metrics().total_decisions, 0);
    }
}
