use async_trait::async_trait;
use opsweave_core::error::StepError;
use opsweave_core::{ActivityLevel, AgentRole};

use super::{AgentStep, CycleContext, StepEnv};

const IMPROVEMENTS: [&str; 5] = [
    "disk failure prediction threshold adjusted",
    "network capacity model optimized",
    "decision approval thresholds refined",
    "resource allocation algorithm improved",
    "client churn prediction model updated",
];

/// Prevention rate above which the model counts as retrained.
const RETRAIN_RATE: f64 = 70.0;

/// Learns from the incident history.
pub struct LearningStep;

#[async_trait]
impl AgentStep for LearningStep {
    fn role(&self) -> AgentRole {
        AgentRole::Learning
    }

    async fn run(&self, env: &StepEnv<'_>, cx: &mut CycleContext) -> Result<(), StepError> {
        let incidents = &env.store.data().incidents;
        let preventable = incidents.iter().filter(|i| i.was_preventable).count();
        let rate = if incidents.is_empty() {
            0.0
        } else {
            preventable as f64 / incidents.len() as f64 * 100.0
        };
        let agent = AgentRole::Learning.display_name();

        if rate > RETRAIN_RATE {
            env.store.log_activity(
                agent,
                "Model Update",
                format!(
                    "Prediction accuracy improved to {rate:.1}% - Model retrained with {} incidents",
                    incidents.len()
                ),
                ActivityLevel::Success,
            );
        } else {
            env.store.log_activity(
                agent,
                "Performance Analysis",
                format!(
                    "Current prevention rate: {rate:.1}% - Analyzing {} incidents for patterns",
                    incidents.len()
                ),
                ActivityLevel::Info,
            );
        }

        if cx.chance(env.sim.learning_improvement_chance) {
            let improvement = *cx.pick(&IMPROVEMENTS).unwrap_or(&IMPROVEMENTS[0]);
            env.store.log_activity(
                agent,
                "Continuous Improvement",
                format!("AI model updated: {improvement}"),
                ActivityLevel::Info,
            );
        }

        env.store.update_agent(AgentRole::Learning, |a| {
            a.accuracy_percent = (rate * 10.0).round() / 10.0;
        });
        Ok(())
    }
}
