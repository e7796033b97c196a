use async_trait::async_trait;
use opsweave_core::error::StepError;
use opsweave_core::{ActivityLevel, AgentRole, AutonomyLevel, Decision, InferenceRequest};
use rand::Rng;

use super::{AgentStep, CycleContext, Requirement, StepEnv, usd};

/// Prices a preventive action for this cycle's prediction and classifies
/// it by cost into an autonomy level.
pub struct DecisionStep;

#[async_trait]
impl AgentStep for DecisionStep {
    fn role(&self) -> AgentRole {
        AgentRole::Decision
    }

    fn requirement(&self) -> Requirement {
        Requirement::Prediction
    }

    async fn run(&self, env: &StepEnv<'_>, cx: &mut CycleContext) -> Result<(), StepError> {
        let prediction = cx.prediction.clone().ok_or(StepError::MissingInput {
            step: "decision",
            input: "prediction",
        })?;

        let failure_cost = prediction.estimated_impact_usd;
        let range = env.sim.preventive_cost_usd;
        let preventive_cost = cx.rng.random_range(range.min..=range.max);
        let roi = if preventive_cost == 0 {
            0.0
        } else {
            failure_cost as f64 / preventive_cost as f64
        };

        let prompt = format!(
            "As an Autonomous Decision Agent, evaluate this preventive action:\n\n\
             Predicted Failure Cost: ${}\nPreventive Action Cost: ${}\nROI: {roi:.1}:1\n\
             Time to Failure: {} hours\n\n\
             Should this action be approved? Provide detailed reasoning.",
            usd(failure_cost),
            usd(preventive_cost),
            prediction.time_to_failure_hours
        );
        let request = InferenceRequest::new(prompt)
            .with_context(serde_json::json!({ "prediction": &prediction }));
        let reasoning = env.advisor.reason(env.store, request).await;

        let target = prediction
            .server_name
            .clone()
            .unwrap_or_else(|| prediction.title.clone());
        let decision = Decision::evaluate(
            env.store.next_id("DEC"),
            Some(&prediction),
            format!("Schedule maintenance for {target}"),
            preventive_cost,
            failure_cost,
            reasoning,
        );

        env.store.update_agent(AgentRole::Decision, |a| a.decisions_made += 1);

        let (action, details, level) = match decision.autonomy_level {
            AutonomyLevel::Full => (
                "Auto-Approved",
                format!(
                    "${} preventive action (ROI: {:.1}:1) - {}",
                    usd(preventive_cost),
                    decision.roi,
                    decision.action
                ),
                ActivityLevel::Success,
            ),
            AutonomyLevel::Conditional => (
                "Conditional Approval",
                format!(
                    "${} preventive action (ROI: {:.1}:1) - {} - operators notified",
                    usd(preventive_cost),
                    decision.roi,
                    decision.action
                ),
                ActivityLevel::Success,
            ),
            AutonomyLevel::Escalated => (
                "Escalated",
                format!(
                    "${} action requires human approval - {}",
                    usd(preventive_cost),
                    decision.autonomy_level
                ),
                ActivityLevel::Escalation,
            ),
        };
        env.store
            .log_activity(AgentRole::Decision.display_name(), action, details, level);

        env.store.push_decision(decision.clone());
        cx.decision = Some(decision);
        Ok(())
    }
}
