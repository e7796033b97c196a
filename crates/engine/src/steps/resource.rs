use async_trait::async_trait;
use chrono::Utc;
use opsweave_core::error::StepError;
use opsweave_core::{ActivityLevel, AgentRole, Assignment};
use rand::Rng;

use super::{AgentStep, CycleContext, Requirement, StepEnv};

const TECHNICIANS: [&str; 4] = ["Sarah Chen", "Mike Rodriguez", "Emily Watson", "David Park"];

/// Schedules a technician against this cycle's autonomous decision.
pub struct ResourceStep;

#[async_trait]
impl AgentStep for ResourceStep {
    fn role(&self) -> AgentRole {
        AgentRole::Resource
    }

    fn requirement(&self) -> Requirement {
        Requirement::AutonomousDecision
    }

    async fn run(&self, env: &StepEnv<'_>, cx: &mut CycleContext) -> Result<(), StepError> {
        let decision = cx
            .decision
            .as_ref()
            .filter(|d| d.is_autonomous())
            .ok_or(StepError::MissingInput {
                step: "resource",
                input: "autonomous decision",
            })?;
        let decision_id = decision.id.clone();
        let action = decision.action.clone();

        let technician = *cx.pick(&TECHNICIANS).unwrap_or(&TECHNICIANS[0]);
        let range = env.sim.technician_duration_hours;
        let hours = cx.rng.random_range(range.min..=range.max);

        let assignment = Assignment {
            id: env.store.next_id("ASN"),
            decision_id,
            technician: technician.into(),
            scheduled_at: Utc::now(),
            estimated_duration_hours: (hours * 10.0).round() / 10.0,
            status: "scheduled".into(),
        };

        env.store.log_activity(
            AgentRole::Resource.display_name(),
            "Technician Assigned",
            format!(
                "{technician} assigned to {action} - {:.1}h estimated",
                assignment.estimated_duration_hours
            ),
            ActivityLevel::Info,
        );
        env.store.update_agent(AgentRole::Resource, |a| {
            a.current_task = format!("Dispatching {technician}");
        });
        env.store.push_assignment(assignment);
        Ok(())
    }
}
