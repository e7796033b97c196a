use async_trait::async_trait;
use opsweave_core::error::StepError;
use opsweave_core::{ActivityLevel, AgentRole};
use rand::Rng;

use super::{AgentStep, CycleContext, StepEnv, usd};

/// Client health checks and contract renewals.
pub struct LifecycleStep;

#[async_trait]
impl AgentStep for LifecycleStep {
    fn role(&self) -> AgentRole {
        AgentRole::Lifecycle
    }

    async fn run(&self, env: &StepEnv<'_>, cx: &mut CycleContext) -> Result<(), StepError> {
        let clients = &env.store.data().clients;
        let Some(watched) = cx.pick(clients) else {
            return Err(StepError::NoCandidates {
                step: "lifecycle",
                reason: "no clients under management".into(),
            });
        };

        let range = env.sim.client_health_score;
        let health = cx.rng.random_range(range.min..=range.max);
        env.store.log_activity(
            AgentRole::Lifecycle.display_name(),
            "Health Alert",
            format!(
                "{} health score: {health}% - Initiating proactive outreach",
                watched.company_name
            ),
            ActivityLevel::Warning,
        );
        env.store.update_agent(AgentRole::Lifecycle, |a| {
            a.current_task = format!("Outreach to {}", watched.company_name);
        });

        if let Some(renewing) = cx.pick(clients) {
            if cx.chance(env.sim.renewal_chance) {
                env.store.log_activity(
                    AgentRole::Lifecycle.display_name(),
                    "Auto-Renewal",
                    format!(
                        "{} contract auto-renewed - ${} ARR secured",
                        renewing.company_name,
                        usd(renewing.contract_value_usd)
                    ),
                    ActivityLevel::Success,
                );
            }
        }
        Ok(())
    }
}
