use async_trait::async_trait;
use opsweave_core::error::StepError;
use opsweave_core::{ActivityLevel, AgentRole};

use super::{AgentStep, CycleContext, StepEnv, usd};

const PRICE_ADJUSTMENTS: [i32; 4] = [-5, 0, 5, 10];

/// ROI over historical decisions plus occasional pricing changes.
pub struct FinancialStep;

#[async_trait]
impl AgentStep for FinancialStep {
    fn role(&self) -> AgentRole {
        AgentRole::Financial
    }

    async fn run(&self, env: &StepEnv<'_>, cx: &mut CycleContext) -> Result<(), StepError> {
        let data = env.store.data();
        if data.decisions.is_empty() && data.clients.is_empty() {
            return Err(StepError::NoCandidates {
                step: "financial",
                reason: "no decision history and no clients".into(),
            });
        }

        let cost: u64 = data.decisions.iter().map(|d| d.estimated_cost_usd).sum();
        let avoided: u64 = data.decisions.iter().map(|d| d.estimated_impact_usd).sum();
        let roi = if cost > 0 { avoided as f64 / cost as f64 } else { 0.0 };

        if avoided > 0 {
            env.store.log_activity(
                AgentRole::Financial.display_name(),
                "ROI Analysis",
                format!(
                    "Preventive maintenance ROI: {roi:.1}:1 - ${} costs avoided",
                    usd(avoided)
                ),
                ActivityLevel::Success,
            );
        }

        if cx.chance(env.sim.pricing_adjustment_chance) {
            if let Some(client) = cx.pick(&data.clients) {
                let adjustment = *cx.pick(&PRICE_ADJUSTMENTS).unwrap_or(&0);
                env.store.log_activity(
                    AgentRole::Financial.display_name(),
                    "Pricing Adjustment",
                    format!(
                        "{} pricing optimized: {adjustment:+}% based on service utilization",
                        client.company_name
                    ),
                    ActivityLevel::Info,
                );
            }
        }

        env.store.update_agent(AgentRole::Financial, |a| {
            a.current_task = format!("Tracking {roi:.1}:1 preventive ROI");
        });
        Ok(())
    }
}
