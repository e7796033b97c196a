use async_trait::async_trait;
use chrono::Utc;
use opsweave_core::error::StepError;
use opsweave_core::{ActivityLevel, AgentRole, InferenceRequest, Prediction, Server, Severity};
use rand::Rng;
use rand::seq::IndexedRandom;
use tracing::debug;

use super::{AgentStep, CycleContext, StepEnv};

/// Predicts failures on servers running above the risk threshold.
pub struct MonitoringStep;

fn prompt(server: &Server) -> String {
    let m = &server.current_metrics;
    format!(
        "As a Predictive Monitoring Agent, analyze this server and predict potential failures:\n\n\
         Server: {}\nCPU: {}%\nMemory: {}%\nDisk: {}%\nRisk Score: {}\n\n\
         Predict if this server will fail in the next 24-48 hours and recommend preventive actions.",
        server.hostname, m.cpu_percent, m.memory_percent, m.disk_usage_percent, server.risk_score
    )
}

#[async_trait]
impl AgentStep for MonitoringStep {
    fn role(&self) -> AgentRole {
        AgentRole::Monitoring
    }

    async fn run(&self, env: &StepEnv<'_>, cx: &mut CycleContext) -> Result<(), StepError> {
        let data = env.store.data();
        let threshold = env.sim.risk_threshold;
        let at_risk = data.at_risk_servers(threshold);
        if at_risk.is_empty() {
            return Err(StepError::NoCandidates {
                step: "monitoring",
                reason: format!("no server above {threshold}% cpu or memory"),
            });
        }

        let count = env.sim.max_predictions_per_step.min(at_risk.len());
        let sampled: Vec<&Server> = at_risk
            .choose_multiple(&mut cx.rng, count)
            .copied()
            .collect();
        debug!(at_risk = at_risk.len(), sampled = sampled.len(), "Monitoring sampled servers");

        let mut made = Vec::with_capacity(sampled.len());
        for server in sampled {
            let confidence = cx.rng.random_range(
                env.sim.prediction_confidence.min..=env.sim.prediction_confidence.max,
            );
            let hours = cx.rng.random_range(
                env.sim.time_to_failure_hours.min..=env.sim.time_to_failure_hours.max,
            );
            let impact = cx
                .rng
                .random_range(env.sim.business_impact_usd.min..=env.sim.business_impact_usd.max);

            let request = InferenceRequest::new(prompt(server))
                .with_context(serde_json::json!({ "server": server }));
            let reasoning = env.advisor.reason(env.store, request).await;

            let m = &server.current_metrics;
            let prediction = Prediction {
                id: env.store.next_id("PRED"),
                server_id: Some(server.server_id.clone()),
                server_name: Some(server.hostname.clone()),
                title: format!("High resource usage on {}", server.hostname),
                description: format!(
                    "{}: CPU {}% / memory {}% on {} ({})",
                    server.hostname, m.cpu_percent, m.memory_percent, server.server_type, server.os
                ),
                severity: Severity::from_impact(impact),
                confidence: u8::try_from(confidence.min(100)).unwrap_or(100),
                time_to_failure_hours: u32::try_from(hours).unwrap_or(u32::MAX),
                estimated_impact_usd: impact,
                recommended_action: "Schedule preventive maintenance".into(),
                ai_reasoning: reasoning,
                created_at: Utc::now(),
            };
            env.store.push_prediction(prediction.clone());
            made.push(prediction);
        }

        let total_servers = data.servers.len();
        env.store.update_agent(AgentRole::Monitoring, |a| {
            a.predictions_made += made.len() as u64;
            a.current_task = format!("Analyzing {total_servers} servers");
        });

        if let Some(first) = made.first() {
            env.store.log_activity(
                AgentRole::Monitoring.display_name(),
                "Failure Prediction",
                format!(
                    "High resource usage detected on {} - {}% probability",
                    first.server_name.as_deref().unwrap_or("unknown server"),
                    first.confidence
                ),
                ActivityLevel::Warning,
            );
        }
        cx.prediction = made.into_iter().next();
        Ok(())
    }
}
