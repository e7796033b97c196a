use async_trait::async_trait;
use opsweave_core::error::StepError;
use opsweave_core::{ActivityLevel, AgentRole};

use super::{AgentStep, CycleContext, StepEnv};

const VULNERABILITIES: [&str; 4] = [
    "Outdated SSL/TLS certificates",
    "Unpatched security vulnerabilities",
    "Weak password policies detected",
    "Unauthorized port access detected",
];

/// Vulnerability scans, auto-remediation and compliance audits.
pub struct SecurityStep;

#[async_trait]
impl AgentStep for SecurityStep {
    fn role(&self) -> AgentRole {
        AgentRole::Security
    }

    async fn run(&self, env: &StepEnv<'_>, cx: &mut CycleContext) -> Result<(), StepError> {
        let servers = &env.store.data().servers;
        let Some(server) = cx.pick(servers) else {
            return Err(StepError::NoCandidates {
                step: "security",
                reason: "no servers to scan".into(),
            });
        };
        let agent = AgentRole::Security.display_name();

        if cx.chance(env.sim.vulnerability_chance) {
            let finding = *cx.pick(&VULNERABILITIES).unwrap_or(&VULNERABILITIES[0]);
            env.store.log_activity(
                agent,
                "Vulnerability Detected",
                format!("{}: {finding}", server.hostname),
                ActivityLevel::Warning,
            );

            if cx.chance(env.sim.remediation_chance) {
                env.store.log_activity(
                    agent,
                    "Auto-Remediated",
                    format!("{}: {finding} - Automatically patched", server.hostname),
                    ActivityLevel::Success,
                );
            }
        }

        if cx.chance(env.sim.compliance_audit_chance) {
            env.store.log_activity(
                agent,
                "Compliance Check",
                "Monthly security audit passed - All systems compliant with SOC 2 requirements",
                ActivityLevel::Success,
            );
        }

        env.store.update_agent(AgentRole::Security, |a| {
            a.current_task = format!("Scanning {}", server.hostname);
        });
        Ok(())
    }
}
