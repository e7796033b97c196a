//! Agent roster and runtime state types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The eight simulated roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    Orchestrator,
    Monitoring,
    Decision,
    Lifecycle,
    Resource,
    Financial,
    Security,
    Learning,
}

impl AgentRole {
    pub const ALL: [AgentRole; 8] = [
        AgentRole::Orchestrator,
        AgentRole::Monitoring,
        AgentRole::Decision,
        AgentRole::Lifecycle,
        AgentRole::Resource,
        AgentRole::Financial,
        AgentRole::Security,
        AgentRole::Learning,
    ];

    /// Dashboard name, also used as the `agent` field of activity entries.
    pub fn display_name(self) -> &'static str {
        match self {
            AgentRole::Orchestrator => "Master Orchestrator",
            AgentRole::Monitoring => "Predictive Monitoring",
            AgentRole::Decision => "Autonomous Decision",
            AgentRole::Lifecycle => "Client Lifecycle",
            AgentRole::Resource => "Resource Optimization",
            AgentRole::Financial => "Financial Intelligence",
            AgentRole::Security => "Security & Compliance",
            AgentRole::Learning => "Learning & Adaptation",
        }
    }

    /// Stable identifier, e.g. `agent-monitoring-001`.
    pub fn agent_id(self) -> String {
        let slug = serde_json::to_value(self)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default();
        format!("agent-{slug}-001")
    }

    /// What the agent is doing when nothing special is happening.
    pub fn default_task(self) -> &'static str {
        match self {
            AgentRole::Orchestrator => "Coordinating autonomous workflows",
            AgentRole::Monitoring => "Analyzing server telemetry",
            AgentRole::Decision => "Evaluating preventive actions",
            AgentRole::Lifecycle => "Monitoring client health scores",
            AgentRole::Resource => "Optimizing technician assignments",
            AgentRole::Financial => "Analyzing profitability trends",
            AgentRole::Security => "Scanning for vulnerabilities",
            AgentRole::Learning => "Analyzing decision outcomes",
        }
    }

    /// Starting accuracy figure shown on the agent card.
    pub fn baseline_accuracy(self) -> f64 {
        match self {
            AgentRole::Orchestrator => 94.0,
            AgentRole::Monitoring => 89.0,
            AgentRole::Decision => 92.0,
            AgentRole::Lifecycle => 89.0,
            AgentRole::Resource => 86.0,
            AgentRole::Financial => 91.0,
            AgentRole::Security => 95.0,
            AgentRole::Learning => 88.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    #[default]
    Active,
    Processing,
    Idle,
}

/// Runtime state of one agent. Mutated in place, never deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentState {
    pub id: String,
    pub role: AgentRole,
    pub name: String,
    pub status: AgentStatus,
    pub current_task: String,

    /// Number of times this agent's step ran
    pub tasks_completed: u64,
    pub predictions_made: u64,
    pub decisions_made: u64,
    pub accuracy_percent: f64,
    pub uptime_percent: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_active: Option<DateTime<Utc>>,
}

impl AgentState {
    pub fn new(role: AgentRole) -> Self {
        Self {
            id: role.agent_id(),
            role,
            name: role.display_name().into(),
            status: AgentStatus::Active,
            current_task: role.default_task().into(),
            tasks_completed: 0,
            predictions_made: 0,
            decisions_made: 0,
            accuracy_percent: role.baseline_accuracy(),
            uptime_percent: 99.9,
            last_active: None,
        }
    }
}
