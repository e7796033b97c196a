//! Records the agents produce: predictions, decisions, activity entries,
//! technician assignments, and the aggregate metrics snapshot.
//!
//! Every record is immutable once constructed. The decision constructor is
//! the only place autonomy level and approval status are derived, so the
//! cost thresholds below hold for every decision in the system.

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

/// Decisions strictly below this cost run with full autonomy.
pub const FULL_AUTONOMY_LIMIT_USD: u64 = 2_000;

/// Decisions strictly below this cost (and at or above the full-autonomy
/// limit) run with conditional autonomy; everything else is escalated.
pub const CONDITIONAL_AUTONOMY_LIMIT_USD: u64 = 10_000;

/// How urgent a predicted failure is. Ordered: low < medium < high < critical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Severity implied by the money at stake if the failure happens.
    pub fn from_impact(impact_usd: u64) -> Self {
        match impact_usd {
            20_000.. => Severity::Critical,
            12_000.. => Severity::High,
            6_000.. => Severity::Medium,
            _ => Severity::Low,
        }
    }
}

/// A predicted infrastructure failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub id: String,

    /// The server the prediction is about (absent for fleet-wide findings)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_name: Option<String>,

    pub title: String,
    pub description: String,
    pub severity: Severity,

    /// Confidence in percent, 0..=100
    pub confidence: u8,

    pub time_to_failure_hours: u32,
    pub estimated_impact_usd: u64,
    pub recommended_action: String,

    /// Model (or rule-based fallback) explanation
    #[serde(default)]
    pub ai_reasoning: String,

    pub created_at: DateTime<Utc>,
}

/// Autonomy level of a decision: 1 (full), 2 (conditional), 3 (escalated).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum AutonomyLevel {
    Full,
    Conditional,
    Escalated,
}

impl AutonomyLevel {
    pub fn for_cost(cost_usd: u64) -> Self {
        if cost_usd < FULL_AUTONOMY_LIMIT_USD {
            AutonomyLevel::Full
        } else if cost_usd < CONDITIONAL_AUTONOMY_LIMIT_USD {
            AutonomyLevel::Conditional
        } else {
            AutonomyLevel::Escalated
        }
    }

    pub fn as_u8(self) -> u8 {
        match self {
            AutonomyLevel::Full => 1,
            AutonomyLevel::Conditional => 2,
            AutonomyLevel::Escalated => 3,
        }
    }
}

impl From<AutonomyLevel> for u8 {
    fn from(level: AutonomyLevel) -> Self {
        level.as_u8()
    }
}

impl TryFrom<u8> for AutonomyLevel {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(AutonomyLevel::Full),
            2 => Ok(AutonomyLevel::Conditional),
            3 => Ok(AutonomyLevel::Escalated),
            other => Err(format!("autonomy level must be 1, 2 or 3, got {other}")),
        }
    }
}

impl std::fmt::Display for AutonomyLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Level {}", self.as_u8())
    }
}

/// Whether a decision may execute without a human.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    /// Executes immediately
    AutoApproved,
    /// Executes immediately, operators are notified
    ConditionalApproval,
    /// Waits for a human
    RequiresHumanApproval,
}

impl ApprovalStatus {
    pub fn for_level(level: AutonomyLevel) -> Self {
        match level {
            AutonomyLevel::Full => ApprovalStatus::AutoApproved,
            AutonomyLevel::Conditional => ApprovalStatus::ConditionalApproval,
            AutonomyLevel::Escalated => ApprovalStatus::RequiresHumanApproval,
        }
    }

    /// True when the action runs without waiting for a human.
    pub fn is_autonomous(self) -> bool {
        !matches!(self, ApprovalStatus::RequiresHumanApproval)
    }
}

/// An evaluated preventive action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prediction_id: Option<String>,

    pub decision_type: String,
    pub action: String,
    pub estimated_cost_usd: u64,
    pub estimated_impact_usd: u64,

    /// Impact divided by cost
    pub roi: f64,

    pub autonomy_level: AutonomyLevel,
    pub approval_status: ApprovalStatus,

    #[serde(default)]
    pub ai_reasoning: String,

    pub created_at: DateTime<Utc>,
}

impl Decision {
    /// Evaluate a preventive action. Autonomy level, approval status and
    /// ROI are derived here and nowhere else.
    pub fn evaluate(
        id: impl Into<String>,
        prediction: Option<&Prediction>,
        action: impl Into<String>,
        cost_usd: u64,
        impact_usd: u64,
        ai_reasoning: impl Into<String>,
    ) -> Self {
        let autonomy_level = AutonomyLevel::for_cost(cost_usd);
        let roi = if cost_usd == 0 {
            0.0
        } else {
            impact_usd as f64 / cost_usd as f64
        };
        Self {
            id: id.into(),
            prediction_id: prediction.map(|p| p.id.clone()),
            decision_type: "preventive_maintenance".into(),
            action: action.into(),
            estimated_cost_usd: cost_usd,
            estimated_impact_usd: impact_usd,
            roi,
            autonomy_level,
            approval_status: ApprovalStatus::for_level(autonomy_level),
            ai_reasoning: ai_reasoning.into(),
            created_at: Utc::now(),
        }
    }

    pub fn is_autonomous(&self) -> bool {
        self.approval_status.is_autonomous()
    }

    /// Money saved by acting early: cost × ROI.
    pub fn prevention_savings(&self) -> f64 {
        self.estimated_cost_usd as f64 * self.roi
    }
}

/// Severity of an activity-log line as shown on the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityLevel {
    Info,
    Success,
    Warning,
    Escalation,
}

/// One line of the agent activity feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityLogEntry {
    pub id: String,

    /// Wall-clock time as `HH:MM:SS`
    pub timestamp: String,

    pub agent: String,
    pub action: String,
    pub details: String,
    pub level: ActivityLevel,
}

impl ActivityLogEntry {
    pub fn new(
        id: impl Into<String>,
        agent: impl Into<String>,
        action: impl Into<String>,
        details: impl Into<String>,
        level: ActivityLevel,
    ) -> Self {
        Self {
            id: id.into(),
            timestamp: Local::now().format("%H:%M:%S").to_string(),
            agent: agent.into(),
            action: action.into(),
            details: details.into(),
            level,
        }
    }
}

/// A technician scheduled against an autonomous decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub id: String,
    pub decision_id: String,
    pub technician: String,
    pub scheduled_at: DateTime<Utc>,
    pub estimated_duration_hours: f64,
    pub status: String,
}

/// Inference usage accounting. All zero in simulation mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InferenceStats {
    pub calls: u64,
    pub successes: u64,
    /// Calls that failed and were answered with rule-based text
    pub fallbacks: u64,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// Aggregate metrics shown on the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub autonomous_actions: u64,
    pub total_decisions: u64,
    pub autonomous_percentage: f64,
    pub prevention_savings: f64,
    pub prediction_accuracy: f64,
    pub active_incidents: u32,
    /// Predictions currently retained; saturates at the store's retention cap
    pub predictions_tracked: usize,
    pub servers_monitored: usize,
    pub clients_managed: usize,
    pub inference: InferenceStats,
}
