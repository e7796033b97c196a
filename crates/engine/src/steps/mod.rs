//! Agent step functions.
//!
//! Each step reads the dataset and the store, may ask the advisor for
//! reasoning text, appends its records, and logs what it did. Steps run
//! one after another inside a cycle and share a [`CycleContext`], which is
//! how the decision step sees the prediction the monitoring step just made.

mod decision;
mod financial;
mod learning;
mod lifecycle;
mod monitoring;
mod resource;
mod security;

pub use decision::DecisionStep;
pub use financial::FinancialStep;
pub use learning::LearningStep;
pub use lifecycle::LifecycleStep;
pub use monitoring::MonitoringStep;
pub use resource::ResourceStep;
pub use security::SecurityStep;

use async_trait::async_trait;
use opsweave_config::{SimulationConfig, StepGates};
use opsweave_core::error::StepError;
use opsweave_core::{AgentRole, Decision, Prediction};
use rand::Rng;
use rand::rngs::StdRng;

use crate::advisor::Advisor;
use crate::store::StateStore;

/// What a step may touch.
pub struct StepEnv<'a> {
    pub store: &'a StateStore,
    pub sim: &'a SimulationConfig,
    pub advisor: &'a Advisor,
}

/// Per-cycle scratch state, dropped when the cycle ends.
pub struct CycleContext {
    pub cycle_id: String,
    pub rng: StdRng,
    /// First prediction made this cycle
    pub prediction: Option<Prediction>,
    /// Decision made this cycle
    pub decision: Option<Decision>,
}

impl CycleContext {
    pub fn new(cycle_id: impl Into<String>, rng: StdRng) -> Self {
        Self {
            cycle_id: cycle_id.into(),
            rng,
            prediction: None,
            decision: None,
        }
    }

    /// Bernoulli trial with a probability clamped into [0, 1].
    pub fn chance(&mut self, p: f64) -> bool {
        self.rng.random_bool(p.clamp(0.0, 1.0))
    }

    /// Uniform pick from a non-empty slice.
    pub fn pick<'s, T>(&mut self, items: &'s [T]) -> Option<&'s T> {
        if items.is_empty() {
            None
        } else {
            Some(&items[self.rng.random_range(0..items.len())])
        }
    }
}

/// Upstream output a step needs from earlier in the same cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    None,
    Prediction,
    AutonomousDecision,
}

impl Requirement {
    pub fn satisfied_by(self, cx: &CycleContext) -> bool {
        match self {
            Requirement::None => true,
            Requirement::Prediction => cx.prediction.is_some(),
            Requirement::AutonomousDecision => cx.decision.as_ref().is_some_and(Decision::is_autonomous),
        }
    }

    pub fn describe(self) -> &'static str {
        match self {
            Requirement::None => "nothing",
            Requirement::Prediction => "prediction",
            Requirement::AutonomousDecision => "autonomous decision",
        }
    }
}

#[async_trait]
pub trait AgentStep: Send + Sync {
    fn role(&self) -> AgentRole;

    fn requirement(&self) -> Requirement {
        Requirement::None
    }

    async fn run(&self, env: &StepEnv<'_>, cx: &mut CycleContext) -> Result<(), StepError>;
}

/// Probability that a step for `role` runs this cycle.
pub fn gate_for(gates: &StepGates, role: AgentRole) -> f64 {
    match role {
        AgentRole::Orchestrator => 1.0,
        AgentRole::Monitoring => gates.monitoring,
        AgentRole::Decision => gates.decision,
        AgentRole::Resource => gates.resource,
        AgentRole::Lifecycle => gates.lifecycle,
        AgentRole::Financial => gates.financial,
        AgentRole::Security => gates.security,
        AgentRole::Learning => gates.learning,
    }
}

/// `12345` as `12,345`.
pub(crate) fn usd(amount: u64) -> String {
    let digits = amount.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
