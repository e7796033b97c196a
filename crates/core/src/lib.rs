//! # OpsWeave Core
//!
//! Domain types, traits, and error definitions for the OpsWeave autonomous
//! MSP operations simulator. This crate has **zero framework dependencies**:
//! it defines the records the agents produce and the seams other crates
//! implement against.
//!
//! ## Layout
//!
//! - [`records`]: predictions, decisions, activity entries, assignments, metrics
//! - [`agent`]: the agent roster and per-agent runtime state
//! - [`dataset`]: the synthetic infrastructure the agents reason about
//! - [`inference`]: the external language-model collaborator
//! - [`error`]: one error enum per bounded context

pub mod agent;
pub mod dataset;
pub mod error;
pub mod inference;
pub mod records;

// Re-export key types at crate root for ergonomics
pub use agent::{AgentRole, AgentState, AgentStatus};
pub use dataset::{Client, DataContext, HistoricalDecision, Incident, Server, ServerMetrics};
pub use error::{Error, Result};
pub use inference::{InferenceClient, InferenceRequest, InferenceResponse, Usage};
pub use records::{
    ActivityLevel, ActivityLogEntry, Assignment, AutonomyLevel, ApprovalStatus, Decision,
    InferenceStats, MetricsSnapshot, Prediction, Severity,
};
