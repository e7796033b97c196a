//! # OpsWeave Engine
//!
//! The running heart of OpsWeave: a shared state store, the agent steps
//! that write to it, the cycle scheduler that drives them, and the
//! broadcaster that pushes snapshots to connected subscribers.
//!
//! ```text
//! Scheduler ──tick──▶ Orchestrator::run_cycle ──▶ Pipeline ──▶ steps ──▶ StateStore
//!                                                                          │
//! Broadcaster ──tick──▶ Snapshot::capture ◀────────────────────────────────┘
//!        └──▶ SubscriberRegistry ──▶ subscribers
//! ```

pub mod advisor;
pub mod broadcast;
pub mod cycle;
pub mod orchestrator;
pub mod pipeline;
pub mod runtime;
pub mod scheduler;
pub mod steps;
pub mod store;

#[cfg(test)]
mod testing;

pub use advisor::{Advisor, fallback_text};
pub use broadcast::{Broadcaster, DeliveryReport, Snapshot, SubscriberRegistry, Subscription};
pub use cycle::CycleRunner;
pub use orchestrator::{LiveOrchestrator, Mode, Orchestrator, SimulatedOrchestrator, from_config};
pub use pipeline::{CycleReport, CycleStatus, Pipeline, SkipReason, SkippedStep};
pub use runtime::Runtime;
pub use scheduler::Scheduler;
pub use store::{ACTIVITY_LOG_CAP, MAX_QUERY_LIMIT, StateStore};
