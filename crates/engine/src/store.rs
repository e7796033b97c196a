//! Shared state store.
//!
//! Owns every collection the agents produce. Only the running cycle writes;
//! query handlers and the broadcaster read concurrently and always get
//! owned copies, so a reader never observes a half-applied append.
//!
//! Locks are `std::sync::RwLock` held for the length of a single push or
//! copy and never across an `.await`.

use chrono::Utc;
use opsweave_core::{
    ActivityLevel, ActivityLogEntry, AgentRole, AgentState, AgentStatus, Assignment, DataContext,
    Decision, InferenceStats, MetricsSnapshot, Prediction, Severity, Usage,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Retention cap of the activity feed.
pub const ACTIVITY_LOG_CAP: usize = 200;
pub const ASSIGNMENT_CAP: usize = 200;
/// Retention caps of the decision and prediction registers. Running
/// counters keep counting past them.
pub const DECISION_CAP: usize = 500;
pub const PREDICTION_CAP: usize = 500;

/// Hard upper bound for caller-supplied `limit` arguments.
pub const MAX_QUERY_LIMIT: usize = 500;

const STARTING_ACCURACY: f64 = 89.0;
const STARTING_INCIDENTS: u32 = 3;

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|e| e.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|e| e.into_inner())
}

/// Push at the head, drop from the tail past `cap`.
fn push_capped<T>(queue: &mut VecDeque<T>, item: T, cap: usize) {
    queue.push_front(item);
    queue.truncate(cap);
}

fn newest<T: Clone>(queue: &VecDeque<T>, limit: usize) -> Vec<T> {
    queue.iter().take(limit.min(MAX_QUERY_LIMIT)).cloned().collect()
}

/// Running counters. Decision counters survive the decision cap.
#[derive(Debug, Clone)]
struct Counters {
    autonomous_actions: u64,
    total_decisions: u64,
    prevention_savings: f64,
    prediction_accuracy: f64,
    active_incidents: u32,
    inference: InferenceStats,
}

impl Default for Counters {
    fn default() -> Self {
        Self {
            autonomous_actions: 0,
            total_decisions: 0,
            prevention_savings: 0.0,
            prediction_accuracy: STARTING_ACCURACY,
            active_incidents: STARTING_INCIDENTS,
            inference: InferenceStats::default(),
        }
    }
}

pub struct StateStore {
    data: Arc<DataContext>,
    agents: RwLock<Vec<AgentState>>,
    predictions: RwLock<VecDeque<Prediction>>,
    decisions: RwLock<VecDeque<Decision>>,
    activity: RwLock<VecDeque<ActivityLogEntry>>,
    assignments: RwLock<VecDeque<Assignment>>,
    counters: RwLock<Counters>,
    activity_seq: AtomicU64,
    record_seq: AtomicU64,
}

impl StateStore {
    /// Build the store over `data`, seeded with the initial predictions.
    pub fn new(data: Arc<DataContext>) -> Self {
        let store = Self {
            data,
            agents: RwLock::new(AgentRole::ALL.iter().map(|r| AgentState::new(*r)).collect()),
            predictions: RwLock::new(VecDeque::new()),
            decisions: RwLock::new(VecDeque::new()),
            activity: RwLock::new(VecDeque::new()),
            assignments: RwLock::new(VecDeque::new()),
            counters: RwLock::new(Counters::default()),
            activity_seq: AtomicU64::new(0),
            record_seq: AtomicU64::new(1),
        };
        store.seed_predictions();
        store
    }

    fn seed_predictions(&self) {
        let seeds: [(&str, &str, Severity, u8, u32, u64, &str); 5] = [
            (
                "Database Server Disk Failure",
                "Predicted disk failure based on SMART data degradation",
                Severity::Critical,
                92,
                28,
                12_000,
                "Replace disk during maintenance window, migrate data to backup",
            ),
            (
                "Network Capacity Threshold",
                "Network bandwidth approaching 85% capacity",
                Severity::High,
                85,
                42,
                8_500,
                "Upgrade network infrastructure, add bandwidth capacity",
            ),
            (
                "Memory Exhaustion Risk",
                "Memory usage trending toward critical levels",
                Severity::High,
                88,
                36,
                6_200,
                "Increase memory allocation, optimize memory-intensive processes",
            ),
            (
                "SSL Certificate Expiration",
                "SSL certificate expires in 48 hours",
                Severity::Medium,
                100,
                48,
                3_000,
                "Renew SSL certificate, update configuration",
            ),
            (
                "Backup Storage Capacity",
                "Backup storage approaching 90% capacity",
                Severity::Medium,
                94,
                72,
                4_500,
                "Expand backup storage, archive old backups",
            ),
        ];

        let servers: Vec<_> = self.data.servers.iter().take(5).collect();
        let now = Utc::now();
        let mut predictions = write(&self.predictions);
        for (i, (title, what, severity, confidence, hours, impact, action)) in
            seeds.into_iter().enumerate()
        {
            let server = (!servers.is_empty()).then(|| servers[i % servers.len()]);
            let description = match server {
                Some(s) => format!("{}: {what}", s.hostname),
                None => what.to_string(),
            };
            // Oldest seed ends up last, matching insertion order.
            predictions.push_back(Prediction {
                id: self.next_id("PRED"),
                server_id: server.map(|s| s.server_id.clone()),
                server_name: server.map(|s| s.hostname.clone()),
                title: title.into(),
                description,
                severity,
                confidence,
                time_to_failure_hours: hours,
                estimated_impact_usd: impact,
                recommended_action: action.into(),
                ai_reasoning: String::new(),
                created_at: now,
            });
        }
        let seeded = predictions.len();
        drop(predictions);

        self.log_activity(
            AgentRole::Monitoring.display_name(),
            "System Initialized",
            format!("Generated {seeded} initial predictions"),
            ActivityLevel::Info,
        );
    }

    /// The read-only dataset the agents consult.
    pub fn data(&self) -> &DataContext {
        &self.data
    }

    /// A fresh record id such as `PRED-00042`.
    pub fn next_id(&self, prefix: &str) -> String {
        let n = self.record_seq.fetch_add(1, Ordering::Relaxed);
        format!("{prefix}-{n:05}")
    }

    // --- writers (cycle only) ---

    pub fn push_prediction(&self, prediction: Prediction) {
        push_capped(&mut write(&self.predictions), prediction, PREDICTION_CAP);
    }

    /// Store a decision and fold it into the running counters.
    ///
    /// Every decision counts toward the total; only autonomous ones count
    /// as actions and accrue prevention savings.
    pub fn push_decision(&self, decision: Decision) {
        {
            let mut counters = write(&self.counters);
            counters.total_decisions += 1;
            if decision.is_autonomous() {
                counters.autonomous_actions += 1;
                counters.prevention_savings += decision.prevention_savings();
            }
        }
        push_capped(&mut write(&self.decisions), decision, DECISION_CAP);
    }

    pub fn push_assignment(&self, assignment: Assignment) {
        push_capped(&mut write(&self.assignments), assignment, ASSIGNMENT_CAP);
    }

    /// Append an activity entry at the head of the feed.
    pub fn log_activity(
        &self,
        agent: impl Into<String>,
        action: impl Into<String>,
        details: impl Into<String>,
        level: ActivityLevel,
    ) -> ActivityLogEntry {
        let n = self.activity_seq.fetch_add(1, Ordering::Relaxed);
        let entry = ActivityLogEntry::new(format!("act-{n}"), agent, action, details, level);
        push_capped(&mut write(&self.activity), entry.clone(), ACTIVITY_LOG_CAP);
        entry
    }

    /// Mutate one agent's state in place.
    pub fn update_agent<R>(&self, role: AgentRole, f: impl FnOnce(&mut AgentState) -> R) -> Option<R> {
        let mut agents = write(&self.agents);
        agents.iter_mut().find(|a| a.role == role).map(f)
    }

    /// Set every agent except the orchestrator to `status`.
    pub fn set_worker_status(&self, status: AgentStatus) {
        for agent in write(&self.agents).iter_mut() {
            if agent.role != AgentRole::Orchestrator {
                agent.status = status;
            }
        }
    }

    /// Move prediction accuracy by `delta`, never above `cap`.
    pub fn drift_accuracy(&self, delta: f64, cap: f64) {
        let mut counters = write(&self.counters);
        counters.prediction_accuracy = (counters.prediction_accuracy + delta).min(cap);
    }

    /// Move the active-incident count by `delta`, never below zero.
    pub fn walk_incidents(&self, delta: i32) {
        let mut counters = write(&self.counters);
        counters.active_incidents = counters.active_incidents.saturating_add_signed(delta);
    }

    /// Account for one inference call.
    pub fn record_inference(&self, usage: Option<Usage>, fell_back: bool) {
        let mut counters = write(&self.counters);
        let stats = &mut counters.inference;
        stats.calls += 1;
        if fell_back {
            stats.fallbacks += 1;
        } else {
            stats.successes += 1;
        }
        if let Some(usage) = usage {
            stats.input_tokens += u64::from(usage.input_tokens);
            stats.output_tokens += u64::from(usage.output_tokens);
        }
    }

    // --- readers ---

    pub fn agents(&self) -> Vec<AgentState> {
        read(&self.agents).clone()
    }

    pub fn agent(&self, id: &str) -> Option<AgentState> {
        read(&self.agents).iter().find(|a| a.id == id).cloned()
    }

    pub fn active_agent_count(&self) -> usize {
        read(&self.agents)
            .iter()
            .filter(|a| a.status == AgentStatus::Active)
            .count()
    }

    /// Most recent decisions first.
    pub fn recent_decisions(&self, limit: usize) -> Vec<Decision> {
        newest(&read(&self.decisions), limit)
    }

    pub fn latest_decision(&self) -> Option<Decision> {
        read(&self.decisions).front().cloned()
    }

    pub fn decision(&self, id: &str) -> Option<Decision> {
        read(&self.decisions).iter().find(|d| d.id == id).cloned()
    }

    /// Most recent predictions first.
    pub fn predictions(&self, limit: usize) -> Vec<Prediction> {
        newest(&read(&self.predictions), limit)
    }

    pub fn activity(&self, limit: usize) -> Vec<ActivityLogEntry> {
        newest(&read(&self.activity), limit)
    }

    pub fn activity_len(&self) -> usize {
        read(&self.activity).len()
    }

    pub fn assignments(&self, limit: usize) -> Vec<Assignment> {
        newest(&read(&self.assignments), limit)
    }

    /// Recompute the metrics snapshot from current state.
    pub fn metrics(&self) -> MetricsSnapshot {
        let counters = read(&self.counters).clone();
        let predictions_tracked = read(&self.predictions).len();
        let autonomous_percentage = if counters.total_decisions == 0 {
            0.0
        } else {
            let pct = counters.autonomous_actions as f64 / counters.total_decisions as f64 * 100.0;
            (pct * 10.0).round() / 10.0
        };

        MetricsSnapshot {
            autonomous_actions: counters.autonomous_actions,
            total_decisions: counters.total_decisions,
            autonomous_percentage,
            prevention_savings: counters.prevention_savings,
            prediction_accuracy: counters.prediction_accuracy,
            active_incidents: counters.active_incidents,
            predictions_tracked,
            servers_monitored: self.data.servers.len(),
            clients_managed: self.data.clients.len(),
            inference: counters.inference,
        }
    }
}
