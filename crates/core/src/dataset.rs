//! Synthetic infrastructure records the agents reason about.
//!
//! A [`DataContext`] is built once at startup (see `opsweave-dataset`) and
//! is read-only afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub client_id: String,
    pub company_name: String,
    pub industry: String,
    pub contract_value_usd: u64,
    pub health_score: u8,
}

/// Point-in-time utilisation of a server.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ServerMetrics {
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub disk_usage_percent: f64,
    pub network_mbps: f64,
    pub uptime_days: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Server {
    pub server_id: String,
    pub client_id: String,
    pub hostname: String,
    pub server_type: String,
    pub os: String,
    pub current_metrics: ServerMetrics,
    pub risk_score: u8,
    pub criticality: String,
}

impl Server {
    /// CPU or memory strictly above `threshold` percent.
    pub fn exceeds(&self, threshold: f64) -> bool {
        self.current_metrics.cpu_percent > threshold
            || self.current_metrics.memory_percent > threshold
    }
}

/// A historical incident, used by the learning agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Incident {
    pub incident_id: String,
    pub server_id: String,
    pub incident_type: String,
    pub detected_at: DateTime<Utc>,
    pub downtime_minutes: u32,
    pub business_impact_usd: u64,
    pub prevention_cost_usd: u64,
    pub was_preventable: bool,
}

/// A decision from before the process started, used by the financial agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalDecision {
    pub decision_id: String,
    pub decision_type: String,
    pub estimated_cost_usd: u64,
    pub estimated_impact_usd: u64,
    pub decided_at: DateTime<Utc>,
}

/// Everything the agents may consult. Built at startup, read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataContext {
    pub clients: Vec<Client>,
    pub servers: Vec<Server>,
    pub incidents: Vec<Incident>,
    pub decisions: Vec<HistoricalDecision>,
}

impl DataContext {
    /// Servers whose CPU or memory is strictly above `threshold` percent.
    pub fn at_risk_servers(&self, threshold: f64) -> Vec<&Server> {
        self.servers.iter().filter(|s| s.exceeds(threshold)).collect()
    }

    pub fn server(&self, server_id: &str) -> Option<&Server> {
        self.servers.iter().find(|s| s.server_id == server_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server(id: &str, cpu: f64, memory: f64) -> Server {
        Server {
            server_id: id.into(),
            client_id: "CLT-1".into(),
            hostname: format!("{id}-host"),
            server_type: "APP-PROD".into(),
            os: "Ubuntu 22.04 LTS".into(),
            current_metrics: ServerMetrics {
                cpu_percent: cpu,
                memory_percent: memory,
                disk_usage_percent: 50.0,
                network_mbps: 100.0,
                uptime_days: 10,
            },
            risk_score: 40,
            criticality: "critical".into(),
        }
    }

    #[test]
    fn at_risk_uses_strict_threshold() {
        let ctx = DataContext {
            servers: vec![
                server("a", 85.0, 40.0),
                server("b", 85.1, 40.0),
                server("c", 20.0, 92.0),
            ],
            ..Default::default()
        };
        let ids: Vec<&str> = ctx
            .at_risk_servers(85.0)
            .iter()
            .map(|s| s.server_id.as_str())
            .collect();
        assert_eq!(ids, vec!["b", "c"]);
    }

    #[test]
    fn server_lookup() {
        let ctx = DataContext {
            servers: vec![server("a", 10.0, 10.0)],
            ..Default::default()
        };
        assert!(ctx.server("a").is_some());
        assert!(ctx.server("zzz").is_none());
    }
}
