//! Shared fixtures for engine tests.

use async_trait::async_trait;
use opsweave_core::error::InferenceError;
use opsweave_core::{
    Client, DataContext, HistoricalDecision, Incident, InferenceClient, InferenceRequest,
    InferenceResponse, Server, ServerMetrics, Usage,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::store::StateStore;

pub fn server(id: &str, cpu: f64, memory: f64) -> Server {
    Server {
        server_id: id.into(),
        client_id: "CLT-1".into(),
        hostname: format!("{id}-host"),
        server_type: "APP-PROD".into(),
        os: "RHEL 8".into(),
        current_metrics: ServerMetrics {
            cpu_percent: cpu,
            memory_percent: memory,
            disk_usage_percent: 40.0,
            network_mbps: 120.0,
            uptime_days: 30,
        },
        risk_score: 50,
        criticality: "critical".into(),
    }
}

/// Five servers, two of them above the default 85% threshold.
pub fn five_servers() -> Vec<Server> {
    vec![
        server("SRV-A", 40.0, 50.0),
        server("SRV-B", 91.0, 60.0),
        server("SRV-C", 30.0, 30.0),
        server("SRV-D", 50.0, 88.5),
        server("SRV-E", 85.0, 85.0),
    ]
}

pub fn data_with(servers: Vec<Server>) -> DataContext {
    let now = chrono::Utc::now();
    DataContext {
        clients: vec![Client {
            client_id: "CLT-1".into(),
            company_name: "Acme Corp".into(),
            industry: "Finance".into(),
            contract_value_usd: 120_000,
            health_score: 80,
        }],
        incidents: (0..4)
            .map(|i| Incident {
                incident_id: format!("INC-{i}"),
                server_id: "SRV-A".into(),
                incident_type: "Disk Space Low".into(),
                detected_at: now,
                downtime_minutes: 30,
                business_impact_usd: 5_000,
                prevention_cost_usd: 500,
                was_preventable: i != 0,
            })
            .collect(),
        decisions: vec![HistoricalDecision {
            decision_id: "DEC-H1".into(),
            decision_type: "capacity_upgrade".into(),
            estimated_cost_usd: 1_000,
            estimated_impact_usd: 9_000,
            decided_at: now,
        }],
        servers,
    }
}

pub fn store_with(servers: Vec<Server>) -> StateStore {
    StateStore::new(Arc::new(data_with(servers)))
}

/// Always answers with the same text.
pub struct FixedClient {
    text: String,
    pub calls: AtomicU32,
}

impl FixedClient {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.into(),
            calls: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl InferenceClient for FixedClient {
    fn name(&self) -> &str {
        "fixed"
    }

    async fn invoke(&self, _request: InferenceRequest) -> Result<InferenceResponse, InferenceError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        Ok(InferenceResponse {
            text: self.text.clone(),
            usage: Some(Usage {
                input_tokens: 50,
                output_tokens: 10,
            }),
            model: "fixed-model".into(),
            stop_reason: Some("end_turn".into()),
        })
    }
}

/// Always fails, like an unreachable provider.
#[derive(Default)]
pub struct FailingClient {
    pub calls: AtomicU32,
}

#[async_trait]
impl InferenceClient for FailingClient {
    fn name(&self) -> &str {
        "failing"
    }

    async fn invoke(&self, _request: InferenceRequest) -> Result<InferenceResponse, InferenceError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        Err(InferenceError::Network("connection refused".into()))
    }
}
