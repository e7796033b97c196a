//! Seeded synthetic dataset for OpsWeave.
//!
//! Produces the [`DataContext`] the agents reason about: clients, their
//! servers with current utilisation, historical incidents and historical
//! decisions. The same seed always yields the same dataset.

use chrono::{Duration, Utc};
use opsweave_config::DatasetConfig;
use opsweave_core::error::DatasetError;
use opsweave_core::{Client, DataContext, HistoricalDecision, Incident, Server, ServerMetrics};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

const COMPANY_NAMES: &[&str] = &[
    "Acme Corp",
    "TechStart Inc",
    "Global Solutions",
    "DataFlow Systems",
    "CloudFirst",
    "SecureNet",
    "InfoTech",
    "Digital Dynamics",
    "Smart Systems",
    "Innovate Inc",
    "NextGen Tech",
    "Alpha Solutions",
    "Beta Corp",
    "Gamma Systems",
    "Delta Tech",
    "Epsilon Inc",
    "Zeta Solutions",
    "Theta Corp",
    "Lambda Tech",
    "Omega Systems",
];

const INDUSTRIES: &[&str] = &[
    "Healthcare",
    "Finance",
    "Retail",
    "Manufacturing",
    "Technology",
    "Education",
    "Legal",
    "Consulting",
];

const SERVER_TYPES: &[&str] = &[
    "DB-PROD",
    "WEB-PROD",
    "APP-PROD",
    "DB-DEV",
    "WEB-DEV",
    "APP-DEV",
    "DC-SERVER",
    "FILE-SERVER",
    "MAIL-SERVER",
    "DNS-SERVER",
    "BACKUP-SERVER",
    "CACHE-SERVER",
    "ANALYTICS",
    "MONITORING",
];

const OPERATING_SYSTEMS: &[&str] = &[
    "Windows Server 2022",
    "Windows Server 2019",
    "Ubuntu 22.04 LTS",
    "CentOS 7",
    "RHEL 8",
];

const ISSUE_TYPES: &[&str] = &[
    "High CPU Usage",
    "Memory Leak",
    "Disk Space Low",
    "Network Latency",
    "SSL Certificate Expiring",
    "Backup Failure",
    "Service Down",
    "Security Vulnerability",
    "Performance Degradation",
    "Database Deadlock",
];

const DECISION_TYPES: &[&str] = &[
    "preventive_maintenance",
    "resource_allocation",
    "security_remediation",
    "capacity_upgrade",
    "vendor_purchase",
    "contract_renewal",
];

/// Uniform pick from a non-empty constant table.
fn pick<'a>(rng: &mut StdRng, items: &[&'a str]) -> &'a str {
    items[rng.random_range(0..items.len())]
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Deterministic dataset generator.
pub struct DatasetGenerator {
    rng: StdRng,
}

impl DatasetGenerator {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Generate a full context with the counts in `config`.
    ///
    /// Fails when no clients or no servers are requested, since every
    /// server belongs to a client and every incident to a server.
    pub fn generate(&mut self, config: &DatasetConfig) -> Result<DataContext, DatasetError> {
        if config.clients == 0 {
            return Err(DatasetError::Empty("clients"));
        }
        if config.servers == 0 {
            return Err(DatasetError::Empty("servers"));
        }

        let clients = self.clients(config.clients);
        let servers = self.servers(&clients, config.servers);
        let incidents = self.incidents(&servers, config.incidents);
        let decisions = self.decisions(config.decisions);

        info!(
            clients = clients.len(),
            servers = servers.len(),
            incidents = incidents.len(),
            decisions = decisions.len(),
            "Generated MSP dataset"
        );

        Ok(DataContext {
            clients,
            servers,
            incidents,
            decisions,
        })
    }

    fn id(&mut self, prefix: &str) -> String {
        format!("{prefix}-{:08X}", self.rng.random::<u32>())
    }

    fn clients(&mut self, count: usize) -> Vec<Client> {
        (0..count)
            .map(|i| {
                let monthly = self.rng.random_range(2_000..=50_000u64);
                Client {
                    client_id: self.id("CLT"),
                    company_name: COMPANY_NAMES[i % COMPANY_NAMES.len()].to_string(),
                    industry: pick(&mut self.rng, INDUSTRIES).to_string(),
                    contract_value_usd: monthly * 12,
                    health_score: self.rng.random_range(60..=100),
                }
            })
            .collect()
    }

    fn servers(&mut self, clients: &[Client], count: usize) -> Vec<Server> {
        (0..count)
            .map(|_| {
                let client = &clients[self.rng.random_range(0..clients.len())];
                let server_type = pick(&mut self.rng, SERVER_TYPES);

                // Production boxes run hotter.
                let production = server_type.ends_with("-PROD");
                let (base_cpu, base_memory) = if production {
                    (
                        self.rng.random_range(40.0..95.0),
                        self.rng.random_range(50.0..90.0),
                    )
                } else {
                    (
                        self.rng.random_range(20.0..80.0),
                        self.rng.random_range(30.0..75.0),
                    )
                };

                let current_metrics = ServerMetrics {
                    cpu_percent: round1(base_cpu + self.rng.random_range(-5.0..=5.0)),
                    memory_percent: round1(base_memory + self.rng.random_range(-5.0..=5.0)),
                    disk_usage_percent: round1(self.rng.random_range(30.0..85.0)),
                    network_mbps: round1(self.rng.random_range(10.0..500.0)),
                    uptime_days: self.rng.random_range(1..=365),
                };

                let criticality = if production {
                    "critical"
                } else {
                    pick(&mut self.rng, &["high", "medium", "low"])
                };

                Server {
                    server_id: self.id("SRV"),
                    client_id: client.client_id.clone(),
                    hostname: format!("{server_type}-{:02}", self.rng.random_range(1..=99)),
                    server_type: server_type.to_string(),
                    os: pick(&mut self.rng, OPERATING_SYSTEMS).to_string(),
                    current_metrics,
                    risk_score: self.rng.random_range(0..=100),
                    criticality: criticality.to_string(),
                }
            })
            .collect()
    }

    fn incidents(&mut self, servers: &[Server], count: usize) -> Vec<Incident> {
        let now = Utc::now();
        (0..count)
            .map(|_| {
                let server = &servers[self.rng.random_range(0..servers.len())];
                Incident {
                    incident_id: self.id("INC"),
                    server_id: server.server_id.clone(),
                    incident_type: pick(&mut self.rng, ISSUE_TYPES).to_string(),
                    detected_at: now - Duration::days(self.rng.random_range(1..=365)),
                    downtime_minutes: self.rng.random_range(0..=480),
                    business_impact_usd: self.rng.random_range(100..=50_000),
                    prevention_cost_usd: self.rng.random_range(50..=5_000),
                    // Three in four incidents were preventable.
                    was_preventable: self.rng.random_bool(0.75),
                }
            })
            .collect()
    }

    fn decisions(&mut self, count: usize) -> Vec<HistoricalDecision> {
        let now = Utc::now();
        (0..count)
            .map(|_| {
                let cost = self.rng.random_range(100..=15_000u64);
                let roi = self.rng.random_range(2.0..=20.0);
                HistoricalDecision {
                    decision_id: self.id("DEC"),
                    decision_type: pick(&mut self.rng, DECISION_TYPES).to_string(),
                    estimated_cost_usd: cost,
                    estimated_impact_usd: (cost as f64 * roi).round() as u64,
                    decided_at: now - Duration::hours(self.rng.random_range(1..=720)),
                }
            })
            .collect()
    }
}

/// Generate the startup context, seeded from config or from entropy.
pub fn generate(config: &DatasetConfig) -> Result<DataContext, DatasetError> {
    let seed = config.seed.unwrap_or_else(rand::random);
    DatasetGenerator::new(seed).generate(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> DatasetConfig {
        DatasetConfig {
            clients: 10,
            servers: 50,
            incidents: 30,
            decisions: 20,
            seed: Some(42),
        }
    }

    #[test]
    fn counts_match_config() {
        let ctx = generate(&small()).unwrap();
        assert_eq!(ctx.clients.len(), 10);
        assert_eq!(ctx.servers.len(), 50);
        assert_eq!(ctx.incidents.len(), 30);
        assert_eq!(ctx.decisions.len(), 20);
    }

    #[test]
    fn same_seed_same_dataset() {
        let a = DatasetGenerator::new(7).generate(&small()).unwrap();
        let b = DatasetGenerator::new(7).generate(&small()).unwrap();
        assert_eq!(a.servers, b.servers);
        assert_eq!(a.clients, b.clients);

        let c = DatasetGenerator::new(8).generate(&small()).unwrap();
        assert_ne!(a.servers, c.servers);
    }

    #[test]
    fn servers_belong_to_clients() {
        let ctx = generate(&small()).unwrap();
        for server in &ctx.servers {
            assert!(ctx.clients.iter().any(|c| c.client_id == server.client_id));
        }
        for incident in &ctx.incidents {
            assert!(ctx.server(&incident.server_id).is_some());
        }
    }

    #[test]
    fn production_servers_are_critical_and_hot() {
        let config = DatasetConfig {
            servers: 400,
            ..small()
        };
        let ctx = generate(&config).unwrap();
        for server in ctx.servers.iter().filter(|s| s.server_type.ends_with("-PROD")) {
            assert_eq!(server.criticality, "critical");
            assert!(server.current_metrics.cpu_percent >= 35.0);
            assert!(server.current_metrics.memory_percent >= 45.0);
            assert!(server.hostname.starts_with(&server.server_type));
        }
    }

    #[test]
    fn metrics_stay_in_range() {
        let ctx = generate(&small()).unwrap();
        for s in &ctx.servers {
            let m = s.current_metrics;
            assert!((15.0..=100.0).contains(&m.cpu_percent), "cpu {}", m.cpu_percent);
            assert!((30.0..=85.0).contains(&m.disk_usage_percent));
            assert!(s.risk_score <= 100);
        }
        for c in &ctx.clients {
            assert!((60..=100).contains(&c.health_score));
        }
    }

    #[test]
    fn empty_requests_rejected() {
        let no_clients = DatasetConfig {
            clients: 0,
            ..small()
        };
        assert!(matches!(
            generate(&no_clients),
            Err(DatasetError::Empty("clients"))
        ));

        let no_servers = DatasetConfig {
            servers: 0,
            ..small()
        };
        assert!(matches!(
            generate(&no_servers),
            Err(DatasetError::Empty("servers"))
        ));
    }
}
