//! Subscriber registry and the periodic snapshot broadcaster.
//!
//! Every subscriber gets a bounded `mpsc` queue. The broadcaster copies the
//! sender list before delivering, so connects and disconnects racing with a
//! broadcast never block it and a subscriber that vanishes mid-broadcast is
//! simply skipped. A closed queue is pruned; a full one misses this
//! snapshot and keeps its slot.

use chrono::Local;
use opsweave_core::error::DeliveryError;
use opsweave_core::{AgentState, Decision, MetricsSnapshot, Prediction};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, info, warn};

use crate::orchestrator::Orchestrator;
use crate::scheduler::wait_for_shutdown;

/// A registered subscriber's receiving end.
pub struct Subscription {
    pub id: u64,
    pub rx: mpsc::Receiver<Arc<str>>,
}

/// Outcome of one broadcast.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub delivered: usize,
    pub lagged: usize,
    pub pruned: usize,
}

pub struct SubscriberRegistry {
    subscribers: RwLock<HashMap<u64, mpsc::Sender<Arc<str>>>>,
    next_id: AtomicU64,
    buffer: usize,
}

impl SubscriberRegistry {
    pub fn new(buffer: usize) -> Self {
        Self {
            subscribers: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            buffer: buffer.max(1),
        }
    }

    /// Register a subscriber. Returns immediately.
    pub fn connect(&self) -> Subscription {
        let (tx, rx) = mpsc::channel(self.buffer);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.subscribers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, tx);
        info!(subscriber = id, "Subscriber connected");
        Subscription { id, rx }
    }

    pub fn disconnect(&self, id: u64) {
        let removed = self
            .subscribers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&id);
        if removed.is_some() {
            info!(subscriber = id, "Subscriber disconnected");
        }
    }

    pub fn len(&self) -> usize {
        self.subscribers.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deliver `payload` to everyone currently registered.
    pub fn broadcast(&self, payload: Arc<str>) -> DeliveryReport {
        let targets = self.targets();
        self.deliver_all(targets, payload)
    }

    /// Copy of the sender list; the lock is released before delivery.
    fn targets(&self) -> Vec<(u64, mpsc::Sender<Arc<str>>)> {
        self.subscribers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|(id, tx)| (*id, tx.clone()))
            .collect()
    }

    fn deliver_all(
        &self,
        targets: Vec<(u64, mpsc::Sender<Arc<str>>)>,
        payload: Arc<str>,
    ) -> DeliveryReport {
        let mut report = DeliveryReport::default();
        for (id, tx) in targets {
            match deliver(id, &tx, payload.clone()) {
                Ok(()) => report.delivered += 1,
                Err(e @ DeliveryError::Lagging(_)) => {
                    debug!(error = %e, "Skipping snapshot for slow subscriber");
                    report.lagged += 1;
                }
                Err(e) => {
                    warn!(error = %e, "Delivery failed, pruning subscriber");
                    self.disconnect(id);
                    report.pruned += 1;
                }
            }
        }
        report
    }
}

fn deliver(id: u64, tx: &mpsc::Sender<Arc<str>>, payload: Arc<str>) -> Result<(), DeliveryError> {
    tx.try_send(payload).map_err(|e| match e {
        TrySendError::Closed(_) => DeliveryError::Closed(id.to_string()),
        TrySendError::Full(_) => DeliveryError::Lagging(id.to_string()),
    })
}

/// The message pushed to every subscriber.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    #[serde(rename = "type")]
    pub kind: &'static str,
    /// Wall-clock `HH:MM:SS`
    pub timestamp: String,
    pub agents: Vec<AgentState>,
    pub recent_decision: Option<Decision>,
    pub predictions: Vec<Prediction>,
    pub metrics: MetricsSnapshot,
}

impl Snapshot {
    pub fn capture(orchestrator: &dyn Orchestrator, predictions: usize) -> Self {
        Self {
            kind: "system_update",
            timestamp: Local::now().format("%H:%M:%S").to_string(),
            agents: orchestrator.agent_statuses(),
            recent_decision: orchestrator.latest_decision(),
            predictions: orchestrator.predictions(predictions),
            metrics: orchestrator.metrics(),
        }
    }
}

/// Periodically snapshots the orchestrator and fans the snapshot out.
pub struct Broadcaster {
    orchestrator: Arc<dyn Orchestrator>,
    registry: Arc<SubscriberRegistry>,
    period: Duration,
    predictions: usize,
}

impl Broadcaster {
    pub fn new(
        orchestrator: Arc<dyn Orchestrator>,
        registry: Arc<SubscriberRegistry>,
        period: Duration,
        predictions: usize,
    ) -> Self {
        Self {
            orchestrator,
            registry,
            period,
            predictions,
        }
    }

    /// Build and push one snapshot. Skipped when nobody is listening.
    pub fn tick(&self) -> Option<DeliveryReport> {
        if self.registry.is_empty() {
            return None;
        }
        let snapshot = Snapshot::capture(self.orchestrator.as_ref(), self.predictions);
        let payload: Arc<str> = match serde_json::to_string(&snapshot) {
            Ok(json) => json.into(),
            Err(e) => {
                warn!(error = %e, "Failed to serialize snapshot");
                return None;
            }
        };
        let report = self.registry.broadcast(payload);
        debug!(
            delivered = report.delivered,
            lagged = report.lagged,
            pruned = report.pruned,
            "Snapshot broadcast"
        );
        Some(report)
    }

    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let start = tokio::time::Instant::now() + self.period;
        let mut ticker = tokio::time::interval_at(start, self.period);
        info!(interval_ms = self.period.as_millis() as u64, "Broadcaster started");

        loop {
            tokio::select! {
                _ = ticker.tick() => { self.tick(); }
                _ = wait_for_shutdown(&mut shutdown) => break,
            }
        }
        info!("Broadcaster stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::SimulatedOrchestrator;
    use crate::testing::{five_servers, store_with};
    use opsweave_config::AppConfig;

    fn orchestrator() -> Arc<dyn Orchestrator> {
        Arc::new(SimulatedOrchestrator::new(
            Arc::new(store_with(five_servers())),
            &AppConfig::default(),
        ))
    }

    #[test]
    fn dropped_subscriber_does_not_starve_the_others() {
        let registry = Arc::new(SubscriberRegistry::new(4));
        let mut a = registry.connect();
        let b = registry.connect();
        let mut c = registry.connect();
        drop(b);

        let broadcaster = Broadcaster::new(orchestrator(), registry.clone(), Duration::from_secs(2), 3);
        let report = broadcaster.tick().unwrap();
        assert_eq!(report.delivered, 2);
        assert_eq!(report.pruned, 1);
        assert_eq!(registry.len(), 2);

        for sub in [&mut a, &mut c] {
            let payload = sub.rx.try_recv().unwrap();
            let value: serde_json::Value = serde_json::from_str(&payload).unwrap();
            assert_eq!(value["type"], "system_update");
            assert_eq!(value["agents"].as_array().unwrap().len(), 8);
            assert_eq!(value["predictions"].as_array().unwrap().len(), 3);
        }
    }

    #[test]
    fn disconnect_after_sender_copy_does_not_starve_the_others() {
        let registry = SubscriberRegistry::new(4);
        let mut a = registry.connect();
        let b = registry.connect();
        let mut c = registry.connect();

        let targets = registry.targets();
        assert_eq!(targets.len(), 3);
        // The socket task disconnects and drops its receiver mid-broadcast.
        registry.disconnect(b.id);
        drop(b);

        let report = registry.deliver_all(targets, "snapshot".into());
        assert_eq!(report.delivered, 2);
        assert_eq!(report.pruned, 1);
        assert_eq!(registry.len(), 2);
        assert_eq!(&*a.rx.try_recv().unwrap(), "snapshot");
        assert_eq!(&*c.rx.try_recv().unwrap(), "snapshot");
    }

    #[test]
    fn disconnect_with_live_receiver_mid_broadcast_is_harmless() {
        let registry = SubscriberRegistry::new(4);
        let mut a = registry.connect();
        let b = registry.connect();

        let targets = registry.targets();
        registry.disconnect(b.id);

        let report = registry.deliver_all(targets, "late".into());
        assert_eq!(report.delivered, 2);
        assert_eq!(report.pruned, 0);
        assert_eq!(registry.len(), 1);
        assert_eq!(&*a.rx.try_recv().unwrap(), "late");
        assert_eq!(registry.broadcast("next".into()).delivered, 1);
    }

    #[test]
    fn full_queue_lags_without_pruning() {
        let registry = SubscriberRegistry::new(1);
        let _sub = registry.connect();
        assert_eq!(registry.broadcast("one".into()).delivered, 1);
        let report = registry.broadcast("two".into());
        assert_eq!(report.lagged, 1);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn no_subscribers_no_snapshot() {
        let registry = Arc::new(SubscriberRegistry::new(4));
        let broadcaster = Broadcaster::new(orchestrator(), registry, Duration::from_secs(2), 3);
        assert!(broadcaster.tick().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn run_pushes_on_its_own_period() {
        let registry = Arc::new(SubscriberRegistry::new(8));
        let mut sub = registry.connect();
        let (tx, rx) = watch::channel(false);
        let broadcaster = Broadcaster::new(orchestrator(), registry.clone(), Duration::from_secs(2), 3);
        let handle = tokio::spawn(broadcaster.run(rx));

        tokio::time::sleep(Duration::from_millis(4_500)).await;
        assert!(sub.rx.try_recv().is_ok());
        assert!(sub.rx.try_recv().is_ok());
        assert!(sub.rx.try_recv().is_err());

        tx.send(true).unwrap();
        handle.await.unwrap();
    }
}
