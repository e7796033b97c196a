//! Supervises the scheduler and broadcaster loops under one shutdown signal.

use opsweave_config::{BroadcastConfig, SchedulerConfig};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::broadcast::{Broadcaster, SubscriberRegistry};
use crate::orchestrator::Orchestrator;
use crate::scheduler::Scheduler;

pub struct Runtime {
    shutdown: watch::Sender<bool>,
    scheduler: JoinHandle<()>,
    broadcaster: JoinHandle<()>,
    running: Arc<AtomicBool>,
}

impl Runtime {
    /// Spawn both loops. Must be called from within a tokio runtime.
    pub fn start(
        orchestrator: Arc<dyn Orchestrator>,
        registry: Arc<SubscriberRegistry>,
        scheduler: &SchedulerConfig,
        broadcast: &BroadcastConfig,
    ) -> Self {
        let (shutdown, rx) = watch::channel(false);

        let loop_ = Scheduler::new(
            orchestrator.clone(),
            Duration::from_millis(scheduler.failure_backoff_ms),
        );
        let running = loop_.running_flag();
        let scheduler = tokio::spawn(loop_.run(rx.clone()));

        let broadcaster = Broadcaster::new(
            orchestrator,
            registry,
            Duration::from_millis(broadcast.interval_ms),
            broadcast.snapshot_predictions,
        );
        let broadcaster = tokio::spawn(broadcaster.run(rx));

        Self {
            shutdown,
            scheduler,
            broadcaster,
            running,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Flag the gateway reports as `running`.
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        self.running.clone()
    }

    /// Signal both loops and wait for them to exit.
    pub async fn shutdown(self) {
        info!("Stopping scheduler and broadcaster");
        let _ = self.shutdown.send(true);
        let (scheduler, broadcaster) = futures::future::join(self.scheduler, self.broadcaster).await;
        for (name, result) in [("scheduler", scheduler), ("broadcaster", broadcaster)] {
            if let Err(e) = result {
                warn!(task = name, error = %e, "Background task ended abnormally");
            }
        }
    }
}
