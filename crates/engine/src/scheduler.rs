//! The cycle scheduler loop.
//!
//! Each cycle runs in its own task so a panic inside a step is caught at
//! the cycle boundary instead of unwinding through the loop. A failed
//! cycle is logged, followed by a short backoff, and the loop carries on.

use opsweave_core::error::CycleError;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

use crate::orchestrator::Orchestrator;

pub struct Scheduler {
    orchestrator: Arc<dyn Orchestrator>,
    failure_backoff: Duration,
    running: Arc<AtomicBool>,
}

impl Scheduler {
    pub fn new(orchestrator: Arc<dyn Orchestrator>, failure_backoff: Duration) -> Self {
        Self {
            orchestrator,
            failure_backoff,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Shared flag, true between loop start and loop exit.
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        self.running.clone()
    }

    /// Run cycles until `shutdown` turns true. Never returns early on error.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let period = self.orchestrator.cycle_interval();
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        self.running.store(true, Ordering::SeqCst);
        info!(mode = %self.orchestrator.mode(), interval_secs = period.as_secs(), "Cycle scheduler started");

        let mut attempt: u64 = 0;
        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = wait_for_shutdown(&mut shutdown) => break,
            }
            attempt += 1;

            let orchestrator = self.orchestrator.clone();
            let mut cycle = tokio::spawn(async move { orchestrator.run_cycle().await });

            let outcome = tokio::select! {
                joined = &mut cycle => joined,
                _ = wait_for_shutdown(&mut shutdown) => {
                    cycle.abort();
                    break;
                }
            };

            match outcome {
                Ok(report) => {
                    debug!(cycle_id = %report.cycle_id, "Cycle finished");
                }
                Err(join_error) => {
                    let err = if join_error.is_panic() {
                        let payload = join_error.into_panic();
                        let message = payload
                            .downcast_ref::<&str>()
                            .map(|s| s.to_string())
                            .or_else(|| payload.downcast_ref::<String>().cloned())
                            .unwrap_or_else(|| "unknown panic".into());
                        CycleError::Panicked {
                            cycle: attempt,
                            message,
                        }
                    } else {
                        CycleError::Cancelled { cycle: attempt }
                    };
                    error!(error = %err, backoff_ms = self.failure_backoff.as_millis() as u64, "Cycle failed, backing off");

                    tokio::select! {
                        _ = tokio::time::sleep(self.failure_backoff) => {}
                        _ = wait_for_shutdown(&mut shutdown) => break,
                    }
                }
            }
        }

        self.running.store(false, Ordering::SeqCst);
        info!("Cycle scheduler stopped");
    }
}

/// Resolves once the shutdown flag is set, or the sender is gone.
pub(crate) async fn wait_for_shutdown(rx: &mut watch::Receiver<bool>) {
    let _ = rx.wait_for(|stop| *stop).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::{Mode, Orchestrator};
    use crate::pipeline::{CycleReport, CycleStatus};
    use crate::store::StateStore;
    use crate::testing::{five_servers, store_with};
    use async_trait::async_trait;
    use std::sync::atomic::AtomicU64;

    /// Panics on its first cycle, then behaves.
    struct Flaky {
        store: StateStore,
        calls: AtomicU64,
    }

    #[async_trait]
    impl Orchestrator for Flaky {
        fn mode(&self) -> Mode {
            Mode::Simulated
        }

        fn cycle_interval(&self) -> Duration {
            Duration::from_secs(5)
        }

        fn store(&self) -> &StateStore {
            &self.store
        }

        async fn run_cycle(&self) -> CycleReport {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n == 1 {
                panic!("security step exploded");
            }
            CycleReport {
                cycle_id: format!("CYCLE-{n:05}"),
                started_at: chrono::Utc::now(),
                agents_executed: Vec::new(),
                skipped: Vec::new(),
                status: CycleStatus::Completed,
                error: None,
            }
        }

        fn last_cycle(&self) -> Option<CycleReport> {
            None
        }
    }

    #[tokio::test(start_paused = true)]
    async fn panicking_cycle_does_not_stop_the_loop() {
        let flaky = Arc::new(Flaky {
            store: store_with(five_servers()),
            calls: AtomicU64::new(0),
        });
        let scheduler = Scheduler::new(flaky.clone(), Duration::from_secs(1));
        let running = scheduler.running_flag();
        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(scheduler.run(rx));

        // First tick fires at once and panics; two more periods follow.
        tokio::time::sleep(Duration::from_secs(11)).await;
        assert!(running.load(Ordering::SeqCst));
        assert!(flaky.calls.load(Ordering::SeqCst) >= 3);

        tx.send(true).unwrap();
        handle.await.unwrap();
        assert!(!running.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_ticking() {
        let flaky = Arc::new(Flaky {
            store: store_with(five_servers()),
            calls: AtomicU64::new(1),
        });
        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(Scheduler::new(flaky.clone(), Duration::from_secs(1)).run(rx));

        tokio::time::sleep(Duration::from_millis(100)).await;
        tx.send(true).unwrap();
        handle.await.unwrap();

        let after = flaky.calls.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(flaky.calls.load(Ordering::SeqCst), after);
    }
}
