//! Background scheduler that drives [`TariffCoordinator::refresh`].
//!
//! `RefreshDaemon` runs a tokio interval loop. The coordinator stays
//! synchronous; each cycle runs on the blocking pool so a slow endpoint never
//! stalls the runtime.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{MissedTickBehavior, interval};

use crate::error::UpdateFailed;
use crate::refresh::TariffCoordinator;
use crate::sparql::SparqlTransport;
use crate::tariff::TariffSnapshot;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Scheduling parameters for the daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DaemonConfig {
    /// Time between refreshes (default: 24 h). The first refresh fires immediately.
    pub interval: Duration,
    /// Maximum refresh cycles (0 = unlimited).
    pub max_cycles: usize,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(24 * 3600),
            max_cycles: 0,
        }
    }
}

/// Outcome of one scheduled refresh.
pub type CycleOutcome = Result<Arc<TariffSnapshot>, UpdateFailed>;

// ---------------------------------------------------------------------------
// Daemon
// ---------------------------------------------------------------------------

/// Long-running loop that refreshes one coordinator on a fixed period.
pub struct RefreshDaemon<T> {
    coordinator: Arc<TariffCoordinator<T>>,
    config: DaemonConfig,
    total_cycles: usize,
}

impl<T: SparqlTransport + 'static> RefreshDaemon<T> {
    pub fn new(coordinator: Arc<TariffCoordinator<T>>, config: DaemonConfig) -> Self {
        Self {
            coordinator,
            config,
            total_cycles: 0,
        }
    }

    /// A daemon using the coordinator's configured update interval.
    pub fn from_coordinator(coordinator: Arc<TariffCoordinator<T>>) -> Self {
        let config = DaemonConfig {
            interval: coordinator.update_interval(),
            ..DaemonConfig::default()
        };
        Self::new(coordinator, config)
    }

    /// Run until Ctrl+C or until `max_cycles` refreshes have completed.
    ///
    /// `on_cycle` receives the cycle number (starting at 1) and its outcome.
    /// Returns the number of completed cycles.
    pub async fn run<F>(&mut self, on_cycle: F) -> usize
    where
        F: FnMut(usize, &CycleOutcome),
    {
        self.run_until(ctrl_c(), on_cycle).await
    }

    /// Like [`run`](Self::run), stopping when `shutdown` resolves instead of on Ctrl+C.
    ///
    /// `shutdown` is polled while waiting for the next tick and while a
    /// refresh is in flight. A refresh interrupted this way is abandoned: it
    /// finishes on the blocking pool but is neither counted nor reported.
    pub async fn run_until<S, F>(&mut self, shutdown: S, mut on_cycle: F) -> usize
    where
        S: Future<Output = ()>,
        F: FnMut(usize, &CycleOutcome),
    {
        tokio::pin!(shutdown);

        let mut tick = interval(self.config.interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            interval_secs = self.config.interval.as_secs(),
            max_cycles = self.config.max_cycles,
            "daemon started"
        );

        loop {
            tokio::select! {
                _ = tick.tick() => {}
                _ = &mut shutdown => {
                    tracing::info!("daemon: received shutdown signal");
                    break;
                }
            }

            let outcome = tokio::select! {
                outcome = self.run_cycle() => outcome,
                _ = &mut shutdown => {
                    tracing::info!("daemon: received shutdown signal during refresh");
                    break;
                }
            };

            self.total_cycles += 1;
            on_cycle(self.total_cycles, &outcome);
            if self.config.max_cycles > 0 && self.total_cycles >= self.config.max_cycles {
                tracing::info!(
                    max_cycles = self.config.max_cycles,
                    "daemon: max cycles reached, shutting down"
                );
                break;
            }
        }

        tracing::info!(cycles = self.total_cycles, "daemon stopped");
        self.total_cycles
    }

    async fn run_cycle(&self) -> CycleOutcome {
        let coordinator = Arc::clone(&self.coordinator);
        match tokio::task::spawn_blocking(move || coordinator.refresh()).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(error = %e, "daemon: refresh task did not complete");
                Err(UpdateFailed {
                    message: format!("refresh task did not complete: {e}"),
                })
            }
        }
    }
}

/// Resolves on the first Ctrl+C.
///
/// If the signal handler cannot be installed this never resolves, leaving
/// `max_cycles` as the only way out.
async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "daemon: cannot listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TariffConfig;
    use crate::error::{TransportError, TransportResult};
    use crate::sparql::Binding;

    struct Unreachable;

    /// Blocks every query for `delay`, then fails.
    struct Slow {
        delay: Duration,
    }

    impl SparqlTransport for Slow {
        fn select(&self, _query: &str) -> TransportResult<Vec<Binding>> {
            std::thread::sleep(self.delay);
            Err(TransportError::Network {
                endpoint: "test".into(),
                message: "timed out".into(),
            })
        }
    }

    fn slow_daemon(delay: Duration) -> RefreshDaemon<Slow> {
        let config = TariffConfig::new("https://x/m/1", "", 2024);
        let coordinator = Arc::new(TariffCoordinator::new(config, Slow { delay }));
        RefreshDaemon::new(
            coordinator,
            DaemonConfig {
                interval: Duration::from_secs(3600),
                max_cycles: 0,
            },
        )
    }

    impl SparqlTransport for Unreachable {
        fn select(&self, _query: &str) -> TransportResult<Vec<Binding>> {
            Err(TransportError::Network {
                endpoint: "test".into(),
                message: "unreachable".into(),
            })
        }
    }

    #[test]
    fn from_coordinator_uses_update_interval() {
        let mut config = TariffConfig::new("https://x/m/1", "", 2024);
        config.update_interval_hours = 6;
        let coordinator = Arc::new(TariffCoordinator::new(config, Unreachable));
        let daemon = RefreshDaemon::from_coordinator(coordinator);
        assert_eq!(daemon.config.interval, Duration::from_secs(6 * 3600));
        assert_eq!(daemon.config.max_cycles, 0);
    }

    #[tokio::test]
    async fn stops_after_max_cycles_and_reports_each_outcome() {
        let config = TariffConfig::new("https://x/m/1", "", 2024);
        let coordinator = Arc::new(TariffCoordinator::new(config, Unreachable));
        let mut daemon = RefreshDaemon::new(
            Arc::clone(&coordinator),
            DaemonConfig {
                interval: Duration::from_millis(5),
                max_cycles: 3,
            },
        );

        let mut seen = Vec::new();
        let cycles = daemon
            .run_until(std::future::pending(), |n, outcome| {
                seen.push((n, outcome.is_err()))
            })
            .await;

        assert_eq!(cycles, 3);
        assert_eq!(seen, vec![(1, true), (2, true), (3, true)]);
        assert!(!coordinator.last_update_success());
        assert!(coordinator.last_error().unwrap().contains("unreachable"));
    }

    #[tokio::test]
    async fn shutdown_during_refresh_stops_without_waiting_for_it() {
        let mut daemon = slow_daemon(Duration::from_millis(800));
        let mut seen = 0;
        let started = std::time::Instant::now();

        let cycles = tokio::time::timeout(
            Duration::from_secs(5),
            daemon.run_until(tokio::time::sleep(Duration::from_millis(100)), |_, _| seen += 1),
        )
        .await
        .expect("daemon kept running after shutdown");

        assert_eq!(cycles, 0);
        assert_eq!(seen, 0);
        assert!(started.elapsed() < Duration::from_millis(700));
    }

    #[tokio::test]
    async fn shutdown_between_ticks_stops_the_loop() {
        let mut daemon = slow_daemon(Duration::from_millis(10));
        let cycles = tokio::time::timeout(
            Duration::from_secs(5),
            daemon.run_until(tokio::time::sleep(Duration::from_millis(200)), |_, _| {}),
        )
        .await
        .expect("daemon kept running after shutdown");
        assert_eq!(cycles, 1);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn sigint_during_refresh_stops_run() {
        let mut daemon = slow_daemon(Duration::from_millis(800));
        let pid = std::process::id().to_string();
        let signaller = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(300));
            std::process::Command::new("kill")
                .args(["-INT", &pid])
                .status()
                .unwrap()
        });

        let cycles = tokio::time::timeout(Duration::from_secs(5), daemon.run(|_, _| {}))
            .await
            .expect("daemon kept running after Ctrl+C");

        assert!(signaller.join().unwrap().success());
        assert_eq!(cycles, 0);
    }
}
