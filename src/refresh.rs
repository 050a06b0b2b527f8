//! The refresh coordinator: one discover, fetch, parse cycle at a time, with
//! the last good snapshot kept across failures.

use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use tracing::{info, warn};

use crate::client::TariffClient;
use crate::config::TariffConfig;
use crate::error::{TariffResult, UpdateFailed};
use crate::sparql::SparqlTransport;
use crate::tariff::TariffSnapshot;

/// State observed by readers between refreshes.
#[derive(Debug, Clone, Default)]
pub struct CoordinatorState {
    /// Last successfully built snapshot, if any.
    pub snapshot: Option<Arc<TariffSnapshot>>,
    /// Whether the most recent refresh succeeded.
    pub last_update_success: bool,
    /// Diagnostic message of the most recent failure, cleared on success.
    pub last_error: Option<String>,
}

impl CoordinatorState {
    /// Whether there is a snapshot to read, fresh or not.
    pub fn available(&self) -> bool {
        self.snapshot.is_some()
    }

    /// A snapshot exists but the latest refresh failed.
    pub fn is_stale(&self) -> bool {
        self.snapshot.is_some() && !self.last_update_success
    }
}

/// Periodic tariff refresh for one configured municipality and year.
pub struct TariffCoordinator<T> {
    config: TariffConfig,
    client: TariffClient<T>,
    state: RwLock<CoordinatorState>,
    in_flight: Mutex<()>,
}

impl<T: SparqlTransport> TariffCoordinator<T> {
    /// Create a coordinator. No query is sent until [`refresh`](Self::refresh).
    pub fn new(config: TariffConfig, transport: T) -> Self {
        let client = TariffClient::from_config(transport, &config);
        Self::with_client(config, client)
    }

    pub fn with_client(config: TariffConfig, client: TariffClient<T>) -> Self {
        Self {
            config,
            client,
            state: RwLock::new(CoordinatorState::default()),
            in_flight: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &TariffConfig {
        &self.config
    }

    pub fn client(&self) -> &TariffClient<T> {
        &self.client
    }

    pub fn update_interval(&self) -> Duration {
        self.config.update_interval()
    }

    /// A copy of the current state.
    pub fn state(&self) -> CoordinatorState {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn snapshot(&self) -> Option<Arc<TariffSnapshot>> {
        self.state().snapshot
    }

    pub fn last_update_success(&self) -> bool {
        self.state().last_update_success
    }

    pub fn last_error(&self) -> Option<String> {
        self.state().last_error
    }

    /// Run one refresh cycle.
    ///
    /// Concurrent callers wait for the cycle in flight and then run their own.
    /// On success the snapshot is replaced wholesale; on failure the previous
    /// snapshot stays in place and the error is recorded.
    pub fn refresh(&self) -> Result<Arc<TariffSnapshot>, UpdateFailed> {
        let _guard = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);

        let outcome = self.build_snapshot();
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        match outcome {
            Ok(snapshot) => {
                let snapshot = Arc::new(snapshot);
                info!(
                    municipality = %self.config.municipality_uri,
                    year = self.config.year,
                    components = snapshot.values().len(),
                    "tariff refresh succeeded"
                );
                state.snapshot = Some(Arc::clone(&snapshot));
                state.last_update_success = true;
                state.last_error = None;
                Ok(snapshot)
            }
            Err(e) => {
                let failed = UpdateFailed::from(e);
                warn!(
                    municipality = %self.config.municipality_uri,
                    year = self.config.year,
                    error = %failed.message,
                    "tariff refresh failed"
                );
                state.last_update_success = false;
                state.last_error = Some(failed.message.clone());
                Err(failed)
            }
        }
    }

    fn build_snapshot(&self) -> TariffResult<TariffSnapshot> {
        let predicates = self.client.discover_model()?;
        let triples = self.client.fetch_observations(
            &self.config.municipality_uri,
            self.config.year,
            &predicates,
        )?;
        let parsed = self.client.parse(&triples);
        Ok(TariffSnapshot::new(
            parsed,
            self.config.municipality_label.clone(),
            self.config.municipality_uri.clone(),
            self.config.year,
        ))
    }
}
