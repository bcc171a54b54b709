//! Search session controller.
//!
//! [`SearchController`] owns the single [`SearchState`] the UI observes and is
//! the only place transitions happen. Typed searches, barcode scan events,
//! retries and parameter re-queries all funnel through the same session lock.
//!
//! Every transition that supersedes in-flight work bumps the session
//! generation. A lookup completion is applied only while its generation is
//! still current, so responses land in completion order but a superseded
//! request can never overwrite newer state. Cancellation is logical: the
//! stale request is allowed to finish and its result is dropped.
//!
//! ```text
//! Idle --submit(non-empty)--> Searching --ok--> Results
//!                                       --err-> Failed
//! Results/Failed --submit|retry|re-query--> Searching
//! any --clear--> Idle
//! ```

mod classify;
pub mod normalize;
mod observer;
mod params;
mod retry;
mod scan;

pub use classify::classify;
pub use normalize::{normalize, NormalizedQuery, Rejected};
pub use observer::{Listener, SubscriptionId};
pub use params::{PendingRequery, Requery};
pub use scan::{scan_channel, ScanChannelClosed, ScanReceiver, ScanSender, SCAN_CHANNEL_CAPACITY};

use crate::core::config::FolioConfig;
use crate::core::types::{Book, QueryParameters};
use crate::core::{LookupError, SearchState};
use crate::lookup::SearchService;
use futures::FutureExt;
use observer::Notifier;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(400);
pub const DEFAULT_REQUERY_DEBOUNCE: Duration = Duration::from_millis(250);

/// Timing policy for the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerSettings {
    /// Single fixed wait between `retry()` and the actual lookup.
    pub retry_delay: Duration,
    /// Quiet window that coalesces parameter toggles. Zero re-queries inside the setter.
    pub requery_debounce: Duration,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            retry_delay: DEFAULT_RETRY_DELAY,
            requery_debounce: DEFAULT_REQUERY_DEBOUNCE,
        }
    }
}

impl From<&FolioConfig> for ControllerSettings {
    fn from(config: &FolioConfig) -> Self {
        Self {
            retry_delay: config.resolve_retry_delay(),
            requery_debounce: config.resolve_requery_debounce(),
        }
    }
}

pub(crate) struct Session {
    state: SearchState,
    /// Most recently submitted (or scanned) query.
    query: String,
    /// Parameter store; edited by the setters in `params`.
    params: QueryParameters,
    /// Snapshot the current attempt was issued with.
    last_params: QueryParameters,
    generation: u64,
    requery_token: u64,
}

impl Session {
    fn new(params: QueryParameters) -> Self {
        Self {
            state: SearchState::Idle,
            query: String::new(),
            params,
            last_params: params,
            generation: 0,
            requery_token: 0,
        }
    }

    fn supersede(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    fn begin(&mut self, query: &str, params: QueryParameters) -> u64 {
        self.query = query.to_string();
        self.last_params = params;
        self.supersede()
    }
}

struct Shared {
    service: Arc<dyn SearchService>,
    settings: ControllerSettings,
    session: Mutex<Session>,
    notifier: Notifier,
    state_tx: watch::Sender<SearchState>,
}

impl Shared {
    fn lock_session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_current(&self, generation: u64) -> bool {
        self.lock_session().generation == generation
    }

    /// Apply `next` and notify observers.
    ///
    /// The transition is queued before the session lock is released, so
    /// listeners see transitions in the order they were applied. Listeners run
    /// after the session lock is gone.
    fn commit(&self, mut session: MutexGuard<'_, Session>, next: SearchState) {
        debug!(
            from = session.state.label(),
            to = next.label(),
            generation = session.generation,
            "state transition"
        );
        session.state = next.clone();
        self.state_tx.send_replace(next.clone());

        let must_drain = self.notifier.enqueue(next);
        drop(session);
        if must_drain {
            self.notifier.drain();
        }
    }

    fn settle(&self, generation: u64, query: &str, outcome: Result<Vec<Book>, LookupError>) {
        let session = self.lock_session();
        if session.generation != generation {
            debug!(
                query = %query,
                generation,
                current = session.generation,
                "dropping stale response"
            );
            return;
        }

        let next = match outcome {
            Ok(items) => {
                info!(query = %query, count = items.len(), "search completed");
                SearchState::Results { items }
            }
            Err(err) => {
                let cause = classify(&err);
                warn!(query = %query, error = %err, ?cause, "search failed");
                SearchState::failed(cause)
            }
        };
        self.commit(session, next);
    }
}

/// Resolves when one lookup attempt has been applied or dropped as stale.
///
/// Dropping the handle does not cancel the attempt.
#[derive(Debug)]
pub struct SearchHandle {
    generation: u64,
    task: JoinHandle<()>,
}

impl SearchHandle {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub async fn settled(self) {
        if let Err(e) = self.task.await {
            warn!(generation = self.generation, error = %e, "lookup task ended abnormally");
        }
    }
}

/// Book search session: the single writer of [`SearchState`].
///
/// Cloning is cheap and every clone drives the same session. Methods that
/// start a lookup spawn onto the current tokio runtime and panic outside one.
#[derive(Clone)]
pub struct SearchController {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for SearchController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let session = self.shared.lock_session();
        f.debug_struct("SearchController")
            .field("state", &session.state.label())
            .field("query", &session.query)
            .field("params", &session.params)
            .field("generation", &session.generation)
            .finish()
    }
}

impl SearchController {
    pub fn new(service: Arc<dyn SearchService>) -> Self {
        Self::with_settings(service, ControllerSettings::default())
    }

    pub fn with_settings(service: Arc<dyn SearchService>, settings: ControllerSettings) -> Self {
        Self::build(service, settings, QueryParameters::default())
    }

    pub fn build(
        service: Arc<dyn SearchService>,
        settings: ControllerSettings,
        params: QueryParameters,
    ) -> Self {
        let (state_tx, _) = watch::channel(SearchState::Idle);
        Self {
            shared: Arc::new(Shared {
                service,
                settings,
                session: Mutex::new(Session::new(params)),
                notifier: Notifier::default(),
                state_tx,
            }),
        }
    }

    pub fn settings(&self) -> ControllerSettings {
        self.shared.settings
    }

    pub fn state(&self) -> SearchState {
        self.shared.lock_session().state.clone()
    }

    /// The most recently submitted or scanned query; empty after `clear()`.
    pub fn query(&self) -> String {
        self.shared.lock_session().query.clone()
    }

    /// Change-notification channel carrying the latest state.
    pub fn watch(&self) -> watch::Receiver<SearchState> {
        self.shared.state_tx.subscribe()
    }

    pub fn subscribe(&self, listener: Listener) -> SubscriptionId {
        self.shared.notifier.listeners().add(listener)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.shared.notifier.listeners().remove(id)
    }

    pub fn listener_count(&self) -> usize {
        self.shared.notifier.listeners().len()
    }

    /// Start a search for `raw` with an explicit parameter snapshot.
    ///
    /// Whitespace-only input is ignored and returns `None`. Otherwise the
    /// state is `Searching` before this returns and the lookup runs on a
    /// spawned task.
    pub fn submit(&self, raw: &str, params: QueryParameters) -> Option<SearchHandle> {
        let Ok(query) = normalize(raw) else {
            debug!("ignoring empty query");
            return None;
        };
        let session = self.shared.lock_session();
        Some(self.start(session, query.into_string(), params, Duration::ZERO))
    }

    /// [`submit`](Self::submit) with the parameter store's current values.
    pub fn search(&self, raw: &str) -> Option<SearchHandle> {
        let Ok(query) = normalize(raw) else {
            debug!("ignoring empty query");
            return None;
        };
        let session = self.shared.lock_session();
        let params = session.params;
        Some(self.start(session, query.into_string(), params, Duration::ZERO))
    }

    /// Return to `Idle`. Anything still in flight is dropped when it lands.
    pub fn clear(&self) {
        let mut session = self.shared.lock_session();
        session.supersede();
        session.query.clear();
        info!("search cleared");
        self.shared.commit(session, SearchState::Idle);
    }

    fn start(
        &self,
        mut session: MutexGuard<'_, Session>,
        query: String,
        params: QueryParameters,
        delay: Duration,
    ) -> SearchHandle {
        let generation = session.begin(&query, params);
        info!(
            query = %query,
            sort = %params.sort_by,
            include_translations = params.include_translations,
            generation,
            "search started"
        );
        self.shared.commit(
            session,
            SearchState::Searching {
                query: query.clone(),
            },
        );
        self.spawn_lookup(generation, query, params, delay)
    }

    fn spawn_lookup(
        &self,
        generation: u64,
        query: String,
        params: QueryParameters,
        delay: Duration,
    ) -> SearchHandle {
        let shared = Arc::clone(&self.shared);
        let task = tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
                if !shared.is_current(generation) {
                    debug!(query = %query, generation, "superseded before dispatch");
                    return;
                }
            }

            let lookup =
                shared
                    .service
                    .search(&query, params.sort_by, params.include_translations);
            let outcome = match AssertUnwindSafe(lookup).catch_unwind().await {
                Ok(outcome) => outcome,
                Err(_) => {
                    error!(query = %query, "lookup service panicked");
                    Err(LookupError::Other("lookup service panicked".to_string()))
                }
            };
            shared.settle(generation, &query, outcome);
        });

        SearchHandle { generation, task }
    }
}
