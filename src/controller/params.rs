use super::normalize::normalize;
use super::{SearchController, SearchHandle};
use crate::core::types::{QueryParameters, SortOption};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// What a parameter change did to the session.
#[derive(Debug)]
pub enum Requery {
    /// Value unchanged, or nothing has completed yet to refresh.
    Skipped,
    /// Waiting out the debounce window.
    Deferred(PendingRequery),
    /// Re-query issued immediately (zero debounce).
    Issued(SearchHandle),
}

impl Requery {
    pub fn is_skipped(&self) -> bool {
        matches!(self, Requery::Skipped)
    }

    pub async fn settled(self) {
        match self {
            Requery::Skipped => {}
            Requery::Deferred(pending) => pending.settled().await,
            Requery::Issued(handle) => handle.settled().await,
        }
    }
}

/// A debounced re-query that fires only if no newer change or search replaced it.
#[derive(Debug)]
pub struct PendingRequery {
    task: JoinHandle<Option<SearchHandle>>,
}

impl PendingRequery {
    /// Wait for the window to close and, if this change won, for its search.
    pub async fn settled(self) {
        match self.task.await {
            Ok(Some(handle)) => handle.settled().await,
            Ok(None) => {}
            Err(e) => warn!(error = %e, "re-query timer ended abnormally"),
        }
    }
}

impl SearchController {
    pub fn params(&self) -> QueryParameters {
        self.shared.lock_session().params
    }

    pub fn set_sort_by(&self, sort_by: SortOption) -> Requery {
        self.update_params(|p| p.sort_by = sort_by)
    }

    pub fn set_include_translations(&self, include_translations: bool) -> Requery {
        self.update_params(|p| p.include_translations = include_translations)
    }

    pub fn set_params(&self, params: QueryParameters) -> Requery {
        self.update_params(|p| *p = params)
    }

    /// Store the edit, then re-query the last query if a search has completed.
    ///
    /// While `Idle` or `Searching` the change is only stored. Changes inside
    /// one debounce window collapse into a single re-query using the values
    /// current when the window closes.
    fn update_params(&self, edit: impl FnOnce(&mut QueryParameters)) -> Requery {
        let mut session = self.shared.lock_session();
        let before = session.params;
        edit(&mut session.params);
        let after = session.params;
        if after == before {
            return Requery::Skipped;
        }

        debug!(
            sort = %after.sort_by,
            include_translations = after.include_translations,
            state = session.state.label(),
            "query parameters changed"
        );
        if !session.state.has_completed() {
            return Requery::Skipped;
        }

        session.requery_token += 1;
        let debounce = self.shared.settings.requery_debounce;
        if debounce.is_zero() {
            let Ok(query) = normalize(&session.query) else {
                debug!("no query on record; re-query skipped");
                return Requery::Skipped;
            };
            info!(query = %query, "re-querying with updated parameters");
            return Requery::Issued(self.start(session, query.into_string(), after, Duration::ZERO));
        }

        let token = session.requery_token;
        let generation = session.generation;
        drop(session);

        let controller = self.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            controller.fire_requery(token, generation)
        });
        Requery::Deferred(PendingRequery { task })
    }

    fn fire_requery(&self, token: u64, generation: u64) -> Option<SearchHandle> {
        let session = self.shared.lock_session();
        if session.requery_token != token || session.generation != generation {
            debug!(token, generation, "re-query superseded");
            return None;
        }
        if session.params == session.last_params {
            debug!("parameters match the displayed search; re-query skipped");
            return None;
        }

        let params = session.params;
        let Ok(query) = normalize(&session.query) else {
            debug!("no query on record; re-query skipped");
            return None;
        };
        info!(query = %query, "re-querying with updated parameters");
        Some(self.start(session, query.into_string(), params, Duration::ZERO))
    }
}
