use super::normalize::{normalize, Rejected};
use super::{SearchController, SearchHandle};
use crate::core::SearchState;
use tracing::{debug, info};

impl SearchController {
    /// Re-attempt the last query with the parameters it was issued with.
    ///
    /// The state becomes `Searching` at once, but the lookup waits out
    /// `retry_delay` first. A retry issued during that wait supersedes the
    /// pending one, so a burst of taps produces a single request. With no
    /// query to retry the session returns to `Idle`.
    pub fn retry(&self) -> Option<SearchHandle> {
        let mut session = self.shared.lock_session();
        let query = match normalize(&session.query) {
            Ok(q) => q,
            Err(Rejected) => {
                debug!("retry requested with no query; returning to idle");
                session.supersede();
                self.shared.commit(session, SearchState::Idle);
                return None;
            }
        };

        let params = session.last_params;
        let delay = self.shared.settings.retry_delay;
        info!(query = %query, delay_ms = delay.as_millis() as u64, "retrying search");
        Some(self.start(session, query.into_string(), params, delay))
    }
}
