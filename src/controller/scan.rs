use super::normalize::normalize;
use super::{SearchController, SearchHandle};
use crate::core::types::{ScanEvent, ScanOutcome};
use crate::core::{ErrorKind, SearchState};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub const SCAN_CHANNEL_CAPACITY: usize = 16;

/// Scanner-side end of the scan channel. Clone it into every scanner integration.
#[derive(Debug, Clone)]
pub struct ScanSender {
    tx: mpsc::Sender<ScanEvent>,
}

/// Controller-side end; hand it to [`SearchController::attach_scanner`].
#[derive(Debug)]
pub struct ScanReceiver {
    rx: mpsc::Receiver<ScanEvent>,
}

#[derive(Debug, Error)]
#[error("scan bridge is not attached (event for code '{}')", .0.code)]
pub struct ScanChannelClosed(pub ScanEvent);

pub fn scan_channel() -> (ScanSender, ScanReceiver) {
    let (tx, rx) = mpsc::channel(SCAN_CHANNEL_CAPACITY);
    (ScanSender { tx }, ScanReceiver { rx })
}

impl ScanSender {
    pub async fn send(&self, event: ScanEvent) -> Result<(), ScanChannelClosed> {
        self.tx.send(event).await.map_err(|e| ScanChannelClosed(e.0))
    }

    /// For scanner callbacks running on a plain OS thread. Panics inside an async context.
    pub fn blocking_send(&self, event: ScanEvent) -> Result<(), ScanChannelClosed> {
        self.tx.blocking_send(event).map_err(|e| ScanChannelClosed(e.0))
    }
}

impl SearchController {
    /// Apply one scanner outcome to the session.
    ///
    /// Scanned results and scan failures supersede any in-flight search just
    /// like a new submit would. An empty successful scan falls back to a
    /// regular search for the code.
    pub fn on_scan_event(&self, event: ScanEvent) -> Option<SearchHandle> {
        let ScanEvent { code, outcome } = event;
        let code = code.trim();

        match outcome {
            ScanOutcome::Success(items) if items.is_empty() => {
                if normalize(code).is_err() {
                    debug!("scan produced an empty code; returning to idle");
                    self.clear();
                    return None;
                }
                debug!(code = %code, "scan matched nothing; searching for the code instead");
                self.search(code)
            }
            ScanOutcome::Success(items) => {
                if code.is_empty() {
                    warn!(
                        count = items.len(),
                        "scan results carry no code; parameter changes cannot re-query them"
                    );
                }
                let mut session = self.shared.lock_session();
                let params = session.params;
                let generation = session.begin(code, params);
                info!(code = %code, count = items.len(), generation, "scan produced results");
                self.shared.commit(session, SearchState::Results { items });
                None
            }
            ScanOutcome::Failure(reason) => {
                let mut session = self.shared.lock_session();
                let params = session.params;
                let generation = session.begin(code, params);
                warn!(code = %code, reason = %reason, generation, "barcode scan failed");
                self.shared.commit(
                    session,
                    SearchState::Failed {
                        message: format!("Barcode search failed: {}", reason),
                        cause: ErrorKind::Unknown,
                    },
                );
                None
            }
        }
    }

    /// Drain scanner events into the session, in arrival order, until every
    /// [`ScanSender`] is dropped.
    pub fn attach_scanner(&self, receiver: ScanReceiver) -> JoinHandle<()> {
        let controller = self.clone();
        let mut rx = receiver.rx;
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                // Lookups started here are reconciled by the generation guard.
                let _ = controller.on_scan_event(event);
            }
            debug!("scanner channel closed; bridge stopped");
        })
    }
}
