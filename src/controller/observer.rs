use crate::core::SearchState;
use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::error;

/// Callback invoked after every state transition.
///
/// No controller lock is held while a listener runs, so it may read the
/// controller or even start another transition; that transition is delivered
/// after the current one.
pub type Listener = Box<dyn Fn(&SearchState) + Send + Sync>;

type SharedListener = Arc<dyn Fn(&SearchState) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Default)]
pub(crate) struct Listeners {
    next_id: u64,
    entries: Vec<(SubscriptionId, SharedListener)>,
}

impl Listeners {
    pub(crate) fn add(&mut self, listener: Listener) -> SubscriptionId {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        self.entries.push((id, Arc::from(listener)));
        id
    }

    pub(crate) fn remove(&mut self, id: SubscriptionId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(existing, _)| *existing != id);
        self.entries.len() != before
    }

    /// Registration order.
    fn snapshot(&self) -> Vec<SharedListener> {
        self.entries.iter().map(|(_, l)| Arc::clone(l)).collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

#[derive(Default)]
struct Outbox {
    pending: VecDeque<SearchState>,
    draining: bool,
}

/// Ordered delivery of transitions to listeners.
///
/// `enqueue` runs under the session lock, so the outbox holds transitions in
/// the order they were applied. Exactly one thread drains at a time and it
/// calls listeners with no lock held.
#[derive(Default)]
pub(crate) struct Notifier {
    listeners: Mutex<Listeners>,
    outbox: Mutex<Outbox>,
}

impl Notifier {
    pub(crate) fn listeners(&self) -> MutexGuard<'_, Listeners> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn outbox(&self) -> MutexGuard<'_, Outbox> {
        self.outbox.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue `state`. Returns true when the caller must [`drain`](Self::drain).
    pub(crate) fn enqueue(&self, state: SearchState) -> bool {
        let mut outbox = self.outbox();
        outbox.pending.push_back(state);
        if outbox.draining {
            false
        } else {
            outbox.draining = true;
            true
        }
    }

    pub(crate) fn drain(&self) {
        loop {
            let next = {
                let mut outbox = self.outbox();
                match outbox.pending.pop_front() {
                    Some(state) => state,
                    None => {
                        outbox.draining = false;
                        return;
                    }
                }
            };

            let listeners = self.listeners().snapshot();
            for listener in listeners {
                let delivered =
                    std::panic::catch_unwind(AssertUnwindSafe(|| listener(&next)));
                if delivered.is_err() {
                    error!(state = next.label(), "state listener panicked");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder(
        notifier: &Notifier,
        tag: &'static str,
        seen: &Arc<Mutex<Vec<String>>>,
    ) -> SubscriptionId {
        let seen = Arc::clone(seen);
        notifier.listeners().add(Box::new(move |s: &SearchState| {
            seen.lock().unwrap().push(format!("{}:{}", tag, s.label()))
        }))
    }

    #[test]
    fn test_notify_in_registration_order_and_remove() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let notifier = Notifier::default();

        let a = recorder(&notifier, "a", &seen);
        let _b = recorder(&notifier, "b", &seen);

        assert!(notifier.enqueue(SearchState::Idle));
        notifier.drain();
        assert!(notifier.listeners().remove(a));
        assert!(!notifier.listeners().remove(a));
        assert!(notifier.enqueue(SearchState::Results { items: vec![] }));
        notifier.drain();

        assert_eq!(notifier.listeners().len(), 1);
        assert_eq!(
            *seen.lock().unwrap(),
            vec!["a:idle", "b:idle", "b:results"]
        );
    }

    #[test]
    fn test_enqueue_while_draining_is_delivered_by_the_drainer() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let notifier = Notifier::default();
        recorder(&notifier, "x", &seen);

        assert!(notifier.enqueue(SearchState::Idle));
        // A second producer arriving mid-drain leaves delivery to the first.
        assert!(!notifier.enqueue(SearchState::Results { items: vec![] }));
        notifier.drain();

        assert_eq!(*seen.lock().unwrap(), vec!["x:idle", "x:results"]);
        assert!(notifier.enqueue(SearchState::Idle));
    }

    #[test]
    fn test_panicking_listener_does_not_stop_delivery() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let notifier = Notifier::default();
        notifier
            .listeners()
            .add(Box::new(|_: &SearchState| {
                panic!("listener bug");
            }));
        recorder(&notifier, "ok", &seen);

        assert!(notifier.enqueue(SearchState::Idle));
        notifier.drain();
        assert!(notifier.enqueue(SearchState::Idle));
        notifier.drain();

        assert_eq!(*seen.lock().unwrap(), vec!["ok:idle", "ok:idle"]);
    }
}
