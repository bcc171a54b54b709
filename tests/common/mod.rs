#![allow(dead_code)]

use async_trait::async_trait;
use folio_search::{Book, LookupError, SearchService, SortOption};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use tokio::sync::oneshot;

pub type Outcome = Result<Vec<Book>, LookupError>;

#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub query: String,
    pub sort_by: SortOption,
    pub include_translations: bool,
}

#[derive(Debug, Clone)]
pub enum Reply {
    Books(Vec<Book>),
    Offline,
    TimedOut,
}

/// In-memory lookup with per-query canned replies and one-shot gates for
/// controlling completion order. Unknown queries answer with zero books.
#[derive(Default)]
pub struct ScriptedService {
    calls: Mutex<Vec<Call>>,
    replies: Mutex<HashMap<String, Reply>>,
    gates: Mutex<HashMap<String, VecDeque<oneshot::Receiver<Outcome>>>>,
}

impl ScriptedService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(&self, query: &str, reply: Reply) {
        self.replies
            .lock()
            .unwrap()
            .insert(query.to_string(), reply);
    }

    /// The next call for `query` blocks until the returned sender fires.
    pub fn gate(&self, query: &str) -> oneshot::Sender<Outcome> {
        let (tx, rx) = oneshot::channel();
        self.gates
            .lock()
            .unwrap()
            .entry(query.to_string())
            .or_default()
            .push_back(rx);
        tx
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl SearchService for ScriptedService {
    async fn search(
        &self,
        query: &str,
        sort_by: SortOption,
        include_translations: bool,
    ) -> Result<Vec<Book>, LookupError> {
        self.calls.lock().unwrap().push(Call {
            query: query.to_string(),
            sort_by,
            include_translations,
        });

        let gate = self
            .gates
            .lock()
            .unwrap()
            .get_mut(query)
            .and_then(|pending| pending.pop_front());
        if let Some(rx) = gate {
            return rx
                .await
                .unwrap_or_else(|_| Err(LookupError::Other("gate dropped".into())));
        }

        let reply = self.replies.lock().unwrap().get(query).cloned();
        match reply {
            Some(Reply::Books(books)) => Ok(books),
            Some(Reply::Offline) => Err(LookupError::Connectivity(
                "The Internet connection appears to be offline.".into(),
            )),
            Some(Reply::TimedOut) => Err(LookupError::TimedOut(
                "operation timed out".into(),
            )),
            None => Ok(Vec::new()),
        }
    }
}

pub fn books(prefix: &str, n: usize) -> Vec<Book> {
    (1..=n)
        .map(|i| Book {
            id: format!("{}-{}", prefix, i),
            title: format!("{} volume {}", prefix, i),
            authors: vec!["Test Author".into()],
            ..Default::default()
        })
        .collect()
}
