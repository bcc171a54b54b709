use super::error::ErrorKind;
use super::types::Book;

/// What the UI should currently show for the search screen.
///
/// Exactly one variant is active. Only [`crate::SearchController`] constructs
/// transitions; observers receive clones.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SearchState {
    #[default]
    Idle,
    Searching {
        query: String,
    },
    /// A completed search. An empty `items` is "no results", which is not `Idle`.
    Results {
        items: Vec<Book>,
    },
    Failed {
        message: String,
        cause: ErrorKind,
    },
}

impl SearchState {
    pub fn failed(cause: ErrorKind) -> Self {
        SearchState::Failed {
            message: cause.user_message().to_string(),
            cause,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, SearchState::Idle)
    }

    pub fn is_searching(&self) -> bool {
        matches!(self, SearchState::Searching { .. })
    }

    /// True once some query has finished, successfully or not.
    pub fn has_completed(&self) -> bool {
        matches!(self, SearchState::Results { .. } | SearchState::Failed { .. })
    }

    pub fn items(&self) -> &[Book] {
        match self {
            SearchState::Results { items } => items,
            _ => &[],
        }
    }

    /// Result count, `None` unless the state is `Results`.
    pub fn count(&self) -> Option<usize> {
        match self {
            SearchState::Results { items } => Some(items.len()),
            _ => None,
        }
    }

    pub fn cause(&self) -> Option<ErrorKind> {
        match self {
            SearchState::Failed { cause, .. } => Some(*cause),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SearchState::Idle => "idle",
            SearchState::Searching { .. } => "searching",
            SearchState::Results { .. } => "results",
            SearchState::Failed { .. } => "failed",
        }
    }
}
