use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Raw failure reported by a [`crate::lookup::SearchService`].
///
/// Never shown to the user as-is; the controller always runs it through
/// [`crate::controller::classify`] first.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("network unavailable: {0}")]
    Connectivity(String),

    #[error("lookup timed out: {0}")]
    TimedOut(String),

    #[error("lookup service returned HTTP {status}")]
    Status { status: u16 },

    #[error("malformed lookup response: {0}")]
    Decode(String),

    #[error("lookup failed: {0}")]
    Other(String),
}

/// User-facing failure taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    NetworkUnavailable,
    Timeout,
    Unknown,
}

impl ErrorKind {
    pub fn user_message(self) -> &'static str {
        match self {
            ErrorKind::NetworkUnavailable => {
                "Please check your internet connection and try again."
            }
            ErrorKind::Timeout => "The search took too long. Please try again.",
            ErrorKind::Unknown => "Something went wrong. Please try again later.",
        }
    }
}
