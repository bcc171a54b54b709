pub mod config;
pub mod error;
pub mod state;
pub mod types;

pub use error::{ErrorKind, LookupError};
pub use state::SearchState;
