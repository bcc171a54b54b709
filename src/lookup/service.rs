use crate::core::types::{Book, SortOption};
use crate::core::LookupError;
use async_trait::async_trait;

/// Remote book-metadata lookup consumed by the controller.
///
/// Implementations must be cheap to share behind an `Arc`; the controller may
/// have several calls in flight when the user types faster than the service
/// answers.
#[async_trait]
pub trait SearchService: Send + Sync {
    async fn search(
        &self,
        query: &str,
        sort_by: SortOption,
        include_translations: bool,
    ) -> Result<Vec<Book>, LookupError>;
}
