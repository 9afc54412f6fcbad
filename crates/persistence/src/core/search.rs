//! Search provider trait.

use async_trait::async_trait;

use crate::error::StorageResult;
use crate::types::{SearchBundle, SearchQuery, StoredResource};

use super::storage::ResourceStorage;

/// Result of a search operation.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    /// The requested page, ordered by last update then id.
    pub resources: Vec<StoredResource>,

    /// Size of the full filtered set.
    pub total: u64,
}

impl SearchResult {
    /// Creates a new search result.
    pub fn new(resources: Vec<StoredResource>, total: u64) -> Self {
        Self { resources, total }
    }

    /// Wraps the result in a searchset bundle.
    pub fn to_bundle(&self, query: &SearchQuery, base_url: &str) -> SearchBundle {
        SearchBundle::assemble(self, query, base_url)
    }
}

/// Filtered, paged search over one resource type.
///
/// Filters are ANDed. Only live records match. Results are ordered by
/// `last_updated` ascending with the id as tie-breaker, whether or not the
/// query is paged. The page and `total` are read from one consistent
/// snapshot.
#[async_trait]
pub trait SearchProvider: ResourceStorage {
    /// Executes a search.
    ///
    /// # Errors
    ///
    /// * `SearchError::InvalidParameter` - unknown filter, malformed value, or bad paging
    /// * `SearchError::Cancelled` / `SearchError::Timeout` - the query was interrupted
    async fn search(&self, query: &SearchQuery) -> StorageResult<SearchResult>;

    /// Counts matches without materializing them.
    async fn search_count(&self, query: &SearchQuery) -> StorageResult<u64>;
}
