//! Search-provider collaborator

mod tavily;

pub use tavily::TavilySearch;

use async_trait::async_trait;

use crate::error::SearchError;
use crate::state::SearchResult;

/// Web search capability used by the Search step
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Run one query, returning at most `max_results` results
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchResult>, SearchError>;

    /// Provider name for logging
    fn name(&self) -> &str;
}
