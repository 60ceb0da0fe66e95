//! Web search boundary.

mod serpapi;

use thiserror::Error;

pub use serpapi::{SERPAPI_BASE, SerpApiClient, SerpApiConfig};

pub type SearchResult<T> = Result<T, SearchError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SearchError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Provider error: {0}")]
    ProviderError(String),
}

/// The request URL carries the API key, so it is dropped from the message.
impl From<reqwest::Error> for SearchError {
    fn from(e: reqwest::Error) -> Self {
        SearchError::NetworkError(e.without_url().to_string())
    }
}

/// One ranked organic result.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SearchHit {
    pub title: String,
    pub link: Option<String>,
    pub snippet: Option<String>,
}

#[async_trait::async_trait]
pub trait WebSearch: Send + Sync {
    /// Ranked organic results for `query`, best first. An empty list means the
    /// engine found nothing.
    async fn search(&self, query: &str) -> SearchResult<Vec<SearchHit>>;
}
