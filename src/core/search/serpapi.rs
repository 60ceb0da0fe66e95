use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, error};

use super::{SearchError, SearchHit, SearchResult, WebSearch};

/// SerpAPI base URL
pub const SERPAPI_BASE: &str = "https://serpapi.com";

#[derive(Clone)]
pub struct SerpApiConfig {
    pub api_key: String,
    /// Search engine name (`google`)
    pub engine: String,
    /// Hits kept from the organic results
    pub max_results: usize,
    pub request_timeout: Duration,
    pub endpoint_override: Option<String>,
}

impl SerpApiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            engine: "google".to_string(),
            max_results: 5,
            request_timeout: Duration::from_secs(30),
            endpoint_override: None,
        }
    }

    fn search_url(&self) -> String {
        let base = self
            .endpoint_override
            .as_deref()
            .unwrap_or(SERPAPI_BASE)
            .trim_end_matches('/');
        format!("{base}/search")
    }
}

#[derive(Debug, Deserialize)]
struct OrganicResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: Option<String>,
    #[serde(default)]
    snippet: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    organic_results: Option<Vec<OrganicResult>>,
    #[serde(default)]
    error: Option<String>,
}

pub struct SerpApiClient {
    client: reqwest::Client,
    config: SerpApiConfig,
}

impl SerpApiClient {
    pub fn new(client: reqwest::Client, config: SerpApiConfig) -> SearchResult<Self> {
        if config.api_key.is_empty() {
            return Err(SearchError::InvalidConfiguration(
                "API key is required for SerpAPI".to_string(),
            ));
        }
        Ok(Self { client, config })
    }
}

#[async_trait::async_trait]
impl WebSearch for SerpApiClient {
    async fn search(&self, query: &str) -> SearchResult<Vec<SearchHit>> {
        debug!("SerpAPI search: {}", query);

        let response = self
            .client
            .get(self.config.search_url())
            .query(&[
                ("engine", self.config.engine.as_str()),
                ("q", query),
                ("api_key", self.config.api_key.as_str()),
            ])
            .timeout(self.config.request_timeout)
            .send()
            .await?;

        let status = response.status();
        let body: SearchResponse = match response.json().await {
            Ok(body) => body,
            Err(e) if status.is_success() => {
                return Err(SearchError::ProviderError(format!(
                    "Malformed SerpAPI response: {}",
                    e.without_url()
                )));
            }
            Err(_) => {
                return Err(SearchError::ProviderError(format!(
                    "SerpAPI returned {status}"
                )));
            }
        };

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(SearchError::AuthenticationFailed(
                body.error.unwrap_or_else(|| "Invalid API key".to_string()),
            ));
        }

        match body.organic_results {
            Some(results) => Ok(results
                .into_iter()
                .take(self.config.max_results)
                .map(|r| SearchHit {
                    title: r.title,
                    link: r.link,
                    snippet: r.snippet,
                })
                .collect()),
            // SerpAPI reports "no results" through `error` on a successful search
            None if status.is_success() => {
                if let Some(message) = body.error {
                    debug!("SerpAPI returned no organic results: {}", message);
                }
                Ok(Vec::new())
            }
            None => {
                let message = body.error.unwrap_or_else(|| status.to_string());
                error!("SerpAPI search failed: {}", message);
                Err(SearchError::ProviderError(message))
            }
        }
    }
}
