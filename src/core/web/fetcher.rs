use std::time::Duration;

use reqwest::header::{ACCEPT, USER_AGENT};
use tracing::{debug, warn};

use super::extract::extract_text;
use super::guard::ensure_public_destination;
use super::{FetchError, FetchResult, PageFetcher, normalize_url};

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Longest extracted text handed to the router
pub const DEFAULT_MAX_PAGE_CHARS: usize = 8000;

/// Most markup read from one page; the rest is discarded
pub const DEFAULT_MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub timeout: Duration,
    pub user_agent: String,
    pub max_chars: usize,
    pub max_body_bytes: usize,
    /// Permit loopback and private-network destinations
    pub allow_private_addresses: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            max_chars: DEFAULT_MAX_PAGE_CHARS,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            allow_private_addresses: false,
        }
    }
}

pub struct HttpPageFetcher {
    client: reqwest::Client,
    config: FetchConfig,
}

impl HttpPageFetcher {
    pub fn new(client: reqwest::Client, config: FetchConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }
}

#[async_trait::async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch_text(&self, raw_url: &str) -> FetchResult<String> {
        let url = normalize_url(raw_url)?;
        if !self.config.allow_private_addresses {
            ensure_public_destination(&url, self.config.timeout).await?;
        }

        debug!(url = %url, "Fetching page");
        let response = self
            .client
            .get(url.clone())
            .header(USER_AGENT, &self.config.user_agent)
            .header(ACCEPT, "text/html,application/xhtml+xml;q=0.9,*/*;q=0.8")
            .timeout(self.config.timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!(url = %url, status = %status, "Page fetch returned non-success status");
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = read_capped(response, self.config.max_body_bytes).await?;
        let text = extract_text(&body, self.config.max_chars);
        if text.is_empty() {
            return Err(FetchError::EmptyContent);
        }

        debug!(url = %url, chars = text.chars().count(), "Extracted page text");
        Ok(text)
    }
}

/// Read at most `limit` bytes of the body.
async fn read_capped(mut response: reqwest::Response, limit: usize) -> FetchResult<String> {
    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        let room = limit - body.len();
        if chunk.len() >= room {
            body.extend_from_slice(&chunk[..room]);
            debug!(limit, "Page body truncated");
            break;
        }
        body.extend_from_slice(&chunk);
    }
    Ok(String::from_utf8_lossy(&body).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn local_fetcher() -> HttpPageFetcher {
        HttpPageFetcher::new(
            reqwest::Client::new(),
            FetchConfig {
                allow_private_addresses: true,
                ..FetchConfig::default()
            },
        )
    }

    #[tokio::test]
    async fn test_fetches_and_extracts() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/article"))
            .and(header("user-agent", DEFAULT_USER_AGENT))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                "<html><body><script>x()</script><p>Ferris is a crab.</p></body></html>",
                "text/html",
            ))
            .expect(1)
            .mount(&server)
            .await;

        let text = local_fetcher()
            .fetch_text(&format!("{}/article", server.uri()))
            .await
            .unwrap();
        assert_eq!(text, "Ferris is a crab.");
    }

    #[tokio::test]
    async fn test_non_success_status_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string("<p>missing</p>"))
            .mount(&server)
            .await;

        let result = local_fetcher().fetch_text(&server.uri()).await;
        assert_eq!(result, Err(FetchError::Status(404)));
    }

    #[tokio::test]
    async fn test_timeout_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("<p>late</p>")
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let fetcher = HttpPageFetcher::new(
            reqwest::Client::new(),
            FetchConfig {
                timeout: Duration::from_millis(200),
                allow_private_addresses: true,
                ..FetchConfig::default()
            },
        );
        let result = fetcher.fetch_text(&server.uri()).await;
        assert!(matches!(result, Err(FetchError::Network(_))));
    }

    #[tokio::test]
    async fn test_blank_page_is_empty_content() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html><body> </body></html>"))
            .mount(&server)
            .await;

        let result = local_fetcher().fetch_text(&server.uri()).await;
        assert_eq!(result, Err(FetchError::EmptyContent));
    }

    #[tokio::test]
    async fn test_body_beyond_limit_is_discarded() {
        let server = MockServer::start().await;
        let page = format!("<p>alpha {}</p><p>omega</p>", "x".repeat(4096));
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(page))
            .mount(&server)
            .await;

        let fetcher = HttpPageFetcher::new(
            reqwest::Client::new(),
            FetchConfig {
                max_body_bytes: 1024,
                allow_private_addresses: true,
                ..FetchConfig::default()
            },
        );
        let text = fetcher.fetch_text(&server.uri()).await.unwrap();
        assert!(text.starts_with("alpha"));
        assert!(!text.contains("omega"));
        assert!(text.len() <= 1024);
    }

    #[tokio::test]
    async fn test_guard_blocks_local_server_by_default() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<p>secret</p>"))
            .expect(0)
            .mount(&server)
            .await;

        let fetcher = HttpPageFetcher::new(reqwest::Client::new(), FetchConfig::default());
        let result = fetcher.fetch_text(&server.uri()).await;
        assert!(matches!(result, Err(FetchError::Blocked(_))));
    }
}
