//! Webpage fetch boundary.
//!
//! [`PageFetcher`] turns a URL into readable text: the page is downloaded,
//! markup is stripped and whitespace collapsed. [`HttpPageFetcher`] is the
//! production implementation; it refuses private destinations unless told
//! otherwise.

mod extract;
mod fetcher;
mod guard;

use thiserror::Error;
use url::Url;

pub use extract::extract_text;
pub use fetcher::{
    DEFAULT_MAX_BODY_BYTES, DEFAULT_MAX_PAGE_CHARS, DEFAULT_USER_AGENT, FetchConfig,
    HttpPageFetcher,
};
pub use guard::{is_private_ip, is_private_ipv4, is_private_ipv6};

pub type FetchResult<T> = Result<T, FetchError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Destination not allowed: {0}")]
    Blocked(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP status {0}")]
    Status(u16),

    #[error("Page has no readable text")]
    EmptyContent,
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        let e = e.without_url();
        if e.is_timeout() {
            FetchError::Network(format!("Request timed out: {e}"))
        } else {
            FetchError::Network(e.to_string())
        }
    }
}

#[async_trait::async_trait]
pub trait PageFetcher: Send + Sync {
    /// Readable text of the page at `url`, already bounded in length.
    async fn fetch_text(&self, url: &str) -> FetchResult<String>;
}

/// Parse a URL as it appears in speech transcripts.
///
/// Bare `www.` hosts are fetched over `https://`. Only `http` and `https`
/// are accepted.
pub fn normalize_url(raw: &str) -> FetchResult<Url> {
    let raw = raw.trim();
    let candidate = if raw
        .get(..4)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("www."))
    {
        format!("https://{raw}")
    } else {
        raw.to_string()
    };

    let parsed = Url::parse(&candidate).map_err(|e| FetchError::InvalidUrl(format!("{raw}: {e}")))?;
    match parsed.scheme() {
        "http" | "https" => {}
        other => {
            return Err(FetchError::InvalidUrl(format!(
                "unsupported scheme '{other}'"
            )));
        }
    }
    if parsed.host_str().is_none() {
        return Err(FetchError::InvalidUrl(format!("{raw}: missing host")));
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_www_gets_https() {
        let url = normalize_url("www.rust-lang.org/learn").unwrap();
        assert_eq!(url.as_str(), "https://www.rust-lang.org/learn");
    }

    #[test]
    fn test_explicit_scheme_kept() {
        let url = normalize_url("http://example.com").unwrap();
        assert_eq!(url.scheme(), "http");
        assert_eq!(url.host_str(), Some("example.com"));
    }

    #[test]
    fn test_rejects_other_schemes() {
        assert!(matches!(
            normalize_url("ftp://example.com/file"),
            Err(FetchError::InvalidUrl(_))
        ));
        assert!(matches!(
            normalize_url("not a url"),
            Err(FetchError::InvalidUrl(_))
        ));
    }
}
