//! Response Router
//!
//! Picks one of three strategies for an utterance, first match wins:
//!
//! 1. the utterance carries a URL: fetch the page and ask the model for a summary
//! 2. it contains "search for" or "what is": ground the answer in web search snippets
//! 3. otherwise: send the utterance to the model as is
//!
//! Every backend failure ends in a fixed reply and the caller's history comes
//! back unchanged. Only a successful model call extends the history.

use std::fmt;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use tracing::{debug, info, warn};

use super::llm::{ConversationHistory, ConversationModel};
use super::search::WebSearch;
use super::web::PageFetcher;

/// Reply when the model call fails
pub const MODEL_FAILURE_REPLY: &str =
    "I'm sorry, I encountered an error while processing your request.";

/// Reply when the search engine has no organic results
pub const NO_SEARCH_RESULTS_REPLY: &str = "I couldn't find any relevant information on the web.";

/// Longest page excerpt placed in a summary prompt
pub const SUMMARY_EXCERPT_CHARS: usize = 4000;

/// Snippets used from the search results
pub const SEARCH_SNIPPET_COUNT: usize = 5;

const SEARCH_TRIGGERS: &[&str] = &["search for", "what is"];

static URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"https?://[^\s<>"]+|www\.[^\s<>"]+"#).expect("URL regex is valid")
});

/// Strategy chosen for an utterance
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    SummarizeUrl(String),
    WebSearch,
    Conversation,
}

impl Route {
    pub fn name(&self) -> &'static str {
        match self {
            Route::SummarizeUrl(_) => "summarize_url",
            Route::WebSearch => "web_search",
            Route::Conversation => "conversation",
        }
    }
}

/// Why a reply is a canned fallback instead of model output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReason {
    ModelFailed,
    PageUnavailable,
    SearchFailed,
    NoSearchResults,
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            FallbackReason::ModelFailed => "model_failed",
            FallbackReason::PageUnavailable => "page_unavailable",
            FallbackReason::SearchFailed => "search_failed",
            FallbackReason::NoSearchResults => "no_search_results",
        };
        f.write_str(reason)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RouterReply {
    pub text: String,
    pub history: ConversationHistory,
    /// `None` when `text` came from the model
    pub fallback: Option<FallbackReason>,
}

impl RouterReply {
    fn fallback(text: impl Into<String>, history: &ConversationHistory, reason: FallbackReason) -> Self {
        Self {
            text: text.into(),
            history: history.clone(),
            fallback: Some(reason),
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.fallback.is_some()
    }
}

/// First URL in `text`, without trailing sentence punctuation.
///
/// Matches `http://`, `https://` (lowercase scheme) and bare `www.` hosts.
pub fn extract_url(text: &str) -> Option<String> {
    let found = URL_PATTERN.find(text)?;
    let url = found
        .as_str()
        .trim_end_matches(['.', ',', ';', ':', '!', '?', ')', '\'']);
    (!url.is_empty()).then(|| url.to_string())
}

pub fn route(utterance: &str) -> Route {
    if let Some(url) = extract_url(utterance) {
        return Route::SummarizeUrl(url);
    }
    let lowered = utterance.to_lowercase();
    if SEARCH_TRIGGERS.iter().any(|trigger| lowered.contains(trigger)) {
        Route::WebSearch
    } else {
        Route::Conversation
    }
}

pub fn page_unavailable_reply(url: &str) -> String {
    format!("I couldn't fetch the content from {url}. Please check if the URL is valid and accessible.")
}

fn summary_prompt(url: &str, content: &str) -> String {
    let excerpt = match content.char_indices().nth(SUMMARY_EXCERPT_CHARS) {
        Some((cut, _)) => &content[..cut],
        None => content,
    };
    format!(
        "Please summarize the following webpage content from {url}. Focus on the main points and key information:\n\n{excerpt}"
    )
}

fn search_prompt(query: &str, snippets: &[Option<String>]) -> String {
    let context = snippets
        .iter()
        .map(|s| s.as_deref().unwrap_or(""))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "Based on the following search results, answer the user's query: '{query}'\n\nSearch Results:\n{context}"
    )
}

#[derive(Clone)]
pub struct ResponseRouter {
    model: Arc<dyn ConversationModel>,
    search: Arc<dyn WebSearch>,
    fetcher: Arc<dyn PageFetcher>,
}

impl ResponseRouter {
    pub fn new(
        model: Arc<dyn ConversationModel>,
        search: Arc<dyn WebSearch>,
        fetcher: Arc<dyn PageFetcher>,
    ) -> Self {
        Self {
            model,
            search,
            fetcher,
        }
    }

    /// Generate the reply to `utterance`.
    ///
    /// The returned history is `history` plus the new exchange, or `history`
    /// itself when the reply is a fallback.
    pub async fn respond(&self, utterance: &str, history: &ConversationHistory) -> RouterReply {
        let route = route(utterance);
        info!(route = route.name(), "Routing utterance");

        match route {
            Route::SummarizeUrl(url) => self.summarize_url(&url, history).await,
            Route::WebSearch => self.search_and_answer(utterance, history).await,
            Route::Conversation => self.converse(utterance, history).await,
        }
    }

    async fn summarize_url(&self, url: &str, history: &ConversationHistory) -> RouterReply {
        match self.fetcher.fetch_text(url).await {
            Ok(content) => self.converse(&summary_prompt(url, &content), history).await,
            Err(e) => {
                warn!(url = %url, "Page fetch failed: {}", e);
                RouterReply::fallback(
                    page_unavailable_reply(url),
                    history,
                    FallbackReason::PageUnavailable,
                )
            }
        }
    }

    async fn search_and_answer(&self, query: &str, history: &ConversationHistory) -> RouterReply {
        let hits = match self.search.search(query).await {
            Ok(hits) => hits,
            Err(e) => {
                warn!("Web search failed: {}", e);
                return RouterReply::fallback(
                    MODEL_FAILURE_REPLY,
                    history,
                    FallbackReason::SearchFailed,
                );
            }
        };

        if hits.is_empty() {
            return RouterReply::fallback(
                NO_SEARCH_RESULTS_REPLY,
                history,
                FallbackReason::NoSearchResults,
            );
        }

        let snippets: Vec<Option<String>> = hits
            .into_iter()
            .take(SEARCH_SNIPPET_COUNT)
            .map(|hit| hit.snippet)
            .collect();
        debug!(snippets = snippets.len(), "Answering from search results");

        self.converse(&search_prompt(query, &snippets), history).await
    }

    async fn converse(&self, prompt: &str, history: &ConversationHistory) -> RouterReply {
        match self.model.generate(prompt, history).await {
            Ok(text) => RouterReply {
                history: history.with_exchange(prompt, text.as_str()),
                text,
                fallback: None,
            },
            Err(e) => {
                warn!("Conversational model failed: {}", e);
                RouterReply::fallback(MODEL_FAILURE_REPLY, history, FallbackReason::ModelFailed)
            }
        }
    }
}
