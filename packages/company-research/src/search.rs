//! Web search gateway.
//!
//! `WebSearcher` abstracts the search provider; `SerperSearcher` is the
//! Google-backed implementation. The pipeline goes through [`search_web`],
//! which turns every provider failure into an empty result list.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::SearchError;
use crate::security::ApiKey;

const SERPER_URL: &str = "https://google.serper.dev/search";
const SEARCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Upper bound on results the gateway hands to the ranker.
pub const MAX_RESULTS: usize = 10;

/// A single organic search hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

impl SearchResult {
    pub fn new(
        title: impl Into<String>,
        url: impl Into<String>,
        snippet: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            snippet: snippet.into(),
        }
    }
}

/// Web search provider.
#[async_trait]
pub trait WebSearcher: Send + Sync {
    /// Search the web, results ordered by provider relevance.
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, SearchError>;
}

/// Run a search, treating any provider failure as "no results".
pub async fn search_web<S: WebSearcher + ?Sized>(searcher: &S, query: &str) -> Vec<SearchResult> {
    match searcher.search(query).await {
        Ok(mut results) => {
            results.truncate(MAX_RESULTS);
            info!(query, count = results.len(), "Web search complete");
            results
        }
        Err(e) => {
            warn!(query, error = %e, "Web search failed");
            Vec::new()
        }
    }
}

#[derive(Debug, Serialize)]
struct SerperRequest<'a> {
    q: &'a str,
    num: usize,
    gl: &'a str,
    hl: &'a str,
}

#[derive(Debug, Deserialize)]
struct SerperResponse {
    #[serde(default)]
    organic: Vec<SerperResult>,
}

#[derive(Debug, Deserialize)]
struct SerperResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    snippet: String,
}

/// Serper (Google Search) client, US English results.
pub struct SerperSearcher {
    client: reqwest::Client,
    api_key: ApiKey,
}

impl SerperSearcher {
    pub fn new(api_key: ApiKey) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
        }
    }
}

#[async_trait]
impl WebSearcher for SerperSearcher {
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, SearchError> {
        info!(query, "Serper search");

        let request = SerperRequest {
            q: query,
            num: MAX_RESULTS,
            gl: "us",
            hl: "en",
        };

        let response = self
            .client
            .post(SERPER_URL)
            .header("X-API-KEY", self.api_key.expose())
            .header("Content-Type", "application/json")
            .timeout(SEARCH_TIMEOUT)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SearchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let data: SerperResponse = response.json().await?;

        Ok(data
            .organic
            .into_iter()
            .map(|r| SearchResult {
                title: r.title,
                url: r.link,
                snippet: r.snippet,
            })
            .collect())
    }
}
