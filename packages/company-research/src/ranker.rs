//! Candidate URL ranking.
//!
//! Asks a chat model to pick the 3-5 most useful search results for the
//! research objective. The model is told to answer with
//! `{"selected_urls": [...]}` and nothing else. Any failure along the way
//! (unreachable service, prose instead of JSON, an empty list) degrades to
//! the top raw search results, so ranking alone never stops a run.

use std::time::Duration;

use async_trait::async_trait;
use openai_client::{ChatRequest, Message, OpenAIClient, OpenAIError};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::catalog::Entity;
use crate::search::SearchResult;
use crate::security::ApiKey;

/// Search results shown to the model.
const PROMPT_RESULT_LIMIT: usize = 10;

/// URLs used when the model's answer can't be used.
const FALLBACK_URL_COUNT: usize = 3;

pub const DEFAULT_MODEL: &str = "deepseek/deepseek-r1-distill-llama-70b";
pub const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";

const SYSTEM_PROMPT: &str = "You are a URL selection assistant. Return only valid JSON objects.";

/// Text generation backend.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Return the raw completion for a system instruction and user prompt.
    async fn generate(&self, system: &str, prompt: &str) -> Result<String, OpenAIError>;
}

/// Chat model settings for URL selection.
pub struct ChatModel {
    client: OpenAIClient,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl ChatModel {
    /// OpenRouter-backed model with low-temperature defaults.
    pub fn openrouter(api_key: &ApiKey, model: impl Into<String>) -> Self {
        let client = OpenAIClient::new(api_key.expose())
            .with_base_url(OPENROUTER_BASE_URL)
            .with_timeout(Duration::from_secs(60));
        Self::new(client, model)
    }

    pub fn new(client: OpenAIClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
            max_tokens: 500,
            temperature: 0.1,
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.client = self.client.with_base_url(url);
        self
    }
}

#[async_trait]
impl TextGenerator for ChatModel {
    async fn generate(&self, system: &str, prompt: &str) -> Result<String, OpenAIError> {
        let request = ChatRequest::new(&self.model)
            .message(Message::system(system))
            .message(Message::user(prompt))
            .max_tokens(self.max_tokens)
            .temperature(self.temperature);

        let response = self.client.chat_completion(request).await?;
        Ok(response.content)
    }
}

/// Why the ranker fell back to raw search order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackReason {
    /// Reply parsed but `selected_urls` was empty or missing
    EmptySelection,
    /// Reply was not the expected JSON object
    MalformedReply,
    /// The model call itself failed
    ServiceUnavailable(String),
}

/// Where a ranking came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RankingSource {
    Model,
    Fallback(FallbackReason),
}

/// Ordered URLs to extract from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ranking {
    pub urls: Vec<String>,
    pub source: RankingSource,
}

impl Ranking {
    pub fn is_degraded(&self) -> bool {
        matches!(self.source, RankingSource::Fallback(_))
    }
}

#[derive(Serialize)]
struct PromptResult<'a> {
    title: &'a str,
    link: &'a str,
    snippet: &'a str,
}

#[derive(Deserialize)]
struct Selection {
    #[serde(default)]
    selected_urls: Vec<String>,
}

/// Ranks search results with a [`TextGenerator`].
pub struct CandidateRanker<G> {
    generator: G,
}

impl<G: TextGenerator> CandidateRanker<G> {
    pub fn new(generator: G) -> Self {
        Self { generator }
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    /// Pick the URLs worth extracting from.
    ///
    /// Never returns an empty list when `results` is non-empty.
    pub async fn rank(
        &self,
        entity: &Entity,
        objective: &str,
        results: &[SearchResult],
    ) -> Ranking {
        let prompt = ranking_prompt(entity, objective, results);

        let reply = match self.generator.generate(SYSTEM_PROMPT, &prompt).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(error = %e, network = e.is_network(), "URL selection call failed");
                return fallback(results, FallbackReason::ServiceUnavailable(e.to_string()));
            }
        };

        match parse_selection(&reply) {
            Ok(urls) => {
                info!(count = urls.len(), "Model selected URLs");
                Ranking {
                    urls,
                    source: RankingSource::Model,
                }
            }
            Err(reason) => {
                warn!(?reason, "Unusable URL selection, using top search results");
                fallback(results, reason)
            }
        }
    }
}

fn fallback(results: &[SearchResult], reason: FallbackReason) -> Ranking {
    Ranking {
        urls: results
            .iter()
            .take(FALLBACK_URL_COUNT)
            .map(|r| r.url.clone())
            .collect(),
        source: RankingSource::Fallback(reason),
    }
}

/// Build the user prompt for URL selection.
pub fn ranking_prompt(entity: &Entity, objective: &str, results: &[SearchResult]) -> String {
    let serp: Vec<PromptResult<'_>> = results
        .iter()
        .take(PROMPT_RESULT_LIMIT)
        .map(|r| PromptResult {
            title: &r.title,
            link: &r.url,
            snippet: &r.snippet,
        })
        .collect();
    let serp_json = serde_json::to_string_pretty(&serp).unwrap_or_default();

    format!(
        "You are a research assistant tasked with selecting the most relevant URLs for gathering information about {label}.\n\n\
         Research Objective: {objective}\n\n\
         Available Search Results: {serp_json}\n\n\
         Instructions:\n\
         1. Select 3-5 URLs that are most likely to contain information relevant to the research objective\n\
         2. Prioritize official company websites, investor relations pages, and reputable financial news sources\n\
         3. Avoid social media, forums, and unreliable sources\n\
         4. Return ONLY a JSON object with this exact format: {{\"selected_urls\": [\"url1\", \"url2\", \"url3\"]}}\n\
         5. Do not include any explanation or additional text\n\n\
         Response must be valid JSON only:",
        label = entity.label(),
    )
}

/// Strip a Markdown code fence (with optional `json` tag) around a reply.
pub fn strip_code_fence(reply: &str) -> &str {
    let reply = reply.trim();
    if !reply.starts_with("```") {
        return reply;
    }

    let body = reply.split("```").nth(1).unwrap_or_default();
    body.strip_prefix("json").unwrap_or(body).trim()
}

/// Parse a model reply into a non-empty URL list.
pub fn parse_selection(reply: &str) -> Result<Vec<String>, FallbackReason> {
    let selection: Selection = serde_json::from_str(strip_code_fence(reply))
        .map_err(|_| FallbackReason::MalformedReply)?;

    if selection.selected_urls.is_empty() {
        return Err(FallbackReason::EmptySelection);
    }
    Ok(selection.selected_urls)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockTextGenerator;

    fn results(n: usize) -> Vec<SearchResult> {
        (1..=n)
            .map(|i| {
                SearchResult::new(
                    format!("Result {i}"),
                    format!("https://example.com/{i}"),
                    format!("snippet {i}"),
                )
            })
            .collect()
    }

    fn apple() -> Entity {
        Entity::new("Apple Inc").with_ticker("AAPL")
    }

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```\n{}\n```"), "{}");
        assert_eq!(strip_code_fence("  {}  "), "{}");
        assert_eq!(
            strip_code_fence("```json\n{}\n```\nHope this helps!"),
            "{}"
        );
    }

    #[test]
    fn test_parse_selection_outcomes() {
        assert_eq!(
            parse_selection(r#"{"selected_urls": ["https://a.com", "https://b.com"]}"#).unwrap(),
            vec!["https://a.com", "https://b.com"]
        );
        assert_eq!(
            parse_selection(r#"{"selected_urls": []}"#),
            Err(FallbackReason::EmptySelection)
        );
        assert_eq!(
            parse_selection(r#"{"urls": ["https://a.com"]}"#),
            Err(FallbackReason::EmptySelection)
        );
        assert_eq!(
            parse_selection("Here are the best URLs: https://a.com"),
            Err(FallbackReason::MalformedReply)
        );
        assert_eq!(
            parse_selection(r#"["https://a.com"]"#),
            Err(FallbackReason::MalformedReply)
        );
    }

    #[test]
    fn test_prompt_limits_results() {
        let prompt = ranking_prompt(&apple(), "AI chip market share", &results(12));
        assert!(prompt.contains("Apple Inc (AAPL)"));
        assert!(prompt.contains("Research Objective: AI chip market share"));
        assert!(prompt.contains("https://example.com/10"));
        assert!(!prompt.contains("https://example.com/11"));
        assert!(prompt.contains("\"link\": \"https://example.com/1\""));
    }

    #[tokio::test]
    async fn test_model_selection_returned_as_is() {
        let generator = MockTextGenerator::new().with_reply(
            "```json\n{\"selected_urls\": [\"https://investor.apple.com\", \"not even a url\"]}\n```",
        );
        let ranker = CandidateRanker::new(generator);

        let ranking = ranker.rank(&apple(), "earnings", &results(5)).await;
        assert_eq!(ranking.source, RankingSource::Model);
        assert_eq!(ranking.urls, vec!["https://investor.apple.com", "not even a url"]);

        let calls = ranker.generator().calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, SYSTEM_PROMPT);
    }

    #[tokio::test]
    async fn test_malformed_reply_falls_back_to_top_three() {
        let ranker = CandidateRanker::new(MockTextGenerator::new().with_reply("I cannot help"));

        let ranking = ranker.rank(&apple(), "earnings", &results(5)).await;
        assert!(ranking.is_degraded());
        assert_eq!(
            ranking.urls,
            vec![
                "https://example.com/1",
                "https://example.com/2",
                "https://example.com/3"
            ]
        );
    }

    #[tokio::test]
    async fn test_unreachable_service_falls_back() {
        let ranker = CandidateRanker::new(MockTextGenerator::new().failing());

        let ranking = ranker.rank(&apple(), "earnings", &results(2)).await;
        assert!(matches!(
            ranking.source,
            RankingSource::Fallback(FallbackReason::ServiceUnavailable(_))
        ));
        assert_eq!(ranking.urls.len(), 2);
    }
}
