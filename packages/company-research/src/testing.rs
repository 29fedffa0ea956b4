//! Testing utilities including mock collaborators.
//!
//! These let the pipeline run end to end without network access. Every mock
//! records its calls so tests can assert which stages ran.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use openai_client::OpenAIError;
use serde_json::Value;

use crate::error::{ExtractApiError, SearchError};
use crate::extract::{ExtractRequest, ExtractionApi, StatusResponse, SubmitResponse};
use crate::ranker::TextGenerator;
use crate::search::{SearchResult, WebSearcher};

// =============================================================================
// Mock Web Searcher
// =============================================================================

/// Returns the same canned results for every query.
#[derive(Default)]
pub struct MockWebSearcher {
    results: Vec<SearchResult>,
    fail: bool,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockWebSearcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_results(mut self, results: Vec<SearchResult>) -> Self {
        self.results = results;
        self
    }

    /// Add results from URL strings.
    pub fn with_urls(self, urls: &[&str]) -> Self {
        let results = urls
            .iter()
            .enumerate()
            .map(|(i, url)| SearchResult::new(format!("Result {}", i + 1), *url, ""))
            .collect();
        self.with_results(results)
    }

    /// Fail every search with a 503.
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    /// Queries received so far.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl WebSearcher for MockWebSearcher {
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, SearchError> {
        self.calls.lock().unwrap().push(query.to_string());

        if self.fail {
            return Err(SearchError::Status {
                status: 503,
                body: "mock search unavailable".to_string(),
            });
        }
        Ok(self.results.clone())
    }
}

// =============================================================================
// Mock Text Generator
// =============================================================================

/// Replies with a fixed completion, or fails like an unreachable service.
pub struct MockTextGenerator {
    reply: String,
    fail: bool,
    calls: Arc<Mutex<Vec<(String, String)>>>,
}

impl Default for MockTextGenerator {
    fn default() -> Self {
        Self {
            reply: r#"{"selected_urls": []}"#.to_string(),
            fail: false,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl MockTextGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reply(mut self, reply: impl Into<String>) -> Self {
        self.reply = reply.into();
        self
    }

    /// Reply `{"selected_urls": [...]}` with the given URLs.
    pub fn selecting(self, urls: &[&str]) -> Self {
        let reply = serde_json::json!({ "selected_urls": urls }).to_string();
        self.with_reply(reply)
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    /// `(system, prompt)` pairs received so far.
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for MockTextGenerator {
    async fn generate(&self, system: &str, prompt: &str) -> Result<String, OpenAIError> {
        self.calls
            .lock()
            .unwrap()
            .push((system.to_string(), prompt.to_string()));

        if self.fail {
            return Err(OpenAIError::Network("connection refused".to_string()));
        }
        Ok(self.reply.clone())
    }
}

// =============================================================================
// Mock Extraction API
// =============================================================================

#[derive(Debug, Clone)]
enum ScriptedPoll {
    Pending,
    Data(Value),
    Failure(String),
    Unavailable,
    NotFound,
}

/// Scripted extraction provider.
///
/// Status polls pop scripted responses in order; once the script runs out
/// every poll reports "still pending".
pub struct MockExtractionApi {
    job_id: String,
    submit_error: Option<String>,
    script: Mutex<VecDeque<ScriptedPoll>>,
    submitted: Mutex<Vec<ExtractRequest>>,
    polled: Mutex<Vec<String>>,
}

impl Default for MockExtractionApi {
    fn default() -> Self {
        Self {
            job_id: "job-1".to_string(),
            submit_error: None,
            script: Mutex::new(VecDeque::new()),
            submitted: Mutex::new(Vec::new()),
            polled: Mutex::new(Vec::new()),
        }
    }
}

impl MockExtractionApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_job_id(mut self, id: impl Into<String>) -> Self {
        self.job_id = id.into();
        self
    }

    /// Reject submissions with `success: false` and this error.
    pub fn with_submit_error(mut self, error: impl Into<String>) -> Self {
        self.submit_error = Some(error.into());
        self
    }

    fn push(self, poll: ScriptedPoll) -> Self {
        self.script.lock().unwrap().push_back(poll);
        self
    }

    pub fn then_pending(self) -> Self {
        self.push(ScriptedPoll::Pending)
    }

    pub fn then_data(self, data: Value) -> Self {
        self.push(ScriptedPoll::Data(data))
    }

    pub fn then_failure(self, error: impl Into<String>) -> Self {
        self.push(ScriptedPoll::Failure(error.into()))
    }

    /// A 503 from the status endpoint.
    pub fn then_unavailable(self) -> Self {
        self.push(ScriptedPoll::Unavailable)
    }

    pub fn then_not_found(self) -> Self {
        self.push(ScriptedPoll::NotFound)
    }

    pub fn submitted(&self) -> Vec<ExtractRequest> {
        self.submitted.lock().unwrap().clone()
    }

    pub fn submit_calls(&self) -> usize {
        self.submitted.lock().unwrap().len()
    }

    pub fn polled_ids(&self) -> Vec<String> {
        self.polled.lock().unwrap().clone()
    }

    pub fn status_calls(&self) -> usize {
        self.polled.lock().unwrap().len()
    }
}

#[async_trait]
impl ExtractionApi for MockExtractionApi {
    async fn submit(&self, request: &ExtractRequest) -> Result<SubmitResponse, ExtractApiError> {
        self.submitted.lock().unwrap().push(request.clone());

        Ok(match &self.submit_error {
            Some(error) => SubmitResponse {
                success: false,
                id: None,
                error: Some(error.clone()),
            },
            None => SubmitResponse {
                success: true,
                id: Some(self.job_id.clone()),
                error: None,
            },
        })
    }

    async fn status(&self, job_id: &str) -> Result<StatusResponse, ExtractApiError> {
        self.polled.lock().unwrap().push(job_id.to_string());

        let next = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(ScriptedPoll::Pending);

        match next {
            ScriptedPoll::Pending => Ok(StatusResponse {
                success: true,
                status: Some("processing".to_string()),
                ..Default::default()
            }),
            ScriptedPoll::Data(data) => Ok(StatusResponse {
                success: true,
                data: Some(data),
                status: Some("completed".to_string()),
                ..Default::default()
            }),
            ScriptedPoll::Failure(error) => Ok(StatusResponse {
                success: false,
                error: Some(error),
                ..Default::default()
            }),
            ScriptedPoll::Unavailable => Err(ExtractApiError::Status {
                status: 503,
                body: "Service Unavailable".to_string(),
            }),
            ScriptedPoll::NotFound => Err(ExtractApiError::JobNotFound {
                id: job_id.to_string(),
            }),
        }
    }
}
