//! Structured extraction via an asynchronous job API.
//!
//! The runner submits one batch job for the selected URLs and then polls
//! the job until it completes, fails or runs out of attempts. See
//! [`job`] for the state machine and [`firecrawl`] for the HTTP client.

pub mod firecrawl;
pub mod job;

pub use firecrawl::FirecrawlClient;
pub use job::{ExtractionJob, JobStatus, PollOutcome, PollPolicy, Step};

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::catalog::Entity;
use crate::error::{ExtractApiError, ResearchError, Result};
use crate::events::{EventSink, ResearchEvent};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 60;
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Body of a job submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractRequest {
    pub urls: Vec<String>,
    pub prompt: String,
    pub enable_web_search: bool,
    pub allow_external_links: bool,
    pub show_sources: bool,
}

impl ExtractRequest {
    /// Request restricted to the given URLs, following their links and
    /// citing sources.
    pub fn new(urls: Vec<String>, prompt: impl Into<String>) -> Self {
        Self {
            urls,
            prompt: prompt.into(),
            enable_web_search: false,
            allow_external_links: true,
            show_sources: true,
        }
    }
}

/// Reply to a job submission.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubmitResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Reply to a job status poll.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatusResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Asynchronous extraction job provider.
#[async_trait]
pub trait ExtractionApi: Send + Sync {
    /// Start a job.
    async fn submit(&self, request: &ExtractRequest) -> std::result::Result<SubmitResponse, ExtractApiError>;

    /// Fetch the current state of a job.
    async fn status(&self, job_id: &str) -> std::result::Result<StatusResponse, ExtractApiError>;
}

/// Build the extraction instructions for an entity and objective.
pub fn extraction_prompt(entity: &Entity, objective: &str) -> String {
    format!(
        "Extract comprehensive information about {label} focusing specifically on: {objective}.\n\n\
         Requirements:\n\
         1. Extract only factual information that is explicitly stated in the sources\n\
         2. Focus on the specific research objective: {objective}\n\
         3. Include financial data, business metrics, and key facts when available\n\
         4. Organize the information in a clear, structured format\n\
         5. Cite the source URL for each piece of information\n\
         6. If conflicting information exists, note the discrepancies\n\n\
         Format the response as structured JSON with clear categories relevant to the research objective.",
        label = entity.label(),
    )
}

/// Submits extraction jobs and polls them to completion.
pub struct JobRunner<A> {
    api: A,
    policy: PollPolicy,
    events: Option<EventSink>,
}

impl<A: ExtractionApi> JobRunner<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            policy: PollPolicy::default(),
            events: None,
        }
    }

    pub fn with_policy(mut self, policy: PollPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_events(mut self, events: EventSink) -> Self {
        self.events = Some(events);
        self
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn policy(&self) -> &PollPolicy {
        &self.policy
    }

    fn emit(&self, event: ResearchEvent) {
        if let Some(events) = &self.events {
            events(&event);
        }
    }

    /// Extract structured data about `entity` from `urls`.
    pub async fn extract(&self, urls: &[String], objective: &str, entity: &Entity) -> Result<Value> {
        let request = ExtractRequest::new(urls.to_vec(), extraction_prompt(entity, objective));
        let job_id = self.submit(&request).await?;

        info!(job_id = %job_id, urls = urls.len(), "Extraction job started, polling for results");
        self.emit(ResearchEvent::JobSubmitted {
            job_id: job_id.clone(),
        });

        self.poll(ExtractionJob::new(job_id)).await
    }

    async fn submit(&self, request: &ExtractRequest) -> Result<String> {
        let response = self
            .api
            .submit(request)
            .await
            .map_err(|e| ResearchError::Submission(e.to_string()))?;

        if !response.success {
            return Err(ResearchError::Submission(
                response
                    .error
                    .unwrap_or_else(|| "Unknown error".to_string()),
            ));
        }

        response
            .id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| ResearchError::Submission("no extraction job id received".to_string()))
    }

    /// Drive a pending job to a terminal state.
    pub async fn poll(&self, mut job: ExtractionJob) -> Result<Value> {
        loop {
            let outcome = match self.api.status(job.id()).await {
                Ok(response) => PollOutcome::from_response(response),
                Err(e) => {
                    warn!(job_id = %job.id(), error = %e, "Polling error");
                    PollOutcome::from_error(e)
                }
            };

            match job.apply(outcome, &self.policy) {
                Step::Done => break,
                Step::Wait { progress } => {
                    if progress {
                        info!(
                            job_id = %job.id(),
                            attempt = job.attempts(),
                            max_attempts = self.policy.max_attempts,
                            "Extraction still processing"
                        );
                        self.emit(ResearchEvent::StillProcessing {
                            attempt: job.attempts(),
                            max_attempts: self.policy.max_attempts,
                        });
                    }
                    tokio::time::sleep(self.policy.interval).await;
                }
            }
        }

        match job.status() {
            JobStatus::Complete => {
                info!(job_id = %job.id(), attempts = job.attempts(), "Extraction completed");
                self.emit(ResearchEvent::ExtractionComplete {
                    attempts: job.attempts(),
                });
            }
            status => {
                warn!(job_id = %job.id(), ?status, attempts = job.attempts(), "Extraction did not complete");
            }
        }

        job.into_result(&self.policy)
    }
}
