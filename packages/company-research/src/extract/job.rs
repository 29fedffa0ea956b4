//! Extraction job state machine.
//!
//! A job starts `Pending` and moves to exactly one terminal state:
//!
//! ```text
//! Pending --Ready-------------------------> Complete
//! Pending --Rejected----------------------> Failed
//! Pending --NotReady|Transient, budget ok-> Pending (sleep, poll again)
//! Pending --NotReady|Transient, budget out> TimedOut
//! ```
//!
//! Every poll, whatever its outcome, consumes one attempt. There is no I/O
//! here; the runner feeds outcomes in and sleeps when told to.

use std::time::Duration;

use serde_json::Value;

use super::{StatusResponse, DEFAULT_MAX_ATTEMPTS, DEFAULT_POLL_INTERVAL};
use crate::error::{ExtractApiError, ResearchError};

/// Polling budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Total polls allowed, at least one is always made
    pub max_attempts: u32,
    /// Sleep between polls
    pub interval: Duration,
    /// Emit a progress notice every N pending attempts
    pub progress_every: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            interval: DEFAULT_POLL_INTERVAL,
            progress_every: 6,
        }
    }
}

impl PollPolicy {
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts,
            interval,
            ..Default::default()
        }
    }
}

/// What a single status poll told us.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// Provider returned result data
    Ready(Value),
    /// Provider accepted the poll but has no data yet
    NotReady,
    /// Provider says the job failed or doesn't exist
    Rejected(String),
    /// Network or HTTP hiccup, worth another try
    Transient(String),
}

impl PollOutcome {
    pub fn from_response(response: StatusResponse) -> Self {
        let failed_status = matches!(response.status.as_deref(), Some("failed" | "cancelled"));
        if !response.success || failed_status {
            return Self::Rejected(
                response
                    .error
                    .unwrap_or_else(|| "Unknown error".to_string()),
            );
        }

        match response.data {
            Some(data) if has_payload(&data) => Self::Ready(data),
            _ => Self::NotReady,
        }
    }

    pub fn from_error(error: ExtractApiError) -> Self {
        match error {
            ExtractApiError::JobNotFound { .. } => Self::Rejected(error.to_string()),
            other => Self::Transient(other.to_string()),
        }
    }
}

/// Falsy data (null, `false`, zero, empty string or container) means
/// "not yet".
fn has_payload(data: &Value) -> bool {
    match data {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::Object(map) => !map.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::String(s) => !s.is_empty(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Complete,
    Failed,
    TimedOut,
}

/// What the runner should do after an outcome is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Sleep one interval and poll again. `progress` asks for a notice.
    Wait { progress: bool },
    /// Job reached a terminal state
    Done,
}

/// An extraction job tracked by its provider id.
#[derive(Debug, Clone)]
pub struct ExtractionJob {
    id: String,
    status: JobStatus,
    attempts: u32,
    result: Option<Value>,
    error: Option<String>,
}

impl ExtractionJob {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: JobStatus::Pending,
            attempts: 0,
            result: None,
            error: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn result(&self) -> Option<&Value> {
        self.result.as_ref()
    }

    /// Record one poll. Calling this on a finished job is a no-op.
    pub fn apply(&mut self, outcome: PollOutcome, policy: &PollPolicy) -> Step {
        if self.status != JobStatus::Pending {
            return Step::Done;
        }
        self.attempts += 1;

        match outcome {
            PollOutcome::Ready(data) => {
                self.status = JobStatus::Complete;
                self.result = Some(data);
                Step::Done
            }
            PollOutcome::Rejected(message) => {
                self.status = JobStatus::Failed;
                self.error = Some(message);
                Step::Done
            }
            PollOutcome::NotReady | PollOutcome::Transient(_) if self.attempts >= policy.max_attempts => {
                self.status = JobStatus::TimedOut;
                Step::Done
            }
            PollOutcome::NotReady => Step::Wait {
                progress: policy.progress_every > 0 && self.attempts % policy.progress_every == 0,
            },
            PollOutcome::Transient(_) => Step::Wait { progress: false },
        }
    }

    /// Convert a finished job into the runner's result.
    pub fn into_result(self, policy: &PollPolicy) -> Result<Value, ResearchError> {
        match self.status {
            JobStatus::Complete => Ok(self.result.unwrap_or(Value::Null)),
            JobStatus::Failed => Err(ResearchError::Provider(
                self.error.unwrap_or_else(|| "Unknown error".to_string()),
            )),
            JobStatus::Pending | JobStatus::TimedOut => Err(ResearchError::Timeout {
                attempts: self.attempts,
                waited: policy.interval.saturating_mul(self.attempts),
            }),
        }
    }
}
