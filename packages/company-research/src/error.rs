//! Typed errors for the research pipeline.
//!
//! Uses `thiserror` for library errors (not `anyhow`). Collaborator-level
//! failures (`SearchError`, `ExtractApiError`) never cross a stage boundary:
//! the stage that owns the collaborator decides whether to swallow, downgrade
//! or retry them, and only `ResearchError` reaches the caller.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Pipeline stage, used to report where a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Resolve,
    Search,
    Rank,
    Extract,
    Report,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Resolve => "company lookup",
            Stage::Search => "web search",
            Stage::Rank => "URL selection",
            Stage::Extract => "extraction",
            Stage::Report => "report",
        };
        f.write_str(name)
    }
}

/// Errors that halt a research run.
#[derive(Debug, Error)]
pub enum ResearchError {
    /// No catalog entity matched the query
    #[error("company not found in database: {query}")]
    NotFound { query: String },

    /// Web search produced nothing to rank
    #[error("no search results found for: {query}")]
    EmptySearchResults { query: String },

    /// Ranking produced no URLs (only possible with empty search results)
    #[error("no URLs selected for extraction")]
    NoUrlsSelected,

    /// Extraction job could not be started
    #[error("extraction job submission failed: {0}")]
    Submission(String),

    /// Extraction provider reported the job as failed
    #[error("extraction provider error: {0}")]
    Provider(String),

    /// Job still pending after the attempt budget
    #[error("extraction timed out after {attempts} attempts ({}s)", waited.as_secs())]
    Timeout { attempts: u32, waited: Duration },
}

impl ResearchError {
    /// The stage that produced this error.
    pub fn stage(&self) -> Stage {
        match self {
            Self::NotFound { .. } => Stage::Resolve,
            Self::EmptySearchResults { .. } => Stage::Search,
            Self::NoUrlsSelected => Stage::Rank,
            Self::Submission(_) | Self::Provider(_) | Self::Timeout { .. } => Stage::Extract,
        }
    }
}

/// Errors loading the entity catalog at startup.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Catalog file missing or unreadable
    #[error("cannot read catalog {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Catalog file is not a JSON array of entities
    #[error("invalid catalog {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors from the web search collaborator.
#[derive(Debug, Error)]
pub enum SearchError {
    /// Request never got a response
    #[error("search request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-2xx response
    #[error("search API error {status}: {body}")]
    Status { status: u16, body: String },
}

/// Errors from the extraction job API.
#[derive(Debug, Error)]
pub enum ExtractApiError {
    /// Request never got a response, or the body could not be decoded
    #[error("extraction request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The job id is unknown to the provider
    #[error("extraction job not found: {id}")]
    JobNotFound { id: String },

    /// Any other non-2xx response
    #[error("extraction API error {status}: {body}")]
    Status { status: u16, body: String },
}

/// Errors writing a report to disk.
#[derive(Debug, Error)]
#[error("failed to save report to {path}: {source}")]
pub struct ReportError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// A required API key is absent or blank.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("{var} must be set")]
    Missing { var: String },

    #[error("{var} must not be empty")]
    Blank { var: String },
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, ResearchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_mapping() {
        let not_found = ResearchError::NotFound {
            query: "zzz".into(),
        };
        assert_eq!(not_found.stage(), Stage::Resolve);

        let empty = ResearchError::EmptySearchResults {
            query: "Apple Inc earnings".into(),
        };
        assert_eq!(empty.stage(), Stage::Search);

        let timeout = ResearchError::Timeout {
            attempts: 60,
            waited: Duration::from_secs(300),
        };
        assert_eq!(timeout.stage(), Stage::Extract);
        assert_eq!(
            timeout.to_string(),
            "extraction timed out after 60 attempts (300s)"
        );
    }

    #[test]
    fn test_provider_detail_in_message() {
        let err = ResearchError::Provider("quota exceeded".into());
        assert!(err.to_string().contains("quota exceeded"));
    }
}
