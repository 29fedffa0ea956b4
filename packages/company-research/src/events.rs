//! Progress events emitted while a research run is in flight.
//!
//! The library never prints; callers that want feedback (the CLI) register
//! an [`EventSink`] and render events however they like.

use std::sync::Arc;

use crate::catalog::MatchKind;

#[derive(Debug, Clone, PartialEq)]
pub enum ResearchEvent {
    /// Company resolved from the catalog
    Resolved {
        name: String,
        ticker: Option<String>,
        kind: MatchKind,
    },
    /// Web search started
    Searching { query: String },
    /// Web search returned
    SearchResults { count: usize },
    /// URLs chosen for extraction
    UrlsSelected { urls: Vec<String>, degraded: bool },
    /// Extraction job accepted by the provider
    JobSubmitted { job_id: String },
    /// Job still running; emitted every few poll attempts
    StillProcessing { attempt: u32, max_attempts: u32 },
    /// Extraction result received
    ExtractionComplete { attempts: u32 },
}

/// Callback receiving [`ResearchEvent`]s.
pub type EventSink = Arc<dyn Fn(&ResearchEvent) + Send + Sync>;
