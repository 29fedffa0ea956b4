//! Company Research Pipeline
//!
//! Turns a company name or ticker plus a free-text research objective into a
//! structured report grounded in web sources.
//!
//! # Stages
//!
//! 1. **Resolve** the query against a local company catalog
//! 2. **Search** the web for `"<company> <objective>"`
//! 3. **Rank** the results with an LLM, falling back to the top hits
//! 4. **Extract** structured data through an asynchronous job API
//! 5. **Report** the result as plain text and optionally save it
//!
//! # Usage
//!
//! ```rust,ignore
//! use company_research::{Catalog, ChatModel, FirecrawlClient, Researcher, SerperSearcher};
//!
//! let catalog = Catalog::load("data/companies.json")?;
//! let researcher = Researcher::new(
//!     catalog,
//!     SerperSearcher::new(serper_key),
//!     ChatModel::openrouter(&openrouter_key, "deepseek/deepseek-r1-distill-llama-70b"),
//!     FirecrawlClient::new(firecrawl_key),
//! );
//!
//! let report = researcher.research("AAPL", "quarterly earnings 2024").await?;
//! report.save("research_results")?;
//! ```
//!
//! # Modules
//!
//! - [`catalog`] - Company catalog and query resolution
//! - [`search`] - Web search trait and Serper implementation
//! - [`ranker`] - LLM-based URL selection with deterministic fallback
//! - [`extract`] - Extraction job submission and polling
//! - [`report`] - Report rendering and persistence
//! - [`pipeline`] - Stage orchestration
//! - [`testing`] - Mock collaborators for tests

pub mod catalog;
pub mod config;
pub mod error;
pub mod events;
pub mod extract;
pub mod pipeline;
pub mod ranker;
pub mod report;
pub mod search;
pub mod security;
pub mod testing;

// Re-export core types at crate root
pub use catalog::{fuzzy_score, Catalog, Entity, MatchKind, Resolution};
pub use config::Config;
pub use error::{
    CatalogError, ExtractApiError, KeyError, ReportError, ResearchError, SearchError, Stage,
};
pub use events::{EventSink, ResearchEvent};
pub use extract::{
    ExtractRequest, ExtractionApi, ExtractionJob, FirecrawlClient, JobRunner, JobStatus,
    PollOutcome, PollPolicy,
};
pub use pipeline::Researcher;
pub use ranker::{CandidateRanker, ChatModel, FallbackReason, Ranking, RankingSource, TextGenerator};
pub use report::{ReportHeader, ResearchReport};
pub use search::{search_web, SearchResult, SerperSearcher, WebSearcher};
pub use security::ApiKey;
