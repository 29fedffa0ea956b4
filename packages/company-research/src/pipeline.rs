//! Research pipeline: resolve → search → rank → extract → report.
//!
//! Stages run strictly in sequence and the first failure ends the run. The
//! returned [`ResearchError`] names the stage via [`ResearchError::stage`].
//!
//! # Usage
//!
//! ```rust,ignore
//! let researcher = Researcher::new(catalog, searcher, chat_model, firecrawl);
//! let report = researcher.research("NVDA", "AI chip market share").await?;
//! println!("{}", report.render());
//! ```

use tracing::info;

use crate::catalog::Catalog;
use crate::error::{ResearchError, Result};
use crate::events::{EventSink, ResearchEvent};
use crate::extract::{ExtractionApi, JobRunner, PollPolicy};
use crate::ranker::{CandidateRanker, TextGenerator};
use crate::report::ResearchReport;
use crate::search::{search_web, WebSearcher};

pub struct Researcher<S, G, A> {
    catalog: Catalog,
    searcher: S,
    ranker: CandidateRanker<G>,
    runner: JobRunner<A>,
    events: Option<EventSink>,
}

impl<S, G, A> Researcher<S, G, A>
where
    S: WebSearcher,
    G: TextGenerator,
    A: ExtractionApi,
{
    pub fn new(catalog: Catalog, searcher: S, generator: G, api: A) -> Self {
        Self {
            catalog,
            searcher,
            ranker: CandidateRanker::new(generator),
            runner: JobRunner::new(api),
            events: None,
        }
    }

    pub fn with_poll_policy(mut self, policy: PollPolicy) -> Self {
        self.runner = self.runner.with_policy(policy);
        self
    }

    /// Receive progress events for every stage.
    pub fn with_events(mut self, events: EventSink) -> Self {
        self.runner = self.runner.with_events(events.clone());
        self.events = Some(events);
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn searcher(&self) -> &S {
        &self.searcher
    }

    pub fn generator(&self) -> &G {
        self.ranker.generator()
    }

    pub fn extraction_api(&self) -> &A {
        self.runner.api()
    }

    fn emit(&self, event: ResearchEvent) {
        if let Some(events) = &self.events {
            events(&event);
        }
    }

    /// Run the full pipeline for a company query and research objective.
    pub async fn research(&self, query: &str, objective: &str) -> Result<ResearchReport> {
        let resolution = self
            .catalog
            .resolve(query)
            .ok_or_else(|| ResearchError::NotFound {
                query: query.to_string(),
            })?;
        let entity = resolution.entity;

        info!(query, name = %entity.name, kind = ?resolution.kind, "Resolved company");
        self.emit(ResearchEvent::Resolved {
            name: entity.name.clone(),
            ticker: entity.ticker.clone(),
            kind: resolution.kind,
        });

        let search_query = format!("{} {}", entity.name, objective);
        self.emit(ResearchEvent::Searching {
            query: search_query.clone(),
        });

        let results = search_web(&self.searcher, &search_query).await;
        if results.is_empty() {
            return Err(ResearchError::EmptySearchResults {
                query: search_query,
            });
        }
        self.emit(ResearchEvent::SearchResults {
            count: results.len(),
        });

        let ranking = self.ranker.rank(entity, objective, &results).await;
        if ranking.urls.is_empty() {
            return Err(ResearchError::NoUrlsSelected);
        }
        self.emit(ResearchEvent::UrlsSelected {
            urls: ranking.urls.clone(),
            degraded: ranking.is_degraded(),
        });

        let extracted = self.runner.extract(&ranking.urls, objective, entity).await?;

        Ok(ResearchReport::new(entity.clone(), objective, extracted))
    }
}
