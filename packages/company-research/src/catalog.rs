//! Entity catalog and company resolution.
//!
//! The catalog is loaded once at startup and never mutated. Resolution walks
//! three tiers in order and returns the first hit:
//!
//! 1. exact ticker match (case-insensitive)
//! 2. name contains the query
//! 3. scored fuzzy match over every entity, best score wins
//!
//! # Example
//!
//! ```rust,ignore
//! let catalog = Catalog::load("data/companies.json")?;
//! let hit = catalog.resolve("nvda").expect("known ticker");
//! assert_eq!(hit.kind, MatchKind::Identifier);
//! ```

use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::error::CatalogError;

const NAME_CONTAINS_SCORE: u32 = 10;
const TICKER_CONTAINS_SCORE: u32 = 15;
const NAME_PREFIX_SCORE: u32 = 5;
const TICKER_PREFIX_SCORE: u32 = 8;
const WORD_PAIR_SCORE: u32 = 3;

/// A company record from the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticker: Option<String>,

    /// SEC Central Index Key. Some catalogs call this `identifier`, and some
    /// store it as a number.
    #[serde(
        default,
        alias = "identifier",
        deserialize_with = "string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub cik: Option<String>,

    /// Any other fields, carried through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Entity {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ticker: None,
            cik: None,
            extra: Map::new(),
        }
    }

    pub fn with_ticker(mut self, ticker: impl Into<String>) -> Self {
        self.ticker = Some(ticker.into());
        self
    }

    pub fn with_cik(mut self, cik: impl Into<String>) -> Self {
        self.cik = Some(cik.into());
        self
    }

    /// Ticker for display, `N/A` when absent.
    pub fn ticker_or_na(&self) -> &str {
        self.ticker.as_deref().unwrap_or("N/A")
    }

    /// `Name (TICKER)` as used in prompts and console output.
    pub fn label(&self) -> String {
        format!("{} ({})", self.name, self.ticker_or_na())
    }

    fn ticker_lower(&self) -> String {
        self.ticker.as_deref().unwrap_or_default().to_lowercase()
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// How a query was matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    /// Exact ticker match
    Identifier,
    /// Query found inside the company name
    Name,
    /// Best fuzzy score
    Fuzzy { score: u32 },
}

/// A resolved entity and how it was found.
#[derive(Debug, Clone, Copy)]
pub struct Resolution<'a> {
    pub entity: &'a Entity,
    pub kind: MatchKind,
}

/// Immutable, ordered collection of entities.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entities: Vec<Entity>,
}

impl Catalog {
    pub fn from_entities(entities: Vec<Entity>) -> Self {
        Self { entities }
    }

    /// Load a catalog from a JSON array on disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| CatalogError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let entities: Vec<Entity> =
            serde_json::from_str(&raw).map_err(|source| CatalogError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        info!(path = %path.display(), count = entities.len(), "Loaded company catalog");
        Ok(Self { entities })
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// Resolve a free-text query to a single entity.
    ///
    /// Returns `None` for an empty query, an empty catalog, or when no tier
    /// produces a hit.
    pub fn resolve(&self, query: &str) -> Option<Resolution<'_>> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return None;
        }

        if let Some(entity) = self
            .entities
            .iter()
            .find(|e| e.ticker.is_some() && e.ticker_lower() == query)
        {
            debug!(query = %query, name = %entity.name, "Exact ticker match");
            return Some(Resolution {
                entity,
                kind: MatchKind::Identifier,
            });
        }

        // A name that starts with the query also contains it.
        if let Some(entity) = self
            .entities
            .iter()
            .find(|e| e.name.to_lowercase().contains(&query))
        {
            debug!(query = %query, name = %entity.name, "Name match");
            return Some(Resolution {
                entity,
                kind: MatchKind::Name,
            });
        }

        let mut matches: Vec<(&Entity, u32)> = self
            .entities
            .iter()
            .map(|e| (e, fuzzy_score(&query, e)))
            .filter(|(_, score)| *score > 0)
            .collect();

        // Stable: equal scores keep catalog order.
        matches.sort_by(|a, b| b.1.cmp(&a.1));

        matches.into_iter().next().map(|(entity, score)| {
            debug!(query = %query, name = %entity.name, score, "Fuzzy match");
            Resolution {
                entity,
                kind: MatchKind::Fuzzy { score },
            }
        })
    }
}

/// Fuzzy relevance of `entity` for an already lower-cased query.
///
/// Word scoring counts every (query word, name word) pair where the query
/// word occurs inside the name word.
pub fn fuzzy_score(query: &str, entity: &Entity) -> u32 {
    let name = entity.name.to_lowercase();
    let ticker = entity.ticker_lower();
    let mut score = 0;

    if name.contains(query) {
        score += NAME_CONTAINS_SCORE;
    }
    if !ticker.is_empty() && ticker.contains(query) {
        score += TICKER_CONTAINS_SCORE;
    }
    if name.starts_with(query) {
        score += NAME_PREFIX_SCORE;
    }
    if !ticker.is_empty() && ticker.starts_with(query) {
        score += TICKER_PREFIX_SCORE;
    }

    for query_word in query.split_whitespace() {
        for name_word in name.split_whitespace() {
            if name_word.contains(query_word) {
                score += WORD_PAIR_SCORE;
            }
        }
    }

    score
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(name: &str, ticker: &str) -> Entity {
        Entity::new(name).with_ticker(ticker)
    }

    #[test]
    fn test_exact_ticker_beats_name_match() {
        let catalog = Catalog::from_entities(vec![
            entity("Apple Inc", "AAPL"),
            entity("Apple Pay Co", "APAY"),
        ]);

        let hit = catalog.resolve("AAPL").unwrap();
        assert_eq!(hit.entity.name, "Apple Inc");
        assert_eq!(hit.kind, MatchKind::Identifier);
    }

    #[test]
    fn test_ticker_match_is_case_insensitive() {
        let catalog = Catalog::from_entities(vec![
            entity("Microsoft Corp", "MSFT"),
            entity("NVIDIA Corp", "NVDA"),
        ]);

        let hit = catalog.resolve("nvda").unwrap();
        assert_eq!(hit.entity.name, "NVIDIA Corp");
    }

    #[test]
    fn test_name_substring_match() {
        let catalog = Catalog::from_entities(vec![
            entity("Tesla, Inc.", "TSLA"),
            entity("Microsoft Corp", "MSFT"),
        ]);

        let hit = catalog.resolve("microsoft").unwrap();
        assert_eq!(hit.entity.ticker.as_deref(), Some("MSFT"));
        assert_eq!(hit.kind, MatchKind::Name);
    }

    #[test]
    fn test_name_match_takes_first_in_catalog_order() {
        let catalog = Catalog::from_entities(vec![
            entity("Apple Hospitality REIT", "APLE"),
            entity("Apple Inc", "AAPL"),
        ]);

        let hit = catalog.resolve("apple").unwrap();
        assert_eq!(hit.entity.ticker.as_deref(), Some("APLE"));
    }

    #[test]
    fn test_fuzzy_word_match() {
        let catalog = Catalog::from_entities(vec![
            entity("Alphabet Inc", "GOOGL"),
            entity("Advanced Micro Devices", "AMD"),
        ]);

        // Not a substring of either name, but both words occur inside name
        // words of AMD.
        let hit = catalog.resolve("devices micro").unwrap();
        assert_eq!(hit.entity.ticker.as_deref(), Some("AMD"));
        assert_eq!(hit.kind, MatchKind::Fuzzy { score: 6 });
    }

    #[test]
    fn test_fuzzy_ticker_substring_scores_higher() {
        let catalog = Catalog::from_entities(vec![
            entity("Berkshire Hathaway A", "BRK.A"),
            entity("Berkshire Hills Bancorp", "BHLB"),
        ]);

        // "brk" hits a ticker substring and prefix: 15 + 8.
        let hit = catalog.resolve("brk").unwrap();
        assert_eq!(hit.entity.ticker.as_deref(), Some("BRK.A"));
        assert_eq!(hit.kind, MatchKind::Fuzzy { score: 23 });
    }

    #[test]
    fn test_fuzzy_tie_keeps_catalog_order() {
        let catalog = Catalog::from_entities(vec![
            entity("Global Payments", "GPN"),
            entity("Global Industrial", "GIC"),
        ]);

        // "global widgets" scores 3 for each entity (one word pair).
        let hit = catalog.resolve("global widgets").unwrap();
        assert_eq!(hit.entity.name, "Global Payments");
        assert_eq!(hit.kind, MatchKind::Fuzzy { score: 3 });
    }

    #[test]
    fn test_fuzzy_score_all_pairs() {
        let e = entity("Bank of Bank Holdings", "BOBH");
        // "bank" occurs in two name words, "of" in one.
        assert_eq!(fuzzy_score("bank of", &e), 10 + 5 + 3 * 3);
        assert_eq!(fuzzy_score("bank", &e), 10 + 5 + 3 * 2);
    }

    #[test]
    fn test_fuzzy_score_ignores_missing_ticker() {
        let e = Entity::new("Acme Holdings");
        assert_eq!(fuzzy_score("xyz", &e), 0);
    }

    #[test]
    fn test_no_match_and_empty_inputs() {
        let catalog = Catalog::from_entities(vec![entity("Apple Inc", "AAPL")]);
        assert!(catalog.resolve("zzzz").is_none());
        assert!(catalog.resolve("   ").is_none());
        assert!(Catalog::default().resolve("AAPL").is_none());
    }

    #[test]
    fn test_deserialize_catalog_entry() {
        let json = r#"[
            {"cik": "0000320193", "ticker": "AAPL", "name": "Apple Inc.", "exchange": "Nasdaq"},
            {"identifier": 789019, "name": "Microsoft Corp"}
        ]"#;

        let entities: Vec<Entity> = serde_json::from_str(json).unwrap();
        assert_eq!(entities[0].cik.as_deref(), Some("0000320193"));
        assert_eq!(entities[0].extra["exchange"], "Nasdaq");
        assert_eq!(entities[1].cik.as_deref(), Some("789019"));
        assert!(entities[1].ticker.is_none());
        assert_eq!(entities[1].label(), "Microsoft Corp (N/A)");
    }

    #[test]
    fn test_load_missing_file() {
        let err = Catalog::load("/nonexistent/companies.json").unwrap_err();
        assert!(matches!(err, CatalogError::Read { .. }));
    }
}
