//! Research report rendering and persistence.

use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime, Timelike};
use serde_json::Value;

use crate::catalog::Entity;
use crate::error::ReportError;

const RULE_WIDTH: usize = 80;
const SECTION_RULE_WIDTH: usize = 40;
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const FILE_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Final artifact of a successful run.
///
/// Header fields are rendered one per line, so the objective is stored with
/// whitespace runs (including line breaks) collapsed to single spaces.
#[derive(Debug, Clone, PartialEq)]
pub struct ResearchReport {
    pub entity: Entity,
    pub objective: String,
    pub timestamp: NaiveDateTime,
    pub extracted: Value,
}

impl ResearchReport {
    /// Report stamped with the current local time (second precision).
    pub fn new(entity: Entity, objective: impl Into<String>, extracted: Value) -> Self {
        let now = Local::now().naive_local();
        let timestamp = now.with_nanosecond(0).unwrap_or(now);
        Self::at(entity, objective, extracted, timestamp)
    }

    pub fn at(
        entity: Entity,
        objective: impl Into<String>,
        extracted: Value,
        timestamp: NaiveDateTime,
    ) -> Self {
        Self {
            entity,
            objective: single_line(&objective.into()),
            timestamp,
            extracted,
        }
    }

    /// Plain-text rendering.
    pub fn render(&self) -> String {
        let rule = "=".repeat(RULE_WIDTH);
        let lines = [
            rule.clone(),
            "COMPANY RESEARCH RESULTS".to_string(),
            rule.clone(),
            String::new(),
            format!(
                "Company: {} ({})",
                single_line(&self.entity.name),
                single_line(self.entity.ticker_or_na())
            ),
            format!("CIK: {}", single_line(self.entity.cik.as_deref().unwrap_or("N/A"))),
            format!("Research Objective: {}", self.objective),
            format!("Timestamp: {}", self.timestamp.format(TIMESTAMP_FORMAT)),
            String::new(),
            "EXTRACTED INFORMATION:".to_string(),
            "-".repeat(SECTION_RULE_WIDTH),
            render_value(&self.extracted),
            String::new(),
            rule,
        ];
        lines.join("\n")
    }

    /// `<TICKER>_<YYYYmmdd_HHMMSS>.txt`, `UNKNOWN` without a ticker.
    pub fn file_name(&self) -> String {
        let ticker = self
            .entity
            .ticker
            .as_deref()
            .unwrap_or("UNKNOWN")
            .replace('/', "_");
        format!("{}_{}.txt", ticker, self.timestamp.format(FILE_TIMESTAMP_FORMAT))
    }

    /// Write the rendered report into `dir`, creating it if needed.
    pub fn save(&self, dir: impl AsRef<Path>) -> Result<PathBuf, ReportError> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir).map_err(|source| ReportError {
            path: dir.to_path_buf(),
            source,
        })?;

        let path = dir.join(self.file_name());
        std::fs::write(&path, self.render()).map_err(|source| ReportError {
            path: path.clone(),
            source,
        })?;

        tracing::info!(path = %path.display(), "Report saved");
        Ok(path)
    }
}

fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn render_value(value: &Value) -> String {
    match value {
        Value::Object(_) | Value::Array(_) => {
            serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
        }
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Header fields read back from a rendered report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportHeader {
    pub name: String,
    pub ticker: Option<String>,
    pub cik: Option<String>,
    pub objective: String,
    pub timestamp: NaiveDateTime,
}

impl ReportHeader {
    /// Parse the header of text produced by [`ResearchReport::render`].
    pub fn parse(text: &str) -> Option<Self> {
        let field = |label: &str| {
            text.lines()
                .find_map(|line| line.strip_prefix(label))
                .map(str::to_string)
        };
        let not_na = |s: String| (s != "N/A").then_some(s);

        let company = field("Company: ")?;
        let (name, ticker) = company.strip_suffix(')')?.rsplit_once(" (")?;
        let timestamp =
            NaiveDateTime::parse_from_str(&field("Timestamp: ")?, TIMESTAMP_FORMAT).ok()?;

        Some(Self {
            name: name.to_string(),
            ticker: not_na(ticker.to_string()),
            cik: field("CIK: ").and_then(not_na),
            objective: field("Research Objective: ")?,
            timestamp,
        })
    }
}
