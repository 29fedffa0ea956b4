use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use dotenvy::dotenv;

use crate::extract::{PollPolicy, DEFAULT_MAX_ATTEMPTS, DEFAULT_POLL_INTERVAL};
use crate::ranker::{DEFAULT_MODEL, OPENROUTER_BASE_URL};
use crate::security::ApiKey;

/// Longest accepted pause between extraction status polls.
const MAX_POLL_INTERVAL_SECS: u64 = 3600;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub serper_api_key: ApiKey,
    pub openrouter_api_key: ApiKey,
    pub firecrawl_api_key: ApiKey,
    pub companies_file: PathBuf,
    pub results_dir: PathBuf,
    pub model: String,
    pub openrouter_base_url: String,
    pub firecrawl_base_url: Option<String>,
    pub poll_policy: PollPolicy,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from any key lookup (env, tests).
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let key = |service, var: &str| ApiKey::required(service, var, lookup(var));

        let interval_secs: u64 = match lookup("EXTRACT_POLL_INTERVAL_SECS") {
            Some(raw) => raw
                .parse()
                .context("EXTRACT_POLL_INTERVAL_SECS must be a whole number of seconds")?,
            None => DEFAULT_POLL_INTERVAL.as_secs(),
        };
        if interval_secs > MAX_POLL_INTERVAL_SECS {
            bail!("EXTRACT_POLL_INTERVAL_SECS must be at most {MAX_POLL_INTERVAL_SECS}");
        }
        let max_attempts: u32 = match lookup("EXTRACT_MAX_POLL_ATTEMPTS") {
            Some(raw) => raw
                .parse()
                .context("EXTRACT_MAX_POLL_ATTEMPTS must be a number")?,
            None => DEFAULT_MAX_ATTEMPTS,
        };
        if max_attempts == 0 {
            bail!("EXTRACT_MAX_POLL_ATTEMPTS must be at least 1");
        }

        Ok(Self {
            serper_api_key: key("serper", "SERPER_API_KEY")?,
            openrouter_api_key: key("openrouter", "OPENROUTER_API_KEY")?,
            firecrawl_api_key: key("firecrawl", "FIRECRAWL_API_KEY")?,
            companies_file: lookup("COMPANIES_FILE")
                .unwrap_or_else(|| "data/companies.json".to_string())
                .into(),
            results_dir: lookup("RESULTS_DIR")
                .unwrap_or_else(|| "research_results".to_string())
                .into(),
            model: lookup("RESEARCH_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            openrouter_base_url: lookup("OPENROUTER_BASE_URL")
                .unwrap_or_else(|| OPENROUTER_BASE_URL.to_string()),
            firecrawl_base_url: lookup("FIRECRAWL_BASE_URL"),
            poll_policy: PollPolicy::new(max_attempts, Duration::from_secs(interval_secs)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const KEYS: [(&str, &str); 3] = [
        ("SERPER_API_KEY", "serper-key"),
        ("OPENROUTER_API_KEY", "sk-or-key"),
        ("FIRECRAWL_API_KEY", "fc-key"),
    ];

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&KEYS)).unwrap();

        assert_eq!(config.firecrawl_api_key.expose(), "fc-key");
        assert_eq!(config.companies_file, PathBuf::from("data/companies.json"));
        assert_eq!(config.results_dir, PathBuf::from("research_results"));
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.openrouter_base_url, OPENROUTER_BASE_URL);
        assert!(config.firecrawl_base_url.is_none());
        assert_eq!(config.poll_policy, PollPolicy::default());
    }

    #[test]
    fn test_missing_key_fails_fast() {
        let err = Config::from_lookup(lookup(&KEYS[..2])).unwrap_err();
        assert!(err.to_string().contains("FIRECRAWL_API_KEY"));

        let mut blank = KEYS.to_vec();
        blank[0] = ("SERPER_API_KEY", "  ");
        let err = Config::from_lookup(lookup(&blank)).unwrap_err();
        assert!(err.to_string().contains("SERPER_API_KEY"));
    }

    #[test]
    fn test_poll_overrides() {
        let mut pairs = KEYS.to_vec();
        pairs.push(("EXTRACT_POLL_INTERVAL_SECS", "2"));
        pairs.push(("EXTRACT_MAX_POLL_ATTEMPTS", "10"));
        let config = Config::from_lookup(lookup(&pairs)).unwrap();

        assert_eq!(config.poll_policy.interval, Duration::from_secs(2));
        assert_eq!(config.poll_policy.max_attempts, 10);
    }

    #[test]
    fn test_rejects_invalid_poll_settings() {
        let mut zero = KEYS.to_vec();
        zero.push(("EXTRACT_MAX_POLL_ATTEMPTS", "0"));
        assert!(Config::from_lookup(lookup(&zero)).is_err());

        let mut garbage = KEYS.to_vec();
        garbage.push(("EXTRACT_POLL_INTERVAL_SECS", "soon"));
        let err = Config::from_lookup(lookup(&garbage)).unwrap_err();
        assert!(err.to_string().contains("EXTRACT_POLL_INTERVAL_SECS"));
    }

    #[test]
    fn test_poll_interval_ceiling() {
        let mut hour = KEYS.to_vec();
        hour.push(("EXTRACT_POLL_INTERVAL_SECS", "3600"));
        let config = Config::from_lookup(lookup(&hour)).unwrap();
        assert_eq!(config.poll_policy.interval, Duration::from_secs(3600));

        let mut huge = KEYS.to_vec();
        huge.push(("EXTRACT_POLL_INTERVAL_SECS", "18446744073709551615"));
        huge.push(("EXTRACT_MAX_POLL_ATTEMPTS", "3"));
        let err = Config::from_lookup(lookup(&huge)).unwrap_err();
        assert!(err.to_string().contains("at most 3600"));
    }

    #[test]
    fn test_debug_redacts_keys() {
        let config = Config::from_lookup(lookup(&KEYS)).unwrap();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("sk-or-key"));
        assert!(debug.contains("[REDACTED]"));
    }
}
