//! Research workflow configuration
//!
//! # Environment Variables
//!
//! | Variable | Purpose | Default |
//! |----------|---------|---------|
//! | `MAX_RETRIES` | Reflexion retry budget | 3 |
//! | `MAX_SEARCH_RESULTS` | Sources kept after search | 10 |
//! | `TEMPERATURE` | LLM sampling temperature | 0.1 |
//! | `MAX_OUTPUT_TOKENS` | LLM response limit | 1000 |
//! | `RATE_LIMIT_REQUESTS_PER_MINUTE` | Search request budget | 60 |
//! | `CHECKPOINT_ENABLED` | Persist state after each step | true |
//! | `CHECKPOINT_PATH` | Directory for file checkpoints | `./checkpoints` |
//! | `RUN_TIMEOUT_SECS` | Wall-clock limit for a whole run | unset |
//! | `TRUSTED_DOMAINS` | Comma-separated domain allow-list | built-in list |
//! | `BLOCKED_KEYWORDS` | Comma-separated moderation keywords | built-in list |
//!
//! A list variable that is blank, or only commas, keeps the default.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ResearchError;
use crate::llm::GenerationOptions;

/// Domains whose sources are considered credible
pub const DEFAULT_TRUSTED_DOMAINS: &[&str] = &[
    "wikipedia.org",
    "arxiv.org",
    "pubmed.ncbi.nlm.nih.gov",
    "scholar.google.com",
    "ieee.org",
    "acm.org",
    "nature.com",
    "science.org",
    "reuters.com",
    "bbc.com",
    "cnn.com",
    "nytimes.com",
    "wsj.com",
    "bloomberg.com",
    "techcrunch.com",
    "wired.com",
    "mit.edu",
    "stanford.edu",
    "harvard.edu",
    "github.com",
    "stackoverflow.com",
    "nvidia.com",
    "amd.com",
    "intel.com",
    "microsoft.com",
    "apple.com",
    "google.com",
    "techpowerup.com",
    "anandtech.com",
    "tomshardware.com",
    "pcgamer.com",
    "ign.com",
    "gamespot.com",
    "polygon.com",
    "theverge.com",
    "engadget.com",
    "ars-technica.com",
    "zdnet.com",
    "cnet.com",
    "pcworld.com",
    "computerworld.com",
    "guru3d.com",
    "reddit.com",
    "notebookcheck.net",
    "digitaltrends.com",
    "tweaktown.com",
    "overclock3d.net",
    "hardwarecanucks.com",
    "techspot.com",
    "phoronix.com",
];

/// Keywords that flag content during moderation
pub const DEFAULT_BLOCKED_KEYWORDS: &[&str] = &[
    "violence",
    "hate",
    "harassment",
    "illegal",
    "harmful",
    "dangerous",
    "explicit",
    "adult",
    "nsfw",
];

/// Configuration for a research workflow run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchConfig {
    /// Maximum reflexion-driven retries per run
    pub max_retries: u32,

    /// Maximum sources kept after search
    pub max_search_results: usize,

    /// Maximum planner queries actually sent to the search provider
    pub max_search_queries: usize,

    pub trusted_domains: BTreeSet<String>,

    pub blocked_keywords: Vec<String>,

    pub rate_limit_requests_per_minute: u32,

    /// Sampling temperature (0.0 - 2.0)
    pub temperature: f64,

    pub max_output_tokens: u64,

    pub checkpoint_enabled: bool,

    pub checkpoint_path: PathBuf,

    /// Source content longer than this (in chars) is truncated
    pub max_content_length: usize,

    #[serde(with = "humantime_serde")]
    pub search_timeout: Duration,

    /// Wall-clock limit for a whole run (None = unbounded)
    #[serde(default, with = "humantime_serde")]
    pub run_timeout: Option<Duration>,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            max_search_results: 10,
            max_search_queries: 3,
            trusted_domains: DEFAULT_TRUSTED_DOMAINS.iter().map(|d| d.to_string()).collect(),
            blocked_keywords: DEFAULT_BLOCKED_KEYWORDS.iter().map(|k| k.to_string()).collect(),
            rate_limit_requests_per_minute: 60,
            temperature: 0.1,
            max_output_tokens: 1000,
            checkpoint_enabled: true,
            checkpoint_path: PathBuf::from("./checkpoints"),
            max_content_length: 10_000,
            search_timeout: Duration::from_secs(30),
            run_timeout: None,
        }
    }
}

impl ResearchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from the environment (and `.env` if present)
    pub fn from_env() -> Result<Self, ResearchError> {
        let _ = dotenvy::dotenv();

        let mut config = Self::default();

        if let Some(v) = parse_var("MAX_RETRIES")? {
            config.max_retries = v;
        }
        if let Some(v) = parse_var("MAX_SEARCH_RESULTS")? {
            config.max_search_results = v;
        }
        if let Some(v) = parse_var("TEMPERATURE")? {
            config.temperature = v;
        }
        if let Some(v) = parse_var("MAX_OUTPUT_TOKENS")? {
            config.max_output_tokens = v;
        }
        if let Some(v) = parse_var("RATE_LIMIT_REQUESTS_PER_MINUTE")? {
            config.rate_limit_requests_per_minute = v;
        }
        if let Some(v) = parse_var("CHECKPOINT_ENABLED")? {
            config.checkpoint_enabled = v;
        }
        if let Ok(path) = env::var("CHECKPOINT_PATH") {
            config.checkpoint_path = PathBuf::from(path);
        }
        if let Some(secs) = parse_var::<u64>("RUN_TIMEOUT_SECS")? {
            config.run_timeout = Some(Duration::from_secs(secs));
        }
        if let Some(domains) = list_var("TRUSTED_DOMAINS") {
            config.trusted_domains = domains.into_iter().collect();
        }
        if let Some(keywords) = list_var("BLOCKED_KEYWORDS") {
            config.blocked_keywords = keywords;
        }

        Ok(config)
    }

    /// Check that all values are usable before a run starts
    pub fn validate(&self) -> Result<(), ResearchError> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ResearchError::config(format!(
                "temperature must be between 0.0 and 2.0, got {}",
                self.temperature
            )));
        }
        if self.max_search_results == 0 {
            return Err(ResearchError::config("max_search_results must be at least 1"));
        }
        if self.max_search_queries == 0 {
            return Err(ResearchError::config("max_search_queries must be at least 1"));
        }
        if self.rate_limit_requests_per_minute == 0 {
            return Err(ResearchError::config(
                "rate_limit_requests_per_minute must be at least 1",
            ));
        }
        if self.trusted_domains.is_empty() {
            return Err(ResearchError::config("trusted_domains cannot be empty"));
        }
        Ok(())
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_max_search_results(mut self, max: usize) -> Self {
        self.max_search_results = max;
        self
    }

    pub fn with_trusted_domains<I, S>(mut self, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.trusted_domains = domains.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_blocked_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.blocked_keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_checkpointing(mut self, enabled: bool) -> Self {
        self.checkpoint_enabled = enabled;
        self
    }

    pub fn with_run_timeout(mut self, timeout: Duration) -> Self {
        self.run_timeout = Some(timeout);
        self
    }

    /// LLM options derived from this config
    pub fn generation_options(&self) -> GenerationOptions {
        GenerationOptions::new(self.temperature, self.max_output_tokens)
    }

    /// Secret-free view of the settings, for logging and `--show-config`
    pub fn safe_summary(&self) -> Vec<(&'static str, String)> {
        vec![
            ("temperature", self.temperature.to_string()),
            ("max_tokens", self.max_output_tokens.to_string()),
            ("max_retries", self.max_retries.to_string()),
            ("max_search_results", self.max_search_results.to_string()),
            ("rate_limit", self.rate_limit_requests_per_minute.to_string()),
            ("trusted_domains_count", self.trusted_domains.len().to_string()),
            ("checkpoint_enabled", self.checkpoint_enabled.to_string()),
        ]
    }
}

fn parse_var<T: FromStr>(name: &str) -> Result<Option<T>, ResearchError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ResearchError::config(format!("{name} has an invalid value: {raw}"))),
        Err(_) => Ok(None),
    }
}

fn list_var(name: &str) -> Option<Vec<String>> {
    let items = parse_list(&env::var(name).ok()?);
    (!items.is_empty()).then_some(items)
}

/// Split on commas, trimming each item and dropping empties
fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}
