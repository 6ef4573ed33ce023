//! # Configuration Module
//!
//! Loads the binary's settings from environment variables (and `.env`).
//! Workflow tuning lives in [`ResearchConfig`]; this module adds what only the
//! binary needs: which LLM provider to talk to and the API keys for it.

use anyhow::{Context, Result};
use std::env;
use std::fmt;
use std::str::FromStr;

use rig_reflexion::ResearchConfig;

/// Prefix of the placeholder values shipped in `.env.example`
const PLACEHOLDER_PREFIX: &str = "your_";

// =============================================================================
// LLM PROVIDER
// =============================================================================
/// The Rig provider used for planning, synthesis and reflexion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum LlmProvider {
    /// Local models served by Ollama
    #[default]
    Ollama,
    #[value(name = "openai")]
    OpenAi,
    Gemini,
}

impl LlmProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            LlmProvider::Ollama => "ollama",
            LlmProvider::OpenAi => "openai",
            LlmProvider::Gemini => "gemini",
        }
    }

    /// Model used when `LLM_MODEL` is not set
    pub fn default_model(&self) -> &'static str {
        match self {
            LlmProvider::Ollama => "llama3.2",
            LlmProvider::OpenAi => "gpt-4o-mini",
            LlmProvider::Gemini => "gemini-1.5-flash",
        }
    }
}

impl fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LlmProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ollama" => Ok(LlmProvider::Ollama),
            "openai" => Ok(LlmProvider::OpenAi),
            "gemini" | "google" => Ok(LlmProvider::Gemini),
            other => anyhow::bail!("Unknown LLM_PROVIDER '{other}' (expected ollama, openai or gemini)"),
        }
    }
}

// =============================================================================
// CONFIGURATION STRUCT
// =============================================================================
/// Everything the binary needs to build a research agent
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Tavily search API key (required)
    pub tavily_api_key: String,

    pub provider: LlmProvider,

    /// Model name; `None` means the provider's default
    pub model: Option<String>,

    /// Ollama server URL (default: http://localhost:11434)
    pub ollama_host: String,

    pub openai_api_key: Option<String>,
    pub gemini_api_key: Option<String>,

    /// Workflow settings
    pub research: ResearchConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            tavily_api_key: String::new(),
            provider: LlmProvider::default(),
            model: None,
            ollama_host: "http://localhost:11434".to_string(),
            openai_api_key: None,
            gemini_api_key: None,
            research: ResearchConfig::default(),
        }
    }
}

// =============================================================================
// CONFIGURATION LOADING
// =============================================================================
impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// `.env` is read first if present. Malformed numeric values fail here
    /// with the variable name in the error.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();

        let mut config = AppConfig {
            research: ResearchConfig::from_env().context("Invalid research configuration")?,
            ..AppConfig::default()
        };

        if let Some(val) = non_empty_var("TAVILY_API_KEY") {
            config.tavily_api_key = val;
        }

        if let Some(val) = non_empty_var("LLM_PROVIDER") {
            config.provider = val.parse()?;
        }

        config.model = non_empty_var("LLM_MODEL");

        if let Some(val) = non_empty_var("OLLAMA_API_BASE_URL") {
            config.ollama_host = val;
        }

        config.openai_api_key = non_empty_var("OPENAI_API_KEY");
        config.gemini_api_key = non_empty_var("GEMINI_API_KEY");

        Ok(config)
    }

    /// The model to request from the provider
    pub fn model_name(&self) -> &str {
        self.model.as_deref().unwrap_or_else(|| self.provider.default_model())
    }

    /// Fail fast on missing keys before any request is made
    pub fn validate(&self) -> Result<()> {
        require_key("TAVILY_API_KEY", Some(&self.tavily_api_key))?;

        match self.provider {
            LlmProvider::Ollama => {}
            LlmProvider::OpenAi => require_key("OPENAI_API_KEY", self.openai_api_key.as_deref())?,
            LlmProvider::Gemini => require_key("GEMINI_API_KEY", self.gemini_api_key.as_deref())?,
        }

        if self.model_name().trim().is_empty() {
            anyhow::bail!("LLM_MODEL cannot be empty");
        }

        self.research.validate().context("Invalid research configuration")?;

        Ok(())
    }

    /// Secret-free view for `--show-config`
    pub fn safe_summary(&self) -> Vec<(&'static str, String)> {
        let mut summary = vec![
            ("llm_provider", self.provider.to_string()),
            ("llm_model", self.model_name().to_string()),
            ("tavily_api_key", mask(&self.tavily_api_key)),
        ];
        if self.provider == LlmProvider::Ollama {
            summary.push(("ollama_host", self.ollama_host.clone()));
        }
        summary.extend(self.research.safe_summary());
        summary
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn require_key(name: &str, value: Option<&str>) -> Result<()> {
    match value.map(str::trim) {
        None | Some("") => anyhow::bail!("{name} is required"),
        Some(v) if v.starts_with(PLACEHOLDER_PREFIX) => {
            anyhow::bail!("{name} still has its placeholder value; set a real key")
        }
        Some(_) => Ok(()),
    }
}

fn mask(key: &str) -> String {
    if key.is_empty() {
        "(not set)".to_string()
    } else {
        "(set)".to_string()
    }
}

// =============================================================================
// UNIT TESTS
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> AppConfig {
        AppConfig {
            tavily_api_key: "tvly-123".to_string(),
            ..AppConfig::default()
        }
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();

        assert_eq!(config.provider, LlmProvider::Ollama);
        assert_eq!(config.model_name(), "llama3.2");
        assert_eq!(config.ollama_host, "http://localhost:11434");
        assert_eq!(config.research.max_retries, 3);
    }

    #[test]
    fn test_config_validation_valid() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn test_missing_tavily_key_rejected() {
        let err = AppConfig::default().validate().unwrap_err();
        assert!(err.to_string().contains("TAVILY_API_KEY"));
    }

    #[test]
    fn test_placeholder_key_rejected() {
        let mut config = valid();
        config.tavily_api_key = "your_tavily_api_key_here".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_provider_key_required() {
        let mut config = valid();
        config.provider = LlmProvider::OpenAi;
        assert!(config.validate().is_err());

        config.openai_api_key = Some("sk-test".to_string());
        assert!(config.validate().is_ok());
        assert_eq!(config.model_name(), "gpt-4o-mini");
    }

    #[test]
    fn test_invalid_research_config_rejected() {
        let mut config = valid();
        config.research.temperature = 3.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_provider_parsing() {
        assert_eq!("OpenAI".parse::<LlmProvider>().unwrap(), LlmProvider::OpenAi);
        assert_eq!("google".parse::<LlmProvider>().unwrap(), LlmProvider::Gemini);
        assert!("claude".parse::<LlmProvider>().is_err());
    }

    #[test]
    fn test_safe_summary_hides_keys() {
        let summary = valid().safe_summary();
        assert!(summary.iter().all(|(_, v)| !v.contains("tvly-123")));
        assert!(summary.iter().any(|(k, _)| *k == "ollama_host"));
    }
}
