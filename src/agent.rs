//! # Agent Module
//!
//! Wires the research workflow to real collaborators:
//! - a Rig agent (Ollama, OpenAI or Gemini) as the language model
//! - Tavily as the search provider, throttled by the shared rate limiter
//! - a file checkpoint store under `checkpoint_path`
//!
//! and renders finished runs for the terminal and for saved reports.

use anyhow::{Context, Result};
use chrono::Local;
use rig::client::{CompletionClient, Nothing, ProviderClient};
use rig::providers::{gemini, ollama, openai};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use rig_reflexion::{
    FileCheckpointStore, LanguageModel, Orchestrator, Outcome, ResearchState, ResearchSteps, RigModel,
    SafetyValidator, StateSnapshot, TavilySearch,
};

use crate::config::{AppConfig, LlmProvider};

/// Query characters kept in report file names
const REPORT_QUERY_CHARS: usize = 50;

/// Errors and warnings shown per run
const SHOWN_MESSAGES: usize = 3;

// =============================================================================
// RESEARCH AGENT STRUCT
// =============================================================================
/// The configured research workflow
pub struct ResearchAgent {
    config: AppConfig,
    orchestrator: Orchestrator,
}

impl ResearchAgent {
    /// Build every collaborator from the configuration.
    ///
    /// The configuration must already be validated: the OpenAI and Gemini
    /// keys are read from it as-is.
    pub fn new(config: AppConfig) -> Result<Self> {
        let research = config.research.clone();

        let llm = build_llm(&config)?;
        let safety = SafetyValidator::from_config(&research);

        let search = TavilySearch::new(config.tavily_api_key.clone())
            .with_timeout(research.search_timeout)
            .with_rate_limiter(safety.limiter());

        let steps = ResearchSteps::new(llm, Arc::new(search), safety, research.clone());
        let mut orchestrator = Orchestrator::new(steps);

        if research.checkpoint_enabled {
            debug!(path = %research.checkpoint_path.display(), "Using file checkpoint store");
            let store = FileCheckpointStore::new(&research.checkpoint_path, true);
            orchestrator = orchestrator.with_checkpoint_store(Arc::new(store));
        }

        Ok(Self { config, orchestrator })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Run a new research query
    pub async fn research(&self, query: &str, thread_id: Option<&str>) -> ResearchState {
        info!(query = %query, thread_id = ?thread_id, "Starting research task");
        self.orchestrator.run(query, thread_id).await
    }

    /// Continue an interrupted thread
    pub async fn resume(&self, thread_id: &str) -> Result<ResearchState> {
        info!(thread_id, "Resuming research task");
        self.orchestrator
            .resume(thread_id)
            .await
            .with_context(|| format!("Cannot resume thread {thread_id}"))
    }

    pub async fn history(&self, thread_id: &str) -> Result<Vec<StateSnapshot>> {
        self.orchestrator
            .history(thread_id)
            .await
            .with_context(|| format!("Cannot read history of thread {thread_id}"))
    }
}

/// Build the Rig agent for the configured provider.
///
/// Sampling options are fixed on the agent here, from the same config the
/// steps read their options from.
fn build_llm(config: &AppConfig) -> Result<Arc<dyn LanguageModel>> {
    let model = config.model_name();
    let options = config.research.generation_options();
    let name = format!("{}/{}", config.provider, model);

    info!(provider = %config.provider, model = %model, "Configuring language model");

    let llm: Arc<dyn LanguageModel> = match config.provider {
        LlmProvider::Ollama => {
            let client: ollama::Client = ollama::Client::builder()
                .api_key(Nothing)
                .base_url(&config.ollama_host)
                .build()
                .with_context(|| format!("Invalid Ollama host {}", config.ollama_host))?;
            let agent = client
                .agent(model)
                .temperature(options.temperature)
                .max_tokens(options.max_output_tokens)
                .build();
            Arc::new(RigModel::new(agent, name))
        }
        LlmProvider::OpenAi => {
            let key = config.openai_api_key.clone().context("OPENAI_API_KEY is required")?;
            let agent = openai::Client::from_val(key.into())
                .agent(model)
                .temperature(options.temperature)
                .max_tokens(options.max_output_tokens)
                .build();
            Arc::new(RigModel::new(agent, name))
        }
        LlmProvider::Gemini => {
            let key = config.gemini_api_key.clone().context("GEMINI_API_KEY is required")?;
            let agent = gemini::Client::from_val(key.into())
                .agent(model)
                .temperature(options.temperature)
                .max_tokens(options.max_output_tokens)
                .build();
            Arc::new(RigModel::new(agent, name))
        }
    };

    Ok(llm)
}

// =============================================================================
// OUTPUT
// =============================================================================
/// Print a finished run
pub fn print_state(state: &ResearchState) {
    println!("\n{}", "=".repeat(60));
    println!("RESEARCH RESULTS");
    println!("{}\n", "=".repeat(60));

    println!("Query:    {}", state.query);
    println!("Status:   {}", state.current_step);
    println!("Retries:  {}/{}", state.retry_count, state.max_retries);
    println!("Safe:     {}", if state.is_safe { "yes" } else { "no" });
    println!("Sources:  {}", state.sources.len());

    print_recent("Errors", &state.errors);
    print_recent("Warnings", &state.warnings);

    if state.current_step == Outcome::Completed && !state.draft.is_empty() {
        println!("\n{}", "-".repeat(60));
        println!("{}", state.draft);
    }

    println!("\n{}", "=".repeat(60));
}

fn print_recent(label: &str, messages: &[String]) {
    if messages.is_empty() {
        return;
    }
    println!("\n{label} ({}):", messages.len());
    let start = messages.len().saturating_sub(SHOWN_MESSAGES);
    for message in &messages[start..] {
        println!("  - {message}");
    }
}

/// Print a thread's checkpoint history, oldest first
pub fn print_history(thread_id: &str, history: &[StateSnapshot]) {
    if history.is_empty() {
        println!("No checkpoints for thread {thread_id}");
        return;
    }

    println!("History for thread {thread_id} ({} checkpoints):", history.len());
    for (i, snapshot) in history.iter().enumerate() {
        println!(
            "  {:>3}. {:<26} {}  sources={} errors={}",
            i + 1,
            snapshot.step.as_str(),
            snapshot.timestamp,
            snapshot.source_count,
            snapshot.error_count
        );
    }
}

// =============================================================================
// REPORTS
// =============================================================================
/// Write the draft of a completed run to `dir`, returning the file path
pub fn save_report(state: &ResearchState, thread_id: Option<&str>, dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;

    let timestamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
    let path = dir.join(report_file_name(&timestamp, thread_id, &state.query));

    std::fs::write(&path, &state.draft).with_context(|| format!("Failed to write {}", path.display()))?;
    info!(path = %path.display(), "Report saved");

    Ok(path)
}

/// `<timestamp>[_<thread>]_<query>.md`
pub fn report_file_name(timestamp: &str, thread_id: Option<&str>, query: &str) -> String {
    let query = sanitize_query(query);
    match thread_id {
        Some(thread) => format!("{timestamp}_{}_{query}.md", sanitize_query(thread)),
        None => format!("{timestamp}_{query}.md"),
    }
}

/// Keep alphanumerics, `-` and `_`; spaces become `_`
fn sanitize_query(query: &str) -> String {
    query
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .take(REPORT_QUERY_CHARS)
        .collect::<String>()
        .trim()
        .replace(' ', "_")
}
