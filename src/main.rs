//! # Safe Research Agent
//!
//! A research agent built on Rig that plans, searches, validates its sources,
//! writes a draft, checks it for unsafe content and, when something goes
//! wrong, critiques its own attempt and tries again a bounded number of times.
//!
//! ## Quick Start
//! ```bash
//! export TAVILY_API_KEY=tvly-...
//! cargo run -- "What are the latest developments in Rust async?"
//! ```

// =============================================================================
// MODULE DECLARATIONS
// =============================================================================

/// Environment configuration
mod config;

/// Collaborator wiring, output and reports
mod agent;

// =============================================================================
// IMPORTS
// =============================================================================
use anyhow::Result;
use clap::Parser;
use std::path::Path;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use rig_reflexion::Outcome;

use crate::agent::{print_history, print_state, save_report, ResearchAgent};
use crate::config::{AppConfig, LlmProvider};

/// Directory reports are written to with `--save-report`
const REPORTS_DIR: &str = "reports";

// =============================================================================
// CLI ARGUMENTS
// =============================================================================
#[derive(Parser, Debug)]
#[command(
    name = "safe-research-agent",
    version,
    about = "A research agent with safety validation and self-correcting retries",
    long_about = r#"
Safe Research Agent

Researches a question in a loop of:
  1. Plan the research and the search queries
  2. Search the web (Tavily) and keep only trusted, clean sources
  3. Synthesize a markdown report
  4. Check the report for unsafe content
  5. On failure, critique the attempt and retry (up to MAX_RETRIES)

Every step is checkpointed, so an interrupted run can be resumed.

PREREQUISITES:
  TAVILY_API_KEY must be set. For Ollama (the default): ollama serve
  For OpenAI or Gemini set OPENAI_API_KEY or GEMINI_API_KEY.

EXAMPLES:
  safe-research-agent "What are the latest developments in Rust async?"
  safe-research-agent --thread-id rust-async --save-report "Rust async runtimes"
  safe-research-agent --thread-id rust-async --resume
  safe-research-agent --thread-id rust-async --history
  safe-research-agent --provider openai --model gpt-4o-mini "Quantum error correction"
"#
)]
struct Args {
    /// The research topic or question to investigate
    #[arg(
        value_name = "QUERY",
        required_unless_present_any = ["show_config", "resume", "history"]
    )]
    query: Option<String>,

    /// Checkpoint thread to record the run under
    #[arg(short = 't', long = "thread-id")]
    thread_id: Option<String>,

    /// Resume the thread given by --thread-id from its last checkpoint
    #[arg(long, requires = "thread_id", conflicts_with = "history")]
    resume: bool,

    /// Print the checkpoint history of --thread-id and exit
    #[arg(long, requires = "thread_id")]
    history: bool,

    /// Print the configuration (without secrets) and exit
    #[arg(long = "show-config")]
    show_config: bool,

    /// Save the report of a completed run under reports/
    #[arg(short = 's', long = "save-report")]
    save_report: bool,

    /// LLM provider (overrides LLM_PROVIDER)
    #[arg(short = 'p', long, value_enum)]
    provider: Option<LlmProvider>,

    /// Model name (overrides LLM_MODEL)
    #[arg(short = 'm', long)]
    model: Option<String>,

    /// Maximum reflexion retries (overrides MAX_RETRIES)
    #[arg(long = "max-retries")]
    max_retries: Option<u32>,

    /// Enable verbose/debug logging
    #[arg(short = 'v', long)]
    verbose: bool,
}

// =============================================================================
// MAIN FUNCTION
// =============================================================================
#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(args.verbose)?;

    info!("Safe Research Agent starting up...");

    let config = load_config(&args)?;

    if args.show_config {
        for (key, value) in config.safe_summary() {
            println!("{key:<24} {value}");
        }
        return Ok(());
    }

    config.validate()?;

    info!(
        provider = %config.provider,
        model = %config.model_name(),
        max_retries = config.research.max_retries,
        "Configuration loaded"
    );

    let agent = ResearchAgent::new(config)?;
    let thread_id = args.thread_id.as_deref();

    if args.history {
        let thread_id = thread_id.unwrap_or_default();
        let history = agent.history(thread_id).await?;
        print_history(thread_id, &history);
        return Ok(());
    }

    let state = match (args.resume, thread_id, args.query.as_deref()) {
        (true, Some(thread_id), _) => agent.resume(thread_id).await?,
        (_, _, Some(query)) => agent.research(query, thread_id).await,
        _ => anyhow::bail!("A QUERY is required"),
    };

    print_state(&state);

    if state.current_step != Outcome::Completed {
        error!(outcome = %state.current_step, "Research did not complete");
        anyhow::bail!("Research ended with status {}", state.current_step);
    }

    if args.save_report {
        match save_report(&state, thread_id, Path::new(REPORTS_DIR)) {
            Ok(path) => println!("Report saved to {}", path.display()),
            Err(e) => warn!(error = %e, "Failed to save report"),
        }
    }

    info!("Research completed successfully");
    Ok(())
}

/// Environment configuration with command-line overrides applied
fn load_config(args: &Args) -> Result<AppConfig> {
    let mut config = AppConfig::from_env()?;

    if let Some(provider) = args.provider {
        config.provider = provider;
    }
    if let Some(model) = &args.model {
        info!(model = %model, "Using model from command line");
        config.model = Some(model.clone());
    }
    if let Some(max_retries) = args.max_retries {
        config.research.max_retries = max_retries;
    }

    Ok(config)
}

// =============================================================================
// LOGGING INITIALIZATION
// =============================================================================
/// `--verbose` forces debug; otherwise `RUST_LOG` applies, defaulting to info
fn init_logging(verbose: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to set logging subscriber: {}", e))?;

    Ok(())
}
