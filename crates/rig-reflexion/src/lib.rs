//! rig-reflexion: bounded-retry research workflow for Rig
//!
//! A research question goes through a fixed state machine:
//! - Plan: the LLM drafts a research plan and search queries
//! - Search: queries run against a `SearchProvider` (Tavily by default)
//! - Validate: every source passes URL, content and title checks
//! - Synthesize: the LLM writes a markdown draft from the surviving sources
//! - SafetyCheck: the draft is moderated before it is returned
//! - Reflexion: on failure, the LLM critiques the attempt and may replan
//!
//! Retries are bounded by `max_retries`, and every run ends in a terminal
//! outcome. State is checkpointed after each step so a thread can be resumed.
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use rig::client::{CompletionClient, ProviderClient};
//! use rig::providers::openai::Client;
//! use rig_reflexion::{
//!     Orchestrator, ResearchConfig, ResearchSteps, RigModel, SafetyValidator, TavilySearch,
//! };
//!
//! let config = ResearchConfig::from_env()?;
//! let agent = Client::from_env()
//!     .agent("gpt-4o-mini")
//!     .temperature(config.temperature)
//!     .max_tokens(config.max_output_tokens)
//!     .build();
//!
//! let safety = SafetyValidator::from_config(&config);
//! let search = TavilySearch::from_env()?.with_rate_limiter(safety.limiter());
//! let steps = ResearchSteps::new(
//!     Arc::new(RigModel::new(agent, "openai")),
//!     Arc::new(search),
//!     safety,
//!     config,
//! );
//!
//! let state = Orchestrator::new(steps).run("What is Rust's borrow checker?", None).await;
//! println!("{}", state.draft);
//! ```

pub mod checkpoint;
pub mod config;
pub mod error;
pub mod llm;
pub mod safety;
pub mod search;
pub mod state;
pub mod steps;
pub mod structured;
pub mod text;
pub mod workflow;

// Re-exports for convenience
pub use checkpoint::{CheckpointStore, FileCheckpointStore, MemoryCheckpointStore, StateSnapshot};
pub use config::ResearchConfig;
pub use error::{CheckpointError, ResearchError, SearchError};
pub use llm::{GenerationOptions, LanguageModel, RigModel};
pub use safety::{ContentModerator, PatternCategory, SafetyValidator, TokenBucketLimiter, UrlValidator};
pub use search::{SearchProvider, TavilySearch};
pub use state::{
    Outcome, PlanOutcome, ReflexionOutcome, ResearchState, SafetyCheck, SafetyOutcome, SearchOutcome,
    SearchResult, Step, SynthesizeOutcome, ValidateOutcome,
};
pub use steps::prompts::ResearchPrompts;
pub use steps::{failure_cause, format_draft, ResearchSteps};
pub use structured::{PlanningOutput, ReflexionOutput, StructuredOutput, SynthesisOutput};
pub use workflow::{resume_point, route, Orchestrator, Route, DEFAULT_THREAD_ID};
