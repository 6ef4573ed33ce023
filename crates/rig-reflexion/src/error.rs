//! Error types for the research workflow
//!
//! Steps never surface these to callers: each step folds its error into the
//! research state. They exist so collaborators, stores and the orchestrator can
//! report failures with `?` internally.

use std::time::Duration;
use thiserror::Error;

use crate::state::{Outcome, Step};

/// Top-level error for the research workflow
#[derive(Debug, Error)]
pub enum ResearchError {
    /// Language-model collaborator failure
    #[error("LLM error: {0}")]
    Llm(String),

    /// Search-provider collaborator failure
    #[error("Search error: {0}")]
    Search(#[from] SearchError),

    /// Synthesis attempted with an empty source list
    #[error("No sources available for synthesis")]
    NoSources,

    /// Checkpoint store failure
    #[error("Checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),

    /// The routing table has no rule for an outcome reported after a step
    #[error("No route after {step} for outcome {outcome}")]
    Routing { step: Step, outcome: Outcome },

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Whole-run wall-clock timeout
    #[error("Workflow timed out after {0:?}")]
    Timeout(Duration),

    /// Resume rejected
    #[error("Resume failed: {0}")]
    Resume(String),
}

impl ResearchError {
    /// Create an LLM error
    pub fn llm(message: impl Into<String>) -> Self {
        Self::Llm(message.into())
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a routing error
    pub fn routing(step: Step, outcome: Outcome) -> Self {
        Self::Routing { step, outcome }
    }
}

/// Typed errors for search providers
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Request timed out")]
    Timeout,

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Unauthorized - check API key")]
    Unauthorized,

    #[error("Rate limited - too many requests")]
    RateLimited,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Server error ({0}): {1}")]
    ServerError(u16, String),

    #[error("HTTP error ({0}): {1}")]
    HttpError(u16, String),

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("Missing API key: {0}")]
    MissingApiKey(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl SearchError {
    /// Whether the request may succeed if sent again
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SearchError::Timeout
                | SearchError::Connection(_)
                | SearchError::RateLimited
                | SearchError::ServerError(_, _)
        )
    }
}

/// Checkpoint store errors
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Compression error: {0}")]
    Compression(String),
}
