//! `LanguageModel` over a Rig agent
//!
//! Rig fixes sampling parameters when the agent is built, so the options a
//! step passes to [`RigModel::generate`] are only recorded in logs. Build the
//! agent with [`GenerationOptions`] from the same config to keep them in sync:
//!
//! ```rust,ignore
//! use rig::client::{CompletionClient, Nothing};
//! use rig::providers::ollama;
//!
//! let options = config.generation_options();
//! let client = ollama::Client::builder()
//!     .api_key(Nothing)
//!     .base_url("http://localhost:11434")
//!     .build()?;
//! let agent = client
//!     .agent("llama3.1:8b")
//!     .temperature(options.temperature)
//!     .max_tokens(options.max_output_tokens)
//!     .build();
//! let model = RigModel::new(agent, "ollama/llama3.1:8b");
//! ```

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use rig::agent::Agent;
use rig::completion::{CompletionModel, Prompt};

use super::{GenerationOptions, LanguageModel};
use crate::error::ResearchError;

/// Wraps a Rig `Agent<M>` as a [`LanguageModel`]
pub struct RigModel<M>
where
    M: CompletionModel + Send + Sync,
{
    agent: Arc<Agent<M>>,
    name: String,
}

impl<M> RigModel<M>
where
    M: CompletionModel + Send + Sync,
{
    pub fn new(agent: Agent<M>, name: impl Into<String>) -> Self {
        Self {
            agent: Arc::new(agent),
            name: name.into(),
        }
    }
}

#[async_trait]
impl<M> LanguageModel for RigModel<M>
where
    M: CompletionModel + Send + Sync + 'static,
{
    async fn generate(&self, prompt: &str, options: &GenerationOptions) -> Result<String, ResearchError> {
        debug!(
            model = %self.name,
            temperature = options.temperature,
            max_tokens = options.max_output_tokens,
            prompt_len = prompt.len(),
            "Sending prompt"
        );

        self.agent
            .prompt(prompt.to_string())
            .await
            .map_err(|e| ResearchError::llm(format!("{} request failed: {e}", self.name)))
    }

    fn name(&self) -> &str {
        &self.name
    }
}
