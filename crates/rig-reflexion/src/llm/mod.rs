//! Language-model collaborator
//!
//! Steps only see [`LanguageModel`]: a prompt goes in, text comes out. The
//! text may or may not carry a fenced JSON block; making sense of it is the
//! job of [`crate::structured`].

mod rig_adapter;

pub use rig_adapter::RigModel;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ResearchError;

/// Sampling options passed with every generation request
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationOptions {
    pub temperature: f64,
    pub max_output_tokens: u64,
}

impl GenerationOptions {
    pub fn new(temperature: f64, max_output_tokens: u64) -> Self {
        Self {
            temperature,
            max_output_tokens,
        }
    }
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self::new(0.1, 1000)
    }
}

/// Text generation capability used by the Plan, Synthesize and Reflexion steps
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Generate a completion for `prompt`
    async fn generate(&self, prompt: &str, options: &GenerationOptions) -> Result<String, ResearchError>;

    /// Provider/model name for logging
    fn name(&self) -> &str;
}
