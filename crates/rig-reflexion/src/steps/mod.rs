//! The six workflow steps
//!
//! Every step takes the run's state by `&mut`, calls at most one collaborator,
//! and reports its result by writing an outcome into `current_step`. Steps
//! never return errors: failures are appended to `errors` with a step prefix
//! and the step's `*_failed` outcome is set.

mod plan;
pub mod prompts;
mod reflexion;
mod safety_check;
mod search;
mod synthesize;
mod validate;

pub use reflexion::failure_cause;
pub use synthesize::format_draft;

use std::sync::Arc;

use crate::config::ResearchConfig;
use crate::llm::LanguageModel;
use crate::safety::SafetyValidator;
use crate::search::SearchProvider;
use crate::state::{ResearchState, Step};

/// Step implementations with their collaborators
#[derive(Clone)]
pub struct ResearchSteps {
    llm: Arc<dyn LanguageModel>,
    search: Arc<dyn SearchProvider>,
    safety: SafetyValidator,
    config: ResearchConfig,
}

impl ResearchSteps {
    pub fn new(
        llm: Arc<dyn LanguageModel>,
        search: Arc<dyn SearchProvider>,
        safety: SafetyValidator,
        config: ResearchConfig,
    ) -> Self {
        Self {
            llm,
            search,
            safety,
            config,
        }
    }

    pub fn config(&self) -> &ResearchConfig {
        &self.config
    }

    /// Execute one step against the state
    pub async fn run(&self, step: Step, state: &mut ResearchState) {
        match step {
            Step::Plan => self.plan(state).await,
            Step::Search => self.search(state).await,
            Step::Validate => self.validate(state),
            Step::Synthesize => self.synthesize(state).await,
            Step::SafetyCheck => self.safety_check(state),
            Step::Reflexion => self.reflexion(state).await,
        }
    }
}
