use tracing::{info, warn};

use super::prompts::ResearchPrompts;
use super::ResearchSteps;
use crate::error::ResearchError;
use crate::state::{PlanOutcome, ResearchState};
use crate::structured::{PlanningOutput, StructuredOutput};
use crate::text::truncate_chars;

impl ResearchSteps {
    /// Produce a plan and search queries for the state's query
    pub async fn plan(&self, state: &mut ResearchState) {
        info!(request_id = %state.request_id, retry = state.retry_count, "Planning research");

        match self.generate_plan(state).await {
            Ok(output) => {
                info!(
                    request_id = %state.request_id,
                    queries = output.search_queries.len(),
                    plan = truncate_chars(&output.research_plan, 100),
                    "Plan created"
                );
                state.plan = output.research_plan;
                state.search_queries = output.search_queries;
                state.set_outcome(PlanOutcome::Complete);
            }
            Err(e) => {
                let message = format!("Planning failed: {e}");
                warn!(request_id = %state.request_id, error = %e, "Planning failed");
                state.errors.push(message);
                state.set_outcome(PlanOutcome::Failed);
            }
        }

        state.touch();
    }

    async fn generate_plan(&self, state: &ResearchState) -> Result<PlanningOutput, ResearchError> {
        // Replan with the critique once reflexion has run
        let prompt = if state.retry_count > 0 && !state.critique.is_empty() {
            ResearchPrompts::replanning(&state.query, &state.plan, &state.critique, &state.improvements)
        } else {
            ResearchPrompts::planning(&state.query)
        };

        let response = self
            .llm
            .generate(&prompt, &self.config.generation_options())
            .await?;

        Ok(PlanningOutput::parse(&response))
    }
}
