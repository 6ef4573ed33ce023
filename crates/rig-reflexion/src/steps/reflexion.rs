use tracing::{info, warn};

use super::prompts::ResearchPrompts;
use super::ResearchSteps;
use crate::error::ResearchError;
use crate::state::{Outcome, ReflexionOutcome, ResearchState};
use crate::structured::{ReflexionOutput, StructuredOutput};
use crate::text::truncate_chars;

const CONTEXT_ERRORS: usize = 3;

/// What went wrong, for outcomes that carry no error message of their own
pub fn failure_cause(state: &ResearchState) -> Option<String> {
    match state.current_step {
        Outcome::SearchComplete if state.sources.is_empty() => Some("Search returned no sources".to_string()),
        Outcome::ValidationComplete if state.sources.is_empty() => {
            Some("All sources were filtered by safety validation".to_string())
        }
        Outcome::SafetyFailed => {
            let flagged = state
                .safety_checks
                .last()
                .map(|c| c.flagged_content.join(", "))
                .unwrap_or_default();
            if flagged.is_empty() {
                Some("Draft failed content moderation".to_string())
            } else {
                Some(format!("Draft failed content moderation (flagged: {flagged})"))
            }
        }
        _ => None,
    }
}

fn error_context(state: &ResearchState) -> String {
    let mut parts: Vec<String> = state.recent_errors(CONTEXT_ERRORS).to_vec();
    parts.extend(failure_cause(state));
    parts.join("; ")
}

impl ResearchSteps {
    /// Critique the failed attempt and decide whether to retry
    pub async fn reflexion(&self, state: &mut ResearchState) {
        info!(
            request_id = %state.request_id,
            from = %state.current_step,
            retry = state.retry_count,
            max_retries = state.max_retries,
            "Performing reflexion on failed attempt"
        );

        match self.generate_reflexion(state).await {
            Ok(output) => {
                state.critique = output.critique;
                state.improvements = output.improvement_suggestions;
                if let Some(plan) = output.revised_plan {
                    state.plan = plan;
                }

                if output.should_retry && state.retries_remaining() {
                    state.retry_count += 1;
                    info!(
                        request_id = %state.request_id,
                        retry = state.retry_count,
                        max_retries = state.max_retries,
                        critique = truncate_chars(&state.critique, 100),
                        "Retrying"
                    );
                    state.set_outcome(ReflexionOutcome::RetryPlanning);
                } else {
                    info!(
                        request_id = %state.request_id,
                        should_retry = output.should_retry,
                        "Max retries reached or retry not recommended"
                    );
                    state.set_outcome(ReflexionOutcome::MaxRetriesReached);
                }
            }
            Err(e) => {
                warn!(request_id = %state.request_id, error = %e, "Reflexion failed");
                state.errors.push(format!("Reflexion failed: {e}"));
                state.set_outcome(ReflexionOutcome::Failed);
            }
        }

        state.touch();
    }

    async fn generate_reflexion(&self, state: &ResearchState) -> Result<ReflexionOutput, ResearchError> {
        let previous_attempt = if state.draft.is_empty() {
            "No draft generated"
        } else {
            state.draft.as_str()
        };
        let prompt = ResearchPrompts::reflexion(&state.query, previous_attempt, &error_context(state));

        let response = self
            .llm
            .generate(&prompt, &self.config.generation_options())
            .await?;

        Ok(ReflexionOutput::parse(&response))
    }
}
