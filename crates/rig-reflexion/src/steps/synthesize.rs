use chrono::{DateTime, Utc};
use tracing::{info, warn};

use super::prompts::ResearchPrompts;
use super::ResearchSteps;
use crate::error::ResearchError;
use crate::state::{ResearchState, SynthesizeOutcome};
use crate::structured::{StructuredOutput, SynthesisOutput};

/// Sources cited when the model names none
const FALLBACK_CITATIONS: usize = 3;

impl ResearchSteps {
    /// Write the Markdown draft from the top sources
    pub async fn synthesize(&self, state: &mut ResearchState) {
        info!(request_id = %state.request_id, sources = state.sources.len(), "Synthesizing research");

        match self.generate_synthesis(state).await {
            Ok(output) => {
                info!(
                    request_id = %state.request_id,
                    confidence = output.confidence_level,
                    "Research synthesized"
                );
                state.draft = format_draft(&state.query, &output, Utc::now());
                state.set_outcome(SynthesizeOutcome::Complete);
            }
            Err(e) => {
                warn!(request_id = %state.request_id, error = %e, "Synthesis failed");
                state.errors.push(format!("Synthesis failed: {e}"));
                state.set_outcome(SynthesizeOutcome::Failed);
            }
        }

        state.touch();
    }

    async fn generate_synthesis(&self, state: &ResearchState) -> Result<SynthesisOutput, ResearchError> {
        if state.sources.is_empty() {
            return Err(ResearchError::NoSources);
        }

        let prompt = ResearchPrompts::synthesis(&state.query, &state.sources);
        let response = self
            .llm
            .generate(&prompt, &self.config.generation_options())
            .await?;

        let mut output = SynthesisOutput::parse(&response);
        if output.sources_used.is_empty() {
            output.sources_used = state
                .sources
                .iter()
                .take(FALLBACK_CITATIONS)
                .map(|s| s.url.clone())
                .collect();
        }
        Ok(output)
    }
}

fn bullets(items: &[String]) -> String {
    items
        .iter()
        .map(|item| format!("• {item}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render a synthesis as the draft document. Section order is fixed:
/// Overview, Key Findings, Sources, Confidence Level, Recommendations, then a
/// timestamp footer.
pub fn format_draft(query: &str, output: &SynthesisOutput, completed_at: DateTime<Utc>) -> String {
    format!(
        "# Research Summary: {query}\n\
         \n\
         ## Overview\n\
         {summary}\n\
         \n\
         ## Key Findings\n\
         {findings}\n\
         \n\
         ## Sources\n\
         {sources}\n\
         \n\
         ## Confidence Level\n\
         {confidence:.2} (out of 1.0)\n\
         \n\
         ## Recommendations\n\
         {recommendations}\n\
         \n\
         ---\n\
         *Research completed at {timestamp}*\n",
        summary = output.research_summary,
        findings = bullets(&output.key_findings),
        sources = bullets(&output.sources_used),
        confidence = output.confidence_level,
        recommendations = bullets(&output.recommendations),
        timestamp = completed_at.format("%Y-%m-%d %H:%M:%S UTC"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::Arc;

    use crate::state::Outcome;
    use crate::steps::testing::{steps_with, test_config, trusted_source, ScriptedModel, StaticSearch};

    fn sample_output() -> SynthesisOutput {
        SynthesisOutput {
            research_summary: "Rust is memory safe.".into(),
            key_findings: vec!["No GC".into(), "Ownership".into()],
            sources_used: vec!["https://rust-lang.org".into()],
            confidence_level: 0.856,
            recommendations: vec!["Read the book".into()],
        }
    }

    #[test]
    fn test_format_draft_is_deterministic() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();
        let draft = format_draft("What is Rust?", &sample_output(), at);

        let expected = "\
# Research Summary: What is Rust?

## Overview
Rust is memory safe.

## Key Findings
• No GC
• Ownership

## Sources
• https://rust-lang.org

## Confidence Level
0.86 (out of 1.0)

## Recommendations
• Read the book

---
*Research completed at 2024-05-01 12:30:00 UTC*
";
        assert_eq!(draft, expected);
        assert_eq!(draft, format_draft("What is Rust?", &sample_output(), at));
    }

    #[tokio::test]
    async fn test_synthesize_without_sources_fails() {
        let model = Arc::new(ScriptedModel::new(["unused"]));
        let steps = steps_with(model.clone(), Arc::new(StaticSearch::new()), test_config());
        let mut state = ResearchState::new("q");

        steps.synthesize(&mut state).await;

        assert_eq!(state.current_step, Outcome::SynthesisFailed);
        assert_eq!(state.errors, vec!["Synthesis failed: No sources available for synthesis"]);
        assert_eq!(model.prompt_count(), 0);
    }

    #[tokio::test]
    async fn test_synthesize_success() {
        let reply = "```json\n{\"research_summary\": \"Summary\", \"key_findings\": [\"k\"], \"sources_used\": [], \"confidence_level\": 0.9, \"recommendations\": []}\n```";
        let model = Arc::new(ScriptedModel::new([reply]));
        let steps = steps_with(model, Arc::new(StaticSearch::new()), test_config());
        let mut state = ResearchState::new("q");
        state.sources = vec![trusted_source(1, 0.9), trusted_source(2, 0.8)];

        steps.synthesize(&mut state).await;

        assert_eq!(state.current_step, Outcome::SynthesisComplete);
        assert!(state.draft.starts_with("# Research Summary: q\n"));
        assert!(state.draft.contains("• https://example.com/1\n• https://example.com/2"));
        assert!(state.draft.contains("0.90 (out of 1.0)"));
    }

    #[tokio::test]
    async fn test_synthesize_collaborator_error() {
        let model = Arc::new(ScriptedModel::failing("quota exceeded"));
        let steps = steps_with(model, Arc::new(StaticSearch::new()), test_config());
        let mut state = ResearchState::new("q");
        state.sources = vec![trusted_source(1, 0.9)];

        steps.synthesize(&mut state).await;

        assert_eq!(state.current_step, Outcome::SynthesisFailed);
        assert!(state.errors[0].contains("quota exceeded"));
        assert!(state.draft.is_empty());
    }
}
