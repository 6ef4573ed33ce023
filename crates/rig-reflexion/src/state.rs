//! Research workflow state definition
//!
//! A single `ResearchState` is created per run and threaded through every step
//! by exclusive (`&mut`) access. Steps report their result by writing an
//! [`Outcome`] into `current_step`; the router reads it back to pick the next
//! step.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ResearchError;

/// The six workflow nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Plan,
    Search,
    Validate,
    Synthesize,
    SafetyCheck,
    Reflexion,
}

impl Step {
    pub fn as_str(&self) -> &'static str {
        match self {
            Step::Plan => "plan",
            Step::Search => "search",
            Step::Validate => "validate",
            Step::Synthesize => "synthesize",
            Step::SafetyCheck => "safety_check",
            Step::Reflexion => "reflexion",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every value `current_step` may hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Fresh state, nothing has run yet
    #[default]
    Initialized,
    PlanningComplete,
    PlanningFailed,
    SearchComplete,
    SearchFailed,
    ValidationComplete,
    ValidationFailed,
    SynthesisComplete,
    SynthesisFailed,
    SafetyFailed,
    SafetyValidationFailed,
    /// Terminal success
    Completed,
    RetryPlanning,
    MaxRetriesReached,
    ReflexionFailed,
    /// Set by the run guard when something escaped a step or the router
    WorkflowFailed,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Initialized => "initialized",
            Outcome::PlanningComplete => "planning_complete",
            Outcome::PlanningFailed => "planning_failed",
            Outcome::SearchComplete => "search_complete",
            Outcome::SearchFailed => "search_failed",
            Outcome::ValidationComplete => "validation_complete",
            Outcome::ValidationFailed => "validation_failed",
            Outcome::SynthesisComplete => "synthesis_complete",
            Outcome::SynthesisFailed => "synthesis_failed",
            Outcome::SafetyFailed => "safety_failed",
            Outcome::SafetyValidationFailed => "safety_validation_failed",
            Outcome::Completed => "completed",
            Outcome::RetryPlanning => "retry_planning",
            Outcome::MaxRetriesReached => "max_retries_reached",
            Outcome::ReflexionFailed => "reflexion_failed",
            Outcome::WorkflowFailed => "workflow_failed",
        }
    }

    /// The step that writes this outcome, `None` for `Initialized` and
    /// `WorkflowFailed`.
    pub fn producer(&self) -> Option<Step> {
        match self {
            Outcome::Initialized | Outcome::WorkflowFailed => None,
            Outcome::PlanningComplete | Outcome::PlanningFailed => Some(Step::Plan),
            Outcome::SearchComplete | Outcome::SearchFailed => Some(Step::Search),
            Outcome::ValidationComplete | Outcome::ValidationFailed => Some(Step::Validate),
            Outcome::SynthesisComplete | Outcome::SynthesisFailed => Some(Step::Synthesize),
            Outcome::Completed | Outcome::SafetyFailed | Outcome::SafetyValidationFailed => {
                Some(Step::SafetyCheck)
            }
            Outcome::RetryPlanning | Outcome::MaxRetriesReached | Outcome::ReflexionFailed => {
                Some(Step::Reflexion)
            }
        }
    }

    /// Outcomes after which the machine never runs another step
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Outcome::Completed
                | Outcome::MaxRetriesReached
                | Outcome::ReflexionFailed
                | Outcome::WorkflowFailed
        )
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of the Plan step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanOutcome {
    Complete,
    Failed,
}

/// Result of the Search step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome {
    Complete,
    Failed,
}

/// Result of the Validate step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidateOutcome {
    Complete,
    Failed,
}

/// Result of the Synthesize step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SynthesizeOutcome {
    Complete,
    Failed,
}

/// Result of the final SafetyCheck step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SafetyOutcome {
    /// Draft passed moderation
    Completed,
    /// Moderation flagged the draft
    Flagged,
    /// Moderation itself failed
    ValidationFailed,
}

/// Result of the Reflexion step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReflexionOutcome {
    RetryPlanning,
    MaxRetriesReached,
    Failed,
}

impl From<PlanOutcome> for Outcome {
    fn from(outcome: PlanOutcome) -> Self {
        match outcome {
            PlanOutcome::Complete => Outcome::PlanningComplete,
            PlanOutcome::Failed => Outcome::PlanningFailed,
        }
    }
}

impl From<SearchOutcome> for Outcome {
    fn from(outcome: SearchOutcome) -> Self {
        match outcome {
            SearchOutcome::Complete => Outcome::SearchComplete,
            SearchOutcome::Failed => Outcome::SearchFailed,
        }
    }
}

impl From<ValidateOutcome> for Outcome {
    fn from(outcome: ValidateOutcome) -> Self {
        match outcome {
            ValidateOutcome::Complete => Outcome::ValidationComplete,
            ValidateOutcome::Failed => Outcome::ValidationFailed,
        }
    }
}

impl From<SynthesizeOutcome> for Outcome {
    fn from(outcome: SynthesizeOutcome) -> Self {
        match outcome {
            SynthesizeOutcome::Complete => Outcome::SynthesisComplete,
            SynthesizeOutcome::Failed => Outcome::SynthesisFailed,
        }
    }
}

impl From<SafetyOutcome> for Outcome {
    fn from(outcome: SafetyOutcome) -> Self {
        match outcome {
            SafetyOutcome::Completed => Outcome::Completed,
            SafetyOutcome::Flagged => Outcome::SafetyFailed,
            SafetyOutcome::ValidationFailed => Outcome::SafetyValidationFailed,
        }
    }
}

impl From<ReflexionOutcome> for Outcome {
    fn from(outcome: ReflexionOutcome) -> Self {
        match outcome {
            ReflexionOutcome::RetryPlanning => Outcome::RetryPlanning,
            ReflexionOutcome::MaxRetriesReached => Outcome::MaxRetriesReached,
            ReflexionOutcome::Failed => Outcome::ReflexionFailed,
        }
    }
}

impl TryFrom<Outcome> for PlanOutcome {
    type Error = ResearchError;

    fn try_from(outcome: Outcome) -> Result<Self, Self::Error> {
        match outcome {
            Outcome::PlanningComplete => Ok(PlanOutcome::Complete),
            Outcome::PlanningFailed => Ok(PlanOutcome::Failed),
            other => Err(ResearchError::routing(Step::Plan, other)),
        }
    }
}

impl TryFrom<Outcome> for SearchOutcome {
    type Error = ResearchError;

    fn try_from(outcome: Outcome) -> Result<Self, Self::Error> {
        match outcome {
            Outcome::SearchComplete => Ok(SearchOutcome::Complete),
            Outcome::SearchFailed => Ok(SearchOutcome::Failed),
            other => Err(ResearchError::routing(Step::Search, other)),
        }
    }
}

impl TryFrom<Outcome> for ValidateOutcome {
    type Error = ResearchError;

    fn try_from(outcome: Outcome) -> Result<Self, Self::Error> {
        match outcome {
            Outcome::ValidationComplete => Ok(ValidateOutcome::Complete),
            Outcome::ValidationFailed => Ok(ValidateOutcome::Failed),
            other => Err(ResearchError::routing(Step::Validate, other)),
        }
    }
}

impl TryFrom<Outcome> for SynthesizeOutcome {
    type Error = ResearchError;

    fn try_from(outcome: Outcome) -> Result<Self, Self::Error> {
        match outcome {
            Outcome::SynthesisComplete => Ok(SynthesizeOutcome::Complete),
            Outcome::SynthesisFailed => Ok(SynthesizeOutcome::Failed),
            other => Err(ResearchError::routing(Step::Synthesize, other)),
        }
    }
}

impl TryFrom<Outcome> for SafetyOutcome {
    type Error = ResearchError;

    fn try_from(outcome: Outcome) -> Result<Self, Self::Error> {
        match outcome {
            Outcome::Completed => Ok(SafetyOutcome::Completed),
            Outcome::SafetyFailed => Ok(SafetyOutcome::Flagged),
            Outcome::SafetyValidationFailed => Ok(SafetyOutcome::ValidationFailed),
            other => Err(ResearchError::routing(Step::SafetyCheck, other)),
        }
    }
}

impl TryFrom<Outcome> for ReflexionOutcome {
    type Error = ResearchError;

    fn try_from(outcome: Outcome) -> Result<Self, Self::Error> {
        match outcome {
            Outcome::RetryPlanning => Ok(ReflexionOutcome::RetryPlanning),
            Outcome::MaxRetriesReached => Ok(ReflexionOutcome::MaxRetriesReached),
            Outcome::ReflexionFailed => Ok(ReflexionOutcome::Failed),
            other => Err(ResearchError::routing(Step::Reflexion, other)),
        }
    }
}

/// A single web source returned by the search provider. Identity is `url`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub url: String,
    pub title: String,
    pub content: String,
    /// Provider relevance score
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_content: Option<String>,
}

impl SearchResult {
    pub fn new(
        url: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
        score: f64,
    ) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            content: content.into(),
            score,
            raw_content: None,
        }
    }
}

/// Verdict of one safety check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafetyCheck {
    pub is_safe: bool,
    pub reason: String,
    /// Confidence in the verdict, in [0, 1]
    pub confidence: f64,
    #[serde(default)]
    pub flagged_content: Vec<String>,
}

impl SafetyCheck {
    /// A passing check with nothing flagged
    pub fn safe(reason: impl Into<String>, confidence: f64) -> Self {
        Self {
            is_safe: true,
            reason: reason.into(),
            confidence: confidence.clamp(0.0, 1.0),
            flagged_content: Vec::new(),
        }
    }

    /// A failing check
    pub fn unsafe_with(
        reason: impl Into<String>,
        confidence: f64,
        flagged_content: Vec<String>,
    ) -> Self {
        Self {
            is_safe: false,
            reason: reason.into(),
            confidence: confidence.clamp(0.0, 1.0),
            flagged_content,
        }
    }
}

/// The complete research workflow state
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResearchState {
    /// Original research query, fixed for the run
    pub query: String,

    /// Planner output
    pub plan: String,
    pub search_queries: Vec<String>,

    /// Deduplicated by URL, sorted by descending score
    pub sources: Vec<SearchResult>,

    /// Synthesized Markdown answer
    pub draft: String,

    /// Accumulates across validation and final safety; never cleared
    pub safety_checks: Vec<SafetyCheck>,

    /// Final safety gate; true until disproven
    #[serde(default = "default_is_safe")]
    pub is_safe: bool,

    pub current_step: Outcome,

    pub retry_count: u32,
    pub max_retries: u32,

    /// Reflexion output
    pub critique: String,
    pub improvements: Vec<String>,

    /// Append-only
    pub errors: Vec<String>,
    pub warnings: Vec<String>,

    pub request_id: String,
    pub timestamp: String,
}

fn default_is_safe() -> bool {
    true
}

impl ResearchState {
    /// Create a fresh state for a query
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            is_safe: true,
            current_step: Outcome::Initialized,
            max_retries: 3,
            request_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now().to_rfc3339(),
            ..Default::default()
        }
    }

    /// Configure the retry budget
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = request_id.into();
        self
    }

    /// Whether a Reflexion pass may still schedule a retry
    pub fn retries_remaining(&self) -> bool {
        self.retry_count < self.max_retries
    }

    /// Write a step result into `current_step`
    pub fn set_outcome(&mut self, outcome: impl Into<Outcome>) {
        self.current_step = outcome.into();
    }

    /// Refresh the per-step metadata timestamp
    pub fn touch(&mut self) {
        self.timestamp = Utc::now().to_rfc3339();
    }

    /// The last `n` errors, oldest first
    pub fn recent_errors(&self, n: usize) -> &[String] {
        let start = self.errors.len().saturating_sub(n);
        &self.errors[start..]
    }

    /// Whether the run ended on the success path
    pub fn is_success(&self) -> bool {
        self.current_step == Outcome::Completed && self.is_safe
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_research_state_new() {
        let state = ResearchState::new("test query");

        assert_eq!(state.query, "test query");
        assert_eq!(state.current_step, Outcome::Initialized);
        assert!(state.is_safe);
        assert_eq!(state.retry_count, 0);
        assert_eq!(state.max_retries, 3);
        assert!(!state.request_id.is_empty());
        assert!(state.sources.is_empty());
        assert!(state.errors.is_empty());
    }

    #[test]
    fn test_retries_remaining() {
        let mut state = ResearchState::new("q").with_max_retries(2);
        assert!(state.retries_remaining());
        state.retry_count = 2;
        assert!(!state.retries_remaining());

        let zero = ResearchState::new("q").with_max_retries(0);
        assert!(!zero.retries_remaining());
    }

    #[test]
    fn test_outcome_serializes_snake_case() {
        let json = serde_json::to_string(&Outcome::SafetyValidationFailed).unwrap();
        assert_eq!(json, "\"safety_validation_failed\"");

        let parsed: Outcome = serde_json::from_str("\"retry_planning\"").unwrap();
        assert_eq!(parsed, Outcome::RetryPlanning);
        assert_eq!(parsed.to_string(), "retry_planning");
    }

    #[test]
    fn test_outcome_producer() {
        assert_eq!(Outcome::Initialized.producer(), None);
        assert_eq!(Outcome::PlanningFailed.producer(), Some(Step::Plan));
        assert_eq!(Outcome::SearchComplete.producer(), Some(Step::Search));
        assert_eq!(Outcome::Completed.producer(), Some(Step::SafetyCheck));
        assert_eq!(Outcome::SafetyValidationFailed.producer(), Some(Step::SafetyCheck));
        assert_eq!(Outcome::MaxRetriesReached.producer(), Some(Step::Reflexion));
        assert_eq!(Outcome::WorkflowFailed.producer(), None);
    }

    #[test]
    fn test_terminal_outcomes() {
        assert!(Outcome::Completed.is_terminal());
        assert!(Outcome::MaxRetriesReached.is_terminal());
        assert!(Outcome::ReflexionFailed.is_terminal());
        assert!(Outcome::WorkflowFailed.is_terminal());

        assert!(!Outcome::Initialized.is_terminal());
        assert!(!Outcome::SafetyFailed.is_terminal());
        assert!(!Outcome::RetryPlanning.is_terminal());
    }

    #[test]
    fn test_step_outcome_conversions() {
        assert_eq!(Outcome::from(SearchOutcome::Failed), Outcome::SearchFailed);
        assert_eq!(Outcome::from(SafetyOutcome::Flagged), Outcome::SafetyFailed);
        assert_eq!(
            SafetyOutcome::try_from(Outcome::SafetyValidationFailed).unwrap(),
            SafetyOutcome::ValidationFailed
        );

        let err = PlanOutcome::try_from(Outcome::SearchComplete).unwrap_err();
        assert!(matches!(
            err,
            ResearchError::Routing { step: Step::Plan, outcome: Outcome::SearchComplete }
        ));
    }

    #[test]
    fn test_recent_errors() {
        let mut state = ResearchState::new("q");
        assert!(state.recent_errors(3).is_empty());

        state.errors = vec!["a".into(), "b".into(), "c".into(), "d".into()];
        assert_eq!(state.recent_errors(3), &["b", "c", "d"]);
        assert_eq!(state.recent_errors(10).len(), 4);
    }

    #[test]
    fn test_safety_check_constructors() {
        let ok = SafetyCheck::safe("fine", 0.8);
        assert!(ok.is_safe);
        assert!(ok.flagged_content.is_empty());

        let bad = SafetyCheck::unsafe_with("flagged", 1.5, vec!["x".into()]);
        assert!(!bad.is_safe);
        assert_eq!(bad.confidence, 1.0);
        assert_eq!(bad.flagged_content, vec!["x".to_string()]);
    }

    #[test]
    fn test_state_roundtrip_keeps_outcome() {
        let mut state = ResearchState::new("q");
        state.set_outcome(ReflexionOutcome::RetryPlanning);
        state.sources.push(SearchResult::new("https://a.org", "A", "body", 0.7));

        let json = serde_json::to_string(&state).unwrap();
        let back: ResearchState = serde_json::from_str(&json).unwrap();
        assert_eq!(back.current_step, Outcome::RetryPlanning);
        assert_eq!(back.sources.len(), 1);
        assert_eq!(back.request_id, state.request_id);
    }
}
