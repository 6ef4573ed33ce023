//! Outcome-keyed routing table
//!
//! After each step the router reads the step's outcome back out of the state
//! and picks the next step. The only back-edge is Reflexion -> Plan, and
//! Reflexion either spends a retry or ends the run, so every run halts.

use crate::error::ResearchError;
use crate::state::{
    Outcome, PlanOutcome, ReflexionOutcome, ResearchState, SafetyOutcome, SearchOutcome, Step,
    SynthesizeOutcome, ValidateOutcome,
};

/// Where the machine goes after a step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Next(Step),
    End,
}

/// Reflexion while retries remain, otherwise stop
fn reflect_or_end(state: &ResearchState) -> Route {
    if state.retries_remaining() {
        Route::Next(Step::Reflexion)
    } else {
        Route::End
    }
}

/// Route after `step` finished. Errors when the outcome in the state was not
/// produced by `step`.
pub fn route(step: Step, state: &ResearchState) -> Result<Route, ResearchError> {
    let outcome = state.current_step;

    let next = match step {
        Step::Plan => match PlanOutcome::try_from(outcome)? {
            PlanOutcome::Complete => Route::Next(Step::Search),
            PlanOutcome::Failed => reflect_or_end(state),
        },
        Step::Search => match SearchOutcome::try_from(outcome)? {
            SearchOutcome::Complete if !state.sources.is_empty() => Route::Next(Step::Validate),
            SearchOutcome::Complete | SearchOutcome::Failed => reflect_or_end(state),
        },
        Step::Validate => match ValidateOutcome::try_from(outcome)? {
            ValidateOutcome::Complete if !state.sources.is_empty() => Route::Next(Step::Synthesize),
            ValidateOutcome::Complete | ValidateOutcome::Failed => reflect_or_end(state),
        },
        Step::Synthesize => match SynthesizeOutcome::try_from(outcome)? {
            SynthesizeOutcome::Complete => Route::Next(Step::SafetyCheck),
            SynthesizeOutcome::Failed => reflect_or_end(state),
        },
        Step::SafetyCheck => match SafetyOutcome::try_from(outcome)? {
            SafetyOutcome::Completed if state.is_safe => Route::End,
            SafetyOutcome::Completed | SafetyOutcome::Flagged | SafetyOutcome::ValidationFailed => {
                reflect_or_end(state)
            }
        },
        Step::Reflexion => match ReflexionOutcome::try_from(outcome)? {
            ReflexionOutcome::RetryPlanning => Route::Next(Step::Plan),
            ReflexionOutcome::MaxRetriesReached | ReflexionOutcome::Failed => Route::End,
        },
    };

    Ok(next)
}

/// The step a stored state resumes at, `None` when the run already ended
pub fn resume_point(state: &ResearchState) -> Result<Option<Step>, ResearchError> {
    match state.current_step {
        Outcome::Initialized => Ok(Some(Step::Plan)),
        outcome if outcome.is_terminal() => Ok(None),
        outcome => match outcome.producer() {
            Some(step) => match route(step, state)? {
                Route::Next(next) => Ok(Some(next)),
                Route::End => Ok(None),
            },
            None => Ok(None),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::SearchResult;

    fn state(outcome: Outcome, retry_count: u32, max_retries: u32) -> ResearchState {
        let mut state = ResearchState::new("q").with_max_retries(max_retries);
        state.current_step = outcome;
        state.retry_count = retry_count;
        state
    }

    fn with_source(mut state: ResearchState) -> ResearchState {
        state.sources.push(SearchResult::new("https://example.com", "t", "c", 0.5));
        state
    }

    #[test]
    fn test_search_complete_without_sources_reflects_while_retries_remain() {
        let s = state(Outcome::SearchComplete, 0, 3);
        assert_eq!(route(Step::Search, &s).unwrap(), Route::Next(Step::Reflexion));

        let s = state(Outcome::SearchComplete, 3, 3);
        assert_eq!(route(Step::Search, &s).unwrap(), Route::End);
    }

    #[test]
    fn test_plan_routes() {
        assert_eq!(
            route(Step::Plan, &state(Outcome::PlanningComplete, 0, 3)).unwrap(),
            Route::Next(Step::Search)
        );
        assert_eq!(
            route(Step::Plan, &state(Outcome::PlanningFailed, 1, 3)).unwrap(),
            Route::Next(Step::Reflexion)
        );
        assert_eq!(route(Step::Plan, &state(Outcome::PlanningFailed, 3, 3)).unwrap(), Route::End);
    }

    #[test]
    fn test_search_and_validate_with_sources() {
        let s = with_source(state(Outcome::SearchComplete, 3, 3));
        assert_eq!(route(Step::Search, &s).unwrap(), Route::Next(Step::Validate));

        let s = with_source(state(Outcome::ValidationComplete, 3, 3));
        assert_eq!(route(Step::Validate, &s).unwrap(), Route::Next(Step::Synthesize));

        let s = state(Outcome::ValidationComplete, 0, 3);
        assert_eq!(route(Step::Validate, &s).unwrap(), Route::Next(Step::Reflexion));

        let s = state(Outcome::ValidationFailed, 3, 3);
        assert_eq!(route(Step::Validate, &s).unwrap(), Route::End);
    }

    #[test]
    fn test_synthesize_routes() {
        assert_eq!(
            route(Step::Synthesize, &state(Outcome::SynthesisComplete, 3, 3)).unwrap(),
            Route::Next(Step::SafetyCheck)
        );
        assert_eq!(
            route(Step::Synthesize, &state(Outcome::SynthesisFailed, 0, 1)).unwrap(),
            Route::Next(Step::Reflexion)
        );
        assert_eq!(route(Step::Synthesize, &state(Outcome::SynthesisFailed, 1, 1)).unwrap(), Route::End);
    }

    #[test]
    fn test_safety_routes() {
        assert_eq!(route(Step::SafetyCheck, &state(Outcome::Completed, 0, 3)).unwrap(), Route::End);

        let mut unsafe_completed = state(Outcome::Completed, 0, 3);
        unsafe_completed.is_safe = false;
        assert_eq!(
            route(Step::SafetyCheck, &unsafe_completed).unwrap(),
            Route::Next(Step::Reflexion)
        );

        assert_eq!(
            route(Step::SafetyCheck, &state(Outcome::SafetyFailed, 0, 3)).unwrap(),
            Route::Next(Step::Reflexion)
        );
        assert_eq!(
            route(Step::SafetyCheck, &state(Outcome::SafetyValidationFailed, 3, 3)).unwrap(),
            Route::End
        );
    }

    #[test]
    fn test_reflexion_routes() {
        assert_eq!(
            route(Step::Reflexion, &state(Outcome::RetryPlanning, 1, 3)).unwrap(),
            Route::Next(Step::Plan)
        );
        assert_eq!(route(Step::Reflexion, &state(Outcome::MaxRetriesReached, 0, 3)).unwrap(), Route::End);
        assert_eq!(route(Step::Reflexion, &state(Outcome::ReflexionFailed, 0, 3)).unwrap(), Route::End);
    }

    #[test]
    fn test_mismatched_outcome_is_a_routing_error() {
        let err = route(Step::Synthesize, &state(Outcome::PlanningComplete, 0, 3)).unwrap_err();
        assert!(matches!(
            err,
            ResearchError::Routing { step: Step::Synthesize, outcome: Outcome::PlanningComplete }
        ));
    }

    #[test]
    fn test_resume_point() {
        assert_eq!(resume_point(&state(Outcome::Initialized, 0, 3)).unwrap(), Some(Step::Plan));
        assert_eq!(resume_point(&state(Outcome::PlanningComplete, 0, 3)).unwrap(), Some(Step::Search));
        assert_eq!(resume_point(&state(Outcome::RetryPlanning, 1, 3)).unwrap(), Some(Step::Plan));
        assert_eq!(resume_point(&state(Outcome::SearchFailed, 0, 3)).unwrap(), Some(Step::Reflexion));
        assert_eq!(resume_point(&state(Outcome::SearchFailed, 3, 3)).unwrap(), None);
        assert_eq!(resume_point(&state(Outcome::Completed, 0, 3)).unwrap(), None);
        assert_eq!(resume_point(&state(Outcome::WorkflowFailed, 0, 3)).unwrap(), None);
    }
}
