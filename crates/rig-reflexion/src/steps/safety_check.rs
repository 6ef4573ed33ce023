use tracing::{info, warn};

use super::ResearchSteps;
use crate::state::{ResearchState, SafetyOutcome};

impl ResearchSteps {
    /// Final moderation gate over the draft
    pub fn safety_check(&self, state: &mut ResearchState) {
        info!(request_id = %state.request_id, "Final safety validation");

        // An empty draft means synthesis never produced anything to approve
        if state.draft.trim().is_empty() {
            state.errors.push("Safety validation failed: no draft to validate".to_string());
            state.is_safe = false;
            state.set_outcome(SafetyOutcome::ValidationFailed);
            state.touch();
            return;
        }

        let check = self.safety.validate_final_output(&state.draft);
        state.is_safe = check.is_safe;

        if check.is_safe {
            info!(request_id = %state.request_id, "Research completed safely");
            state.set_outcome(SafetyOutcome::Completed);
        } else {
            warn!(
                request_id = %state.request_id,
                reason = %check.reason,
                flagged = check.flagged_content.len(),
                "Draft failed safety validation"
            );
            state.warnings.extend(check.flagged_content.iter().cloned());
            state.set_outcome(SafetyOutcome::Flagged);
        }

        state.safety_checks.push(check);
        state.touch();
    }
}
