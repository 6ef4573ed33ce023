use tracing::{info, warn};

use super::ResearchSteps;
use crate::safety::SafetyValidator;
use crate::state::{ResearchState, ValidateOutcome};

impl ResearchSteps {
    /// Drop sources whose URL, content and title checks aggregate to unsafe
    pub fn validate(&self, state: &mut ResearchState) {
        info!(request_id = %state.request_id, sources = state.sources.len(), "Validating sources");

        let checks = self.safety.validate_sources(&state.sources);
        let sources = std::mem::take(&mut state.sources);

        let mut kept = Vec::with_capacity(sources.len());
        for (source, source_checks) in sources.into_iter().zip(checks.chunks(3)) {
            let verdict = SafetyValidator::aggregate(source_checks);
            if verdict.is_safe {
                kept.push(source);
            } else {
                warn!(
                    request_id = %state.request_id,
                    url = %source.url,
                    reason = %verdict.reason,
                    "Filtered unsafe source"
                );
            }
        }

        info!(request_id = %state.request_id, safe = kept.len(), checks = checks.len(), "Sources validated");

        state.sources = kept;
        state.safety_checks.extend(checks);
        state.set_outcome(ValidateOutcome::Complete);
        state.touch();
    }
}
