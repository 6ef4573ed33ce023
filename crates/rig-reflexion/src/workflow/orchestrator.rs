//! Runs steps in routing order, checkpointing at every step boundary

use std::sync::Arc;
use tracing::{debug, error, info, info_span, warn, Instrument};

use super::router::{resume_point, route, Route};
use crate::checkpoint::{CheckpointStore, StateSnapshot};
use crate::error::ResearchError;
use crate::state::{Outcome, ResearchState, Step};
use crate::steps::ResearchSteps;

/// Thread id used when a run is checkpointed without an explicit one
pub const DEFAULT_THREAD_ID: &str = "default";

/// The research state machine
pub struct Orchestrator {
    steps: ResearchSteps,
    store: Option<Arc<dyn CheckpointStore>>,
}

impl Orchestrator {
    pub fn new(steps: ResearchSteps) -> Self {
        Self { steps, store: None }
    }

    pub fn with_checkpoint_store(mut self, store: Arc<dyn CheckpointStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// A store is attached and the config allows checkpointing
    pub fn checkpointing_enabled(&self) -> bool {
        self.store().is_some()
    }

    fn store(&self) -> Option<&Arc<dyn CheckpointStore>> {
        self.store
            .as_ref()
            .filter(|_| self.steps.config().checkpoint_enabled)
    }

    /// Research `query` from scratch. Always returns the final state; failures
    /// are reported through `current_step` and `errors`.
    pub async fn run(&self, query: &str, thread_id: Option<&str>) -> ResearchState {
        let state = ResearchState::new(query).with_max_retries(self.steps.config().max_retries);
        self.run_state(state, thread_id).await
    }

    /// Run a prepared state from the Plan step
    pub async fn run_state(&self, mut state: ResearchState, thread_id: Option<&str>) -> ResearchState {
        let thread_id = thread_id.unwrap_or(DEFAULT_THREAD_ID);
        self.checkpoint(thread_id, &mut state).await;
        self.execute(state, Ok(Some(Step::Plan)), thread_id).await
    }

    /// Continue a checkpointed thread from its last recorded outcome.
    ///
    /// Fails only when checkpointing is off or the thread has no usable
    /// checkpoint. A thread that already ended is returned unchanged.
    pub async fn resume(&self, thread_id: &str) -> Result<ResearchState, ResearchError> {
        let store = self
            .store()
            .ok_or_else(|| ResearchError::Resume("Checkpointing not enabled".to_string()))?;

        let state = store
            .get_state(thread_id)
            .await
            .map_err(|e| ResearchError::Resume(format!("Failed to load checkpoint for thread {thread_id}: {e}")))?
            .ok_or_else(|| ResearchError::Resume(format!("No checkpoint found for thread {thread_id}")))?;

        info!(thread_id, request_id = %state.request_id, step = %state.current_step, "Resuming from checkpoint");

        let start = resume_point(&state);
        Ok(self.execute(state, start, thread_id).await)
    }

    /// Snapshots of every checkpoint stored for the thread, oldest first.
    /// Empty when checkpointing is off.
    pub async fn history(&self, thread_id: &str) -> Result<Vec<StateSnapshot>, ResearchError> {
        match self.store() {
            Some(store) => Ok(store.get_state_history(thread_id).await?),
            None => Ok(Vec::new()),
        }
    }

    /// The run guard: anything that escapes the step loop (a routing error,
    /// the run timeout) ends the run as `workflow_failed`.
    async fn execute(
        &self,
        mut state: ResearchState,
        start: Result<Option<Step>, ResearchError>,
        thread_id: &str,
    ) -> ResearchState {
        let span = info_span!("research", request_id = %state.request_id, thread_id);

        async move {
            info!(query = %state.query, max_retries = state.max_retries, "Starting research workflow");

            let result = match start {
                Ok(first) => self.drive_with_timeout(&mut state, first, thread_id).await,
                Err(e) => Err(e),
            };

            if let Err(e) = result {
                error!(error = %e, "Workflow execution failed");
                state.errors.push(format!("Workflow execution failed: {e}"));
                state.set_outcome(Outcome::WorkflowFailed);
                state.touch();
            }

            info!(
                outcome = %state.current_step,
                retries = state.retry_count,
                sources = state.sources.len(),
                errors = state.errors.len(),
                "Research workflow finished"
            );
            state
        }
        .instrument(span)
        .await
    }

    async fn drive_with_timeout(
        &self,
        state: &mut ResearchState,
        first: Option<Step>,
        thread_id: &str,
    ) -> Result<(), ResearchError> {
        match self.steps.config().run_timeout {
            Some(limit) => match tokio::time::timeout(limit, self.drive(state, first, thread_id)).await {
                Ok(result) => result,
                Err(_) => Err(ResearchError::Timeout(limit)),
            },
            None => self.drive(state, first, thread_id).await,
        }
    }

    async fn drive(
        &self,
        state: &mut ResearchState,
        first: Option<Step>,
        thread_id: &str,
    ) -> Result<(), ResearchError> {
        let mut next = first;

        while let Some(step) = next {
            debug!(step = %step, retry = state.retry_count, "Running step");
            self.steps.run(step, state).await;
            info!(step = %step, outcome = %state.current_step, retry = state.retry_count, "Step finished");

            self.checkpoint(thread_id, state).await;

            next = match route(step, state)? {
                Route::Next(following) => Some(following),
                Route::End => None,
            };
        }

        // Routing ended on a failure outcome with the retry budget spent
        if !state.current_step.is_terminal() {
            info!(outcome = %state.current_step, retries = state.retry_count, "Retry budget exhausted");
            state.warnings.push(format!("Retries exhausted after {}", state.current_step));
            state.set_outcome(Outcome::MaxRetriesReached);
            state.touch();
            self.checkpoint(thread_id, state).await;
        }

        Ok(())
    }

    /// Write failures become warnings, the run carries on
    async fn checkpoint(&self, thread_id: &str, state: &mut ResearchState) {
        let Some(store) = self.store() else {
            return;
        };

        if let Err(e) = store.put_state(thread_id, state).await {
            warn!(thread_id, error = %e, "Checkpoint write failed");
            state.warnings.push(format!("Checkpoint failed: {e}"));
        }
    }
}
