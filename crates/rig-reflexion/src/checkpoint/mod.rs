//! Checkpoint stores for resumable runs
//!
//! The orchestrator writes the full [`ResearchState`] after every step, keyed
//! by a caller-supplied thread id. Resuming reads back the latest state and
//! re-enters the workflow where it stopped.

mod file;

pub use file::FileCheckpointStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::error::CheckpointError;
use crate::state::{Outcome, ResearchState};

/// Summary of one stored checkpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub step: Outcome,
    pub timestamp: String,
    pub error_count: usize,
    pub source_count: usize,
}

impl From<&ResearchState> for StateSnapshot {
    fn from(state: &ResearchState) -> Self {
        Self {
            step: state.current_step,
            timestamp: state.timestamp.clone(),
            error_count: state.errors.len(),
            source_count: state.sources.len(),
        }
    }
}

/// Persistence for per-thread workflow state
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Latest state for the thread, if any
    async fn get_state(&self, thread_id: &str) -> Result<Option<ResearchState>, CheckpointError>;

    /// Append a new checkpoint for the thread
    async fn put_state(&self, thread_id: &str, state: &ResearchState) -> Result<(), CheckpointError>;

    /// One snapshot per stored checkpoint, oldest first
    async fn get_state_history(&self, thread_id: &str) -> Result<Vec<StateSnapshot>, CheckpointError>;
}

/// In-memory store, for tests and single-process use
#[derive(Debug, Default)]
pub struct MemoryCheckpointStore {
    threads: RwLock<HashMap<String, Vec<ResearchState>>>,
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of checkpoints stored for a thread
    pub async fn checkpoint_count(&self, thread_id: &str) -> usize {
        self.threads
            .read()
            .await
            .get(thread_id)
            .map_or(0, Vec::len)
    }
}

#[async_trait]
impl CheckpointStore for MemoryCheckpointStore {
    async fn get_state(&self, thread_id: &str) -> Result<Option<ResearchState>, CheckpointError> {
        Ok(self
            .threads
            .read()
            .await
            .get(thread_id)
            .and_then(|states| states.last().cloned()))
    }

    async fn put_state(&self, thread_id: &str, state: &ResearchState) -> Result<(), CheckpointError> {
        self.threads
            .write()
            .await
            .entry(thread_id.to_string())
            .or_default()
            .push(state.clone());
        Ok(())
    }

    async fn get_state_history(&self, thread_id: &str) -> Result<Vec<StateSnapshot>, CheckpointError> {
        Ok(self
            .threads
            .read()
            .await
            .get(thread_id)
            .map(|states| states.iter().map(StateSnapshot::from).collect())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    static_assertions::assert_impl_all!(super::MemoryCheckpointStore: Send, Sync);
    use super::*;
    use crate::state::SearchResult;

    #[tokio::test]
    async fn test_memory_store_latest_and_history() {
        let store = MemoryCheckpointStore::new();
        let mut state = ResearchState::new("q");

        state.current_step = Outcome::PlanningComplete;
        store.put_state("t1", &state).await.unwrap();

        state.current_step = Outcome::SearchComplete;
        state.sources.push(SearchResult::new("https://a.org", "A", "a", 0.5));
        state.errors.push("warning-ish".into());
        store.put_state("t1", &state).await.unwrap();

        let latest = store.get_state("t1").await.unwrap().unwrap();
        assert_eq!(latest.current_step, Outcome::SearchComplete);

        let history = store.get_state_history("t1").await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].step, Outcome::PlanningComplete);
        assert_eq!(history[1].source_count, 1);
        assert_eq!(history[1].error_count, 1);
        assert_eq!(store.checkpoint_count("t1").await, 2);
    }

    #[tokio::test]
    async fn test_memory_store_unknown_thread() {
        let store = MemoryCheckpointStore::new();
        assert!(store.get_state("missing").await.unwrap().is_none());
        assert!(store.get_state_history("missing").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_memory_store_threads_are_isolated() {
        let store = MemoryCheckpointStore::new();
        store.put_state("a", &ResearchState::new("qa")).await.unwrap();
        store.put_state("b", &ResearchState::new("qb")).await.unwrap();

        assert_eq!(store.get_state("a").await.unwrap().unwrap().query, "qa");
        assert_eq!(store.get_state("b").await.unwrap().unwrap().query, "qb");
    }
}
