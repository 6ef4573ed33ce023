use std::collections::HashSet;
use tracing::{debug, info, warn};

use super::ResearchSteps;
use crate::state::{ResearchState, SearchOutcome, SearchResult};
use crate::text::truncate_chars;

impl ResearchSteps {
    /// Run the planned queries and store deduplicated, score-ordered sources
    ///
    /// The result budget is split across every planned query, though at most
    /// `max_search_queries` are issued. The first provider error fails the
    /// step and leaves `sources` untouched.
    pub async fn search(&self, state: &mut ResearchState) {
        let planned: Vec<String> = if state.search_queries.is_empty() {
            vec![state.query.clone()]
        } else {
            state.search_queries.clone()
        };
        let per_query = (self.config.max_search_results / planned.len()).max(1);
        let queries = &planned[..planned.len().min(self.config.max_search_queries.max(1))];

        info!(
            request_id = %state.request_id,
            planned = planned.len(),
            queries = queries.len(),
            per_query,
            "Searching for information"
        );

        let mut collected = Vec::new();
        for query in queries {
            debug!(request_id = %state.request_id, query = %query, "Search query");
            match self.search.search(query, per_query).await {
                Ok(results) => collected.extend(results),
                Err(e) => {
                    warn!(request_id = %state.request_id, query = %query, error = %e, "Search failed");
                    state.errors.push(format!("Search failed: {e}"));
                    state.set_outcome(SearchOutcome::Failed);
                    state.touch();
                    return;
                }
            }
        }

        state.sources = rank_sources(collected, self.config.max_search_results, self.config.max_content_length);
        info!(request_id = %state.request_id, sources = state.sources.len(), "Search complete");
        state.set_outcome(SearchOutcome::Complete);
        state.touch();
    }
}

/// Deduplicate by URL (first occurrence wins), order by descending score,
/// keep `max_results`, and cap each result's content at `max_content_chars`.
pub(crate) fn rank_sources(results: Vec<SearchResult>, max_results: usize, max_content_chars: usize) -> Vec<SearchResult> {
    let mut seen = HashSet::new();
    let mut unique: Vec<SearchResult> = results
        .into_iter()
        .filter(|r| seen.insert(r.url.clone()))
        .collect();

    // Stable, so equal scores keep their arrival order
    unique.sort_by(|a, b| b.score.total_cmp(&a.score));
    unique.truncate(max_results);

    for result in &mut unique {
        let cut = truncate_chars(&result.content, max_content_chars).len();
        result.content.truncate(cut);
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::state::Outcome;
    use crate::steps::testing::{steps_with, test_config, trusted_source, ScriptedModel, StaticSearch};

    #[test]
    fn test_rank_sources_dedup_sort_truncate() {
        let mut dup = trusted_source(1, 0.99);
        dup.title = "duplicate".into();
        let results = vec![
            trusted_source(1, 0.2),
            trusted_source(2, 0.9),
            dup,
            trusted_source(3, 0.5),
            trusted_source(4, 0.7),
        ];

        let ranked = rank_sources(results, 3, 10_000);

        let urls: Vec<&str> = ranked.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(urls, vec!["https://example.com/2", "https://example.com/4", "https://example.com/3"]);
    }

    #[test]
    fn test_rank_sources_first_occurrence_wins() {
        let mut dup = trusted_source(1, 0.99);
        dup.title = "duplicate".into();
        let ranked = rank_sources(vec![trusted_source(1, 0.2), dup], 10, 10_000);

        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].title, "Article 1");
        assert_eq!(ranked[0].score, 0.2);
    }

    #[test]
    fn test_rank_sources_truncates_content() {
        let source = SearchResult::new("https://example.com/x", "X", "ééééé", 0.1);
        let ranked = rank_sources(vec![source], 10, 3);
        assert_eq!(ranked[0].content, "ééé");
    }

    #[tokio::test]
    async fn test_search_uses_planned_queries() {
        let search = Arc::new(
            StaticSearch::new()
                .with("a", vec![trusted_source(1, 0.4), trusted_source(2, 0.8)])
                .with("b", vec![trusted_source(2, 0.8), trusted_source(3, 0.6)]),
        );
        let steps = steps_with(Arc::new(ScriptedModel::default()), search.clone(), test_config());
        let mut state = ResearchState::new("q");
        state.search_queries = vec!["a".into(), "b".into()];

        steps.search(&mut state).await;

        assert_eq!(state.current_step, Outcome::SearchComplete);
        assert_eq!(state.sources.len(), 3);
        assert!(state.sources.windows(2).all(|w| w[0].score >= w[1].score));

        let calls = search.calls.lock().unwrap();
        assert_eq!(calls.as_slice(), &[("a".to_string(), 5), ("b".to_string(), 5)]);
    }

    #[tokio::test]
    async fn test_search_caps_query_count() {
        let search = Arc::new(StaticSearch::new());
        let steps = steps_with(Arc::new(ScriptedModel::default()), search.clone(), test_config());
        let mut state = ResearchState::new("q");
        state.search_queries = (0..5).map(|i| format!("q{i}")).collect();

        steps.search(&mut state).await;

        // 10 results over 5 planned queries, only 3 of which are issued
        let calls = search.calls.lock().unwrap();
        let issued: Vec<&str> = calls.iter().map(|(q, _)| q.as_str()).collect();
        assert_eq!(issued, vec!["q0", "q1", "q2"]);
        assert!(calls.iter().all(|(_, max)| *max == 2));
    }

    #[tokio::test]
    async fn test_search_falls_back_to_query() {
        let search = Arc::new(StaticSearch::new());
        let steps = steps_with(Arc::new(ScriptedModel::default()), search.clone(), test_config());
        let mut state = ResearchState::new("original question");

        steps.search(&mut state).await;

        assert_eq!(state.current_step, Outcome::SearchComplete);
        assert!(state.sources.is_empty());
        let calls = search.calls.lock().unwrap();
        assert_eq!(calls.as_slice(), &[("original question".to_string(), 10)]);
    }

    #[tokio::test]
    async fn test_search_fails_on_first_query_error() {
        let search = Arc::new(
            StaticSearch::new()
                .with("good", vec![trusted_source(1, 0.5)])
                .failing_on("bad")
                .with("later", vec![trusted_source(2, 0.5)]),
        );
        let steps = steps_with(Arc::new(ScriptedModel::default()), search.clone(), test_config());
        let mut state = ResearchState::new("q");
        state.sources = vec![trusted_source(9, 0.1)];
        state.search_queries = vec!["good".into(), "bad".into(), "later".into()];

        steps.search(&mut state).await;

        assert_eq!(state.current_step, Outcome::SearchFailed);
        assert_eq!(state.errors.len(), 1);
        assert!(state.errors[0].starts_with("Search failed:"));
        assert_eq!(state.sources, vec![trusted_source(9, 0.1)]);

        let calls = search.calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
    }

    #[tokio::test]
    async fn test_search_all_queries_failed() {
        let search = Arc::new(StaticSearch::new().failing_on("q"));
        let steps = steps_with(Arc::new(ScriptedModel::default()), search, test_config());
        let mut state = ResearchState::new("q");

        steps.search(&mut state).await;

        assert_eq!(state.current_step, Outcome::SearchFailed);
        assert!(state.errors[0].starts_with("Search failed:"));
    }
}
