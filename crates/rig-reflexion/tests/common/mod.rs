//! Shared scripted collaborators for the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use rig_reflexion::{
    GenerationOptions, LanguageModel, ResearchConfig, ResearchError, ResearchSteps, SafetyValidator,
    SearchError, SearchProvider, SearchResult,
};

pub const PLAN: &str = r#"```json
{
  "research_plan": "Look for recent overviews",
  "search_queries": ["rust ownership"],
  "expected_sources": ["documentation"],
  "success_criteria": "A clear explanation"
}
```"#;

pub const SYNTHESIS: &str = r#"```json
{
  "research_summary": "Ownership gives memory safety without a garbage collector.",
  "key_findings": ["Each value has one owner", "Borrows are checked at compile time"],
  "sources_used": ["https://example.com/1"],
  "confidence_level": 0.9,
  "recommendations": ["Read the ownership chapter"]
}
```"#;

pub const VIOLENT_SYNTHESIS: &str = r#"```json
{
  "research_summary": "The report describes violence in detail.",
  "key_findings": ["violence"],
  "sources_used": [],
  "confidence_level": 0.5,
  "recommendations": []
}
```"#;

pub const RETRY: &str = r#"```json
{
  "critique": "The queries were too narrow",
  "identified_issues": ["narrow queries"],
  "improvement_suggestions": ["broaden the terms"],
  "should_retry": true
}
```"#;

pub const GIVE_UP: &str = r#"```json
{
  "critique": "Nothing more can be found",
  "should_retry": false
}
```"#;

/// Replies in order; errors once the script runs out
#[derive(Default)]
pub struct ScriptedModel {
    replies: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Reflexion always asks for another attempt
    pub fn always_retry() -> Self {
        let mut script = vec![PLAN.to_string()];
        for _ in 0..10 {
            script.push(RETRY.to_string());
            script.push(PLAN.to_string());
        }
        Self::new(script)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn generate(&self, prompt: &str, _options: &GenerationOptions) -> Result<String, ResearchError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| ResearchError::llm("script exhausted"))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Fixed results per query
#[derive(Default)]
pub struct StaticSearch {
    results: HashMap<String, Vec<SearchResult>>,
    calls: Mutex<usize>,
}

impl StaticSearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, query: &str, results: Vec<SearchResult>) -> Self {
        self.results.insert(query.to_string(), results);
        self
    }

    pub fn call_count(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl SearchProvider for StaticSearch {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchResult>, SearchError> {
        *self.calls.lock().unwrap() += 1;
        let mut results = self.results.get(query).cloned().unwrap_or_default();
        results.truncate(max_results);
        Ok(results)
    }

    fn name(&self) -> &str {
        "static"
    }
}

pub fn config() -> ResearchConfig {
    ResearchConfig::default()
        .with_trusted_domains(["example.com"])
        .with_blocked_keywords(["violence", "hate"])
}

pub fn source(n: usize, score: f64) -> SearchResult {
    SearchResult::new(
        format!("https://example.com/{n}"),
        format!("Ownership article {n}"),
        format!("Ownership rules explained, part {n}"),
        score,
    )
}

pub fn steps(model: Arc<ScriptedModel>, search: Arc<StaticSearch>, config: ResearchConfig) -> ResearchSteps {
    let safety = SafetyValidator::from_config(&config);
    ResearchSteps::new(model, search, safety, config)
}
