//! Prompt templates for the language-model steps
//!
//! Each prompt asks for a fenced JSON block matching one of the schemas in
//! [`crate::structured`]; the parsers cope when the model ignores that.

use chrono::Utc;

use crate::state::SearchResult;
use crate::text::truncate_chars;

/// Sources shown to the synthesizer
pub const SYNTHESIS_SOURCE_LIMIT: usize = 5;

/// Characters of each source's content shown to the synthesizer
pub const SYNTHESIS_CONTENT_CHARS: usize = 500;

/// Prompt templates for the research steps
pub struct ResearchPrompts;

impl ResearchPrompts {
    fn current_date() -> String {
        Utc::now().format("%Y-%m-%d").to_string()
    }

    pub fn planning(query: &str) -> String {
        format!(
            r#"For context, today's date is {date}.

Create a comprehensive research plan for the following query: "{query}"

Provide your response in the following JSON format:
```json
{{
    "research_plan": "Detailed step-by-step research approach",
    "search_queries": ["query1", "query2", "query3"],
    "expected_sources": ["source_type1", "source_type2"],
    "success_criteria": "What constitutes successful research completion"
}}
```

Focus on:
1. Breaking down the query into searchable components
2. Identifying reliable source types
3. Creating specific search queries
4. Defining clear success metrics"#,
            date = Self::current_date(),
            query = query,
        )
    }

    /// Replanning after reflexion: the previous plan and critique are included
    pub fn replanning(query: &str, previous_plan: &str, critique: &str, improvements: &[String]) -> String {
        let improvements = if improvements.is_empty() {
            "- none".to_string()
        } else {
            improvements.iter().map(|i| format!("- {i}")).collect::<Vec<_>>().join("\n")
        };

        format!(
            r#"{base}

A previous attempt at this research did not succeed.

Previous plan: "{previous_plan}"
Critique: "{critique}"
Suggested improvements:
{improvements}

Address the critique. Prefer different, more specific search queries than before."#,
            base = Self::planning(query),
        )
    }

    pub fn synthesis(query: &str, sources: &[SearchResult]) -> String {
        let sources_text = sources
            .iter()
            .take(SYNTHESIS_SOURCE_LIMIT)
            .map(|s| {
                format!(
                    "Source: {}\nURL: {}\nContent: {}...",
                    s.title,
                    s.url,
                    truncate_chars(&s.content, SYNTHESIS_CONTENT_CHARS)
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n");

        format!(
            r#"Synthesize research findings for the query: "{query}"

Based on the following sources:
{sources_text}

Provide your response in JSON format:
```json
{{
    "research_summary": "Comprehensive summary of findings",
    "key_findings": ["finding1", "finding2", "finding3"],
    "sources_used": ["source1", "source2"],
    "confidence_level": 0.85,
    "recommendations": ["recommendation1", "recommendation2"]
}}
```

Requirements:
1. Synthesize information from multiple sources
2. Identify key findings and insights
3. Assess confidence level (0.0-1.0)
4. Provide actionable recommendations
5. Cite sources used"#
        )
    }

    pub fn reflexion(query: &str, previous_attempt: &str, error_context: &str) -> String {
        format!(
            r#"Analyze the failed research attempt and provide reflexion:

Original Query: "{query}"
Previous Attempt: "{previous_attempt}"
Error Context: "{error_context}"

Provide reflexion in JSON format:
```json
{{
    "critique": "Analysis of what went wrong",
    "identified_issues": ["issue1", "issue2"],
    "improvement_suggestions": ["suggestion1", "suggestion2"],
    "revised_plan": "Updated approach to address issues",
    "should_retry": true
}}
```

Set "should_retry" to false if another attempt is unlikely to help.

Focus on:
1. Identifying specific failure points
2. Understanding root causes
3. Proposing concrete improvements
4. Deciding if retry is worthwhile"#
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_planning_prompt_contains_query_and_schema() {
        let prompt = ResearchPrompts::planning("rust async");
        assert!(prompt.contains("\"rust async\""));
        assert!(prompt.contains("```json"));
        assert!(prompt.contains("\"search_queries\""));
        assert!(prompt.contains(&ResearchPrompts::current_date()));
    }

    #[test]
    fn test_replanning_prompt_includes_critique() {
        let prompt = ResearchPrompts::replanning(
            "q",
            "old plan",
            "too broad",
            &["narrow it".to_string()],
        );
        assert!(prompt.contains("old plan"));
        assert!(prompt.contains("too broad"));
        assert!(prompt.contains("- narrow it"));
    }

    #[test]
    fn test_synthesis_prompt_limits_sources() {
        let sources: Vec<SearchResult> = (0..7)
            .map(|i| SearchResult::new(format!("https://s{i}.org"), format!("T{i}"), "x".repeat(800), 0.5))
            .collect();
        let prompt = ResearchPrompts::synthesis("q", &sources);

        assert!(prompt.contains("https://s4.org"));
        assert!(!prompt.contains("https://s5.org"));
        assert!(!prompt.contains(&"x".repeat(501)));
    }

    #[test]
    fn test_reflexion_prompt() {
        let prompt = ResearchPrompts::reflexion("q", "No draft generated", "Search failed: timeout");
        assert!(prompt.contains("Error Context: \"Search failed: timeout\""));
        assert!(prompt.contains("\"should_retry\""));
    }
}
