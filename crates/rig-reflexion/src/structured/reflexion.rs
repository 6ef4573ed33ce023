use serde::{Deserialize, Serialize};

use super::{clean_item, header_remainder, list_item, StructuredOutput};
use crate::text::ellipsize;

const CRITIQUE_CHARS: usize = 300;

/// Phrases that turn a mention of retrying into a recommendation against it
const RETRY_NEGATIONS: &[&str] = &[
    "do not retry",
    "don't retry",
    "not retry",
    "no retry",
    "should_retry: false",
    "\"should_retry\": false",
    "not worth retrying",
];

/// Reflexion response schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReflexionOutput {
    pub critique: String,
    #[serde(default)]
    pub identified_issues: Vec<String>,
    #[serde(default)]
    pub improvement_suggestions: Vec<String>,
    /// Replaces the current plan when present and non-empty
    #[serde(default)]
    pub revised_plan: Option<String>,
    #[serde(default)]
    pub should_retry: bool,
}

#[derive(Clone, Copy, PartialEq)]
enum Section {
    Critique,
    Issues,
    Suggestions,
    RevisedPlan,
}

fn section_for(lowered: &str) -> Option<Section> {
    if lowered.contains("revised plan") || lowered.contains("revised approach") {
        Some(Section::RevisedPlan)
    } else if lowered.contains("suggestion") || lowered.contains("improvement") {
        Some(Section::Suggestions)
    } else if lowered.contains("issue") {
        Some(Section::Issues)
    } else if lowered.contains("critique") {
        Some(Section::Critique)
    } else {
        None
    }
}

/// Whether free text recommends another attempt
fn recommends_retry(text: &str) -> bool {
    let lowered = text.to_lowercase();
    if RETRY_NEGATIONS.iter().any(|n| lowered.contains(n)) {
        return false;
    }
    lowered.contains("retry") || lowered.contains("try again")
}

impl StructuredOutput for ReflexionOutput {
    const NAME: &'static str = "reflexion";

    fn parse_heuristic(text: &str) -> Option<Self> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        let mut critique: Vec<&str> = Vec::new();
        let mut issues = Vec::new();
        let mut suggestions = Vec::new();
        let mut revised: Vec<&str> = Vec::new();
        let mut section = None;

        for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
            let item = list_item(line);

            if item.is_none() {
                if let Some(next) = section_for(&line.to_lowercase()) {
                    section = Some(next);
                    if let Some(rest) = header_remainder(line) {
                        match next {
                            Section::Critique => critique.push(rest),
                            Section::RevisedPlan => revised.push(rest),
                            Section::Issues => issues.push(clean_item(rest)),
                            Section::Suggestions => suggestions.push(clean_item(rest)),
                        }
                    }
                    continue;
                }
            }

            let body = item.unwrap_or(line);
            match section {
                Some(Section::Critique) => critique.push(body),
                Some(Section::RevisedPlan) => revised.push(body),
                Some(Section::Issues) => issues.push(clean_item(body)),
                Some(Section::Suggestions) => suggestions.push(clean_item(body)),
                None => {}
            }
        }

        let critique = if critique.is_empty() {
            ellipsize(text, CRITIQUE_CHARS)
        } else {
            ellipsize(&critique.join(" "), CRITIQUE_CHARS)
        };
        if issues.is_empty() {
            issues.push("Issues identified in previous attempt".to_string());
        }
        if suggestions.is_empty() {
            suggestions.push("Suggestions for improvement".to_string());
        }

        Some(Self {
            critique,
            identified_issues: issues,
            improvement_suggestions: suggestions,
            revised_plan: (!revised.is_empty()).then(|| revised.join(" ")),
            should_retry: recommends_retry(text),
        })
    }

    /// Nothing could be read: do not retry blindly
    fn fallback() -> Self {
        Self {
            critique: "Analysis of previous attempt".to_string(),
            identified_issues: vec!["General issues".to_string()],
            improvement_suggestions: vec!["General improvements".to_string()],
            revised_plan: None,
            should_retry: false,
        }
    }

    fn normalized(mut self) -> Self {
        self.revised_plan = self
            .revised_plan
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty());
        self.improvement_suggestions.retain(|s| !s.trim().is_empty());
        self
    }
}
