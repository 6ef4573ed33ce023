use serde::{Deserialize, Serialize};

use super::{clean_item, header_remainder, list_item, StructuredOutput};

/// Planner response schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanningOutput {
    pub research_plan: String,
    #[serde(default)]
    pub search_queries: Vec<String>,
    #[serde(default)]
    pub expected_sources: Vec<String>,
    #[serde(default)]
    pub success_criteria: String,
}

#[derive(Clone, Copy, PartialEq)]
enum Section {
    Plan,
    Queries,
    Sources,
    Criteria,
}

fn section_for(lowered: &str) -> Option<Section> {
    if lowered.contains("research plan") {
        Some(Section::Plan)
    } else if lowered.contains("queries") {
        Some(Section::Queries)
    } else if lowered.contains("sources") {
        Some(Section::Sources)
    } else if lowered.contains("criteria") {
        Some(Section::Criteria)
    } else {
        None
    }
}

impl StructuredOutput for PlanningOutput {
    const NAME: &'static str = "planning";

    fn parse_heuristic(text: &str) -> Option<Self> {
        let mut plan: Vec<&str> = Vec::new();
        let mut criteria: Vec<&str> = Vec::new();
        let mut queries = Vec::new();
        let mut sources = Vec::new();
        let mut section = None;

        for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
            if let Some(item) = list_item(line) {
                match section {
                    Some(Section::Queries) => queries.push(clean_item(item)),
                    Some(Section::Sources) => sources.push(clean_item(item)),
                    Some(Section::Plan) => plan.push(item),
                    Some(Section::Criteria) => criteria.push(item),
                    None => {}
                }
                continue;
            }

            if let Some(next) = section_for(&line.to_lowercase()) {
                section = Some(next);
                if let Some(rest) = header_remainder(line) {
                    match next {
                        Section::Plan => plan.push(rest),
                        Section::Criteria => criteria.push(rest),
                        Section::Queries => queries.push(clean_item(rest)),
                        Section::Sources => sources.push(clean_item(rest)),
                    }
                }
                continue;
            }

            match section {
                Some(Section::Plan) => plan.push(line),
                Some(Section::Criteria) => criteria.push(line),
                _ => {}
            }
        }

        queries.retain(|q| !q.is_empty());
        sources.retain(|s| !s.is_empty());

        if plan.is_empty() && queries.is_empty() {
            return None;
        }

        let fallback = Self::fallback();
        Some(Self {
            research_plan: if plan.is_empty() { fallback.research_plan } else { plan.join(" ") },
            search_queries: queries,
            expected_sources: if sources.is_empty() { fallback.expected_sources } else { sources },
            success_criteria: if criteria.is_empty() {
                fallback.success_criteria
            } else {
                criteria.join(" ")
            },
        })
    }

    /// No queries: the Search step falls back to the research query itself
    fn fallback() -> Self {
        Self {
            research_plan: "Comprehensive research plan".to_string(),
            search_queries: Vec::new(),
            expected_sources: vec!["academic sources".to_string(), "news articles".to_string()],
            success_criteria: "Accurate and comprehensive information".to_string(),
        }
    }

    fn normalized(mut self) -> Self {
        self.search_queries = self
            .search_queries
            .iter()
            .map(|q| q.trim().to_string())
            .filter(|q| !q.is_empty())
            .collect();
        self
    }
}
