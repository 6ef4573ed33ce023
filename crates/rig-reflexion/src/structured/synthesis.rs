use serde::{Deserialize, Serialize};

use super::{clean_item, header_remainder, list_item, StructuredOutput};
use crate::text::ellipsize;

const SUMMARY_CHARS: usize = 500;
const UNSTRUCTURED_CONFIDENCE: f64 = 0.8;

/// Synthesizer response schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesisOutput {
    pub research_summary: String,
    #[serde(default)]
    pub key_findings: Vec<String>,
    #[serde(default)]
    pub sources_used: Vec<String>,
    pub confidence_level: f64,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

#[derive(Clone, Copy, PartialEq)]
enum Section {
    Summary,
    Findings,
    Sources,
    Confidence,
    Recommendations,
}

fn section_for(lowered: &str) -> Option<Section> {
    if lowered.contains("summary") || lowered.contains("overview") {
        Some(Section::Summary)
    } else if lowered.contains("finding") {
        Some(Section::Findings)
    } else if lowered.contains("sources") {
        Some(Section::Sources)
    } else if lowered.contains("confidence") {
        Some(Section::Confidence)
    } else if lowered.contains("recommendation") {
        Some(Section::Recommendations)
    } else {
        None
    }
}

/// First number in `line`, read as a fraction (values above 1 are percentages)
fn first_number(line: &str) -> Option<f64> {
    let start = line.find(|c: char| c.is_ascii_digit())?;
    let tail = &line[start..];
    let end = tail
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(tail.len());
    let value: f64 = tail[..end].trim_end_matches('.').parse().ok()?;
    Some(if value > 1.0 { value / 100.0 } else { value })
}

impl StructuredOutput for SynthesisOutput {
    const NAME: &'static str = "synthesis";

    fn parse_heuristic(text: &str) -> Option<Self> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        let mut summary: Vec<&str> = Vec::new();
        let mut findings = Vec::new();
        let mut sources = Vec::new();
        let mut recommendations = Vec::new();
        let mut confidence = None;
        let mut section = None;
        let mut saw_header = false;

        for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
            let item = list_item(line);

            if item.is_none() {
                if let Some(next) = section_for(&line.to_lowercase()) {
                    saw_header = true;
                    section = Some(next);
                    match (next, header_remainder(line)) {
                        (Section::Summary, Some(rest)) => summary.push(rest),
                        (Section::Confidence, _) => confidence = confidence.or(first_number(line)),
                        _ => {}
                    }
                    continue;
                }
            }

            let body = item.unwrap_or(line);
            match section {
                Some(Section::Summary) => summary.push(body),
                Some(Section::Findings) => findings.push(clean_item(body)),
                Some(Section::Sources) => sources.push(clean_item(body)),
                Some(Section::Recommendations) => recommendations.push(clean_item(body)),
                Some(Section::Confidence) => confidence = confidence.or(first_number(body)),
                None => {}
            }
        }

        if !saw_header || (summary.is_empty() && findings.is_empty()) {
            // Unstructured prose: keep it as the summary
            return Some(Self {
                research_summary: ellipsize(text, SUMMARY_CHARS),
                key_findings: vec!["Key finding extracted from research".to_string()],
                sources_used: vec!["research sources".to_string()],
                confidence_level: UNSTRUCTURED_CONFIDENCE,
                recommendations: vec!["Further research recommended".to_string()],
            });
        }

        Some(Self {
            research_summary: ellipsize(&summary.join(" "), SUMMARY_CHARS),
            key_findings: findings,
            sources_used: sources,
            confidence_level: confidence.unwrap_or(UNSTRUCTURED_CONFIDENCE),
            recommendations,
        })
    }

    fn fallback() -> Self {
        Self {
            research_summary: "Research synthesis completed".to_string(),
            key_findings: vec!["Key insights gathered".to_string()],
            sources_used: Vec::new(),
            confidence_level: 0.7,
            recommendations: vec!["Further analysis recommended".to_string()],
        }
    }

    fn normalized(mut self) -> Self {
        self.confidence_level = if self.confidence_level.is_finite() {
            self.confidence_level.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self.key_findings.retain(|f| !f.trim().is_empty());
        self.sources_used.retain(|s| !s.trim().is_empty());
        self.recommendations.retain(|r| !r.trim().is_empty());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_json_block_clamps_confidence() {
        let text = r#"```json
{
  "research_summary": "Rust is fast",
  "key_findings": ["zero-cost abstractions"],
  "sources_used": ["https://rust-lang.org"],
  "confidence_level": 1.7,
  "recommendations": ["learn it"]
}
```"#;
        let output = SynthesisOutput::parse(text);
        assert_eq!(output.research_summary, "Rust is fast");
        assert_eq!(output.key_findings, vec!["zero-cost abstractions"]);
        assert_eq!(output.confidence_level, 1.0);
    }

    #[test]
    fn test_parse_heuristic_sections() {
        let text = "\
Summary: Solar capacity grew quickly.
Key Findings:
- Costs fell
- Storage improved
Sources:
- https://iea.org/report
Confidence: 85%
Recommendations:
- Track storage prices
";
        let output = SynthesisOutput::parse(text);
        assert_eq!(output.research_summary, "Solar capacity grew quickly.");
        assert_eq!(output.key_findings, vec!["Costs fell", "Storage improved"]);
        assert_eq!(output.sources_used, vec!["https://iea.org/report"]);
        assert!((output.confidence_level - 0.85).abs() < 1e-9);
        assert_eq!(output.recommendations, vec!["Track storage prices"]);
    }

    #[test]
    fn test_unstructured_prose_becomes_summary() {
        let prose = "a".repeat(600);
        let output = SynthesisOutput::parse(&prose);
        assert_eq!(output.research_summary.chars().count(), 503);
        assert!(output.research_summary.ends_with("..."));
        assert_eq!(output.confidence_level, 0.8);
    }

    #[test]
    fn test_empty_response_falls_back() {
        let output = SynthesisOutput::parse("   ");
        assert_eq!(output, SynthesisOutput::fallback());
    }

    #[test]
    fn test_first_number() {
        assert_eq!(first_number("Confidence: 0.75 (out of 1.0)"), Some(0.75));
        assert_eq!(first_number("90%"), Some(0.9));
        assert_eq!(first_number("none"), None);
    }
}
