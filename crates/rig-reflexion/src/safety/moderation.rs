//! Keyword and pattern based content moderation

use regex::Regex;
use std::sync::OnceLock;

use crate::state::SafetyCheck;

const SAFE_CONFIDENCE: f64 = 0.8;
const FLAGGED_CONFIDENCE: f64 = 0.9;

/// Suspicious-pattern categories checked on every non-empty input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternCategory {
    IllegalActivity,
    Violence,
    Hate,
    Explicit,
}

impl PatternCategory {
    pub const ALL: [PatternCategory; 4] = [
        PatternCategory::IllegalActivity,
        PatternCategory::Violence,
        PatternCategory::Hate,
        PatternCategory::Explicit,
    ];

    fn pattern(&self) -> &'static str {
        match self {
            PatternCategory::IllegalActivity => r"(?i)\b(?:hack|crack|pirate|illegal)\b",
            PatternCategory::Violence => r"(?i)\b(?:violence|violent|kill|murder)\b",
            PatternCategory::Hate => r"(?i)\b(?:hate|racist|discrimination)\b",
            PatternCategory::Explicit => r"(?i)\b(?:explicit|adult|nsfw|porn)\b",
        }
    }
}

fn compiled_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        PatternCategory::ALL
            .iter()
            // Patterns are fixed literals above
            .filter_map(|category| Regex::new(category.pattern()).ok())
            .collect()
    })
}

/// Moderates free text against blocked keywords and the fixed pattern set
#[derive(Debug, Clone)]
pub struct ContentModerator {
    blocked_keywords: Vec<String>,
}

impl ContentModerator {
    pub fn new<I, S>(blocked_keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            blocked_keywords: blocked_keywords
                .into_iter()
                .map(|k| k.into().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
        }
    }

    /// Every keyword hit followed by every pattern match, in order, duplicates kept
    pub fn find_flagged(&self, content: &str) -> Vec<String> {
        let lowered = content.to_lowercase();

        let mut flagged: Vec<String> = self
            .blocked_keywords
            .iter()
            .filter(|keyword| lowered.contains(keyword.as_str()))
            .cloned()
            .collect();

        for pattern in compiled_patterns() {
            flagged.extend(pattern.find_iter(&lowered).map(|m| m.as_str().to_string()));
        }

        flagged
    }

    pub fn moderate(&self, content: &str) -> SafetyCheck {
        if content.is_empty() {
            return SafetyCheck::safe("Empty content", 1.0);
        }

        let flagged = self.find_flagged(content);
        if flagged.is_empty() {
            SafetyCheck::safe("Content passed moderation", SAFE_CONFIDENCE)
        } else {
            SafetyCheck::unsafe_with("Content flagged for review", FLAGGED_CONFIDENCE, flagged)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn moderator() -> ContentModerator {
        ContentModerator::new(["violence", "hate"])
    }

    #[test]
    fn test_patterns_compile() {
        assert_eq!(compiled_patterns().len(), PatternCategory::ALL.len());
    }

    #[test]
    fn test_safe_content() {
        let check = moderator().moderate("This is safe educational content.");
        assert!(check.is_safe);
        assert_eq!(check.confidence, 0.8);
        assert!(check.flagged_content.is_empty());
    }

    #[test]
    fn test_flagged_keywords() {
        let check = moderator().moderate("contains violence and hate");
        assert!(!check.is_safe);
        assert_eq!(check.confidence, 0.9);
        assert!(check.flagged_content.contains(&"violence".to_string()));
        assert!(check.flagged_content.contains(&"hate".to_string()));
    }

    #[test]
    fn test_flagged_is_not_deduplicated() {
        // keyword hit plus the violence pattern hit
        let check = moderator().moderate("Violence");
        assert_eq!(check.flagged_content, vec!["violence", "violence"]);
    }

    #[test]
    fn test_pattern_only_match() {
        let check = ContentModerator::new(Vec::<String>::new()).moderate("How to crack a password");
        assert!(!check.is_safe);
        assert_eq!(check.flagged_content, vec!["crack"]);
    }

    #[test]
    fn test_pattern_respects_word_boundaries() {
        let check = ContentModerator::new(Vec::<String>::new()).moderate("Skills for killing time");
        assert!(check.is_safe);
    }

    #[test]
    fn test_empty_content() {
        let check = moderator().moderate("");
        assert!(check.is_safe);
        assert_eq!(check.confidence, 1.0);
        assert_eq!(check.reason, "Empty content");
    }
}
