//! Safety validation for sources and drafts
//!
//! [`SafetyValidator`] composes the three primitives:
//!
//! - [`UrlValidator`]: domain and protocol trust
//! - [`ContentModerator`]: keyword and pattern moderation
//! - [`TokenBucketLimiter`]: request budget shared with the search provider
//!
//! and owns the aggregation rule used to combine several checks into one
//! verdict.

mod moderation;
mod rate_limit;
mod url;

pub use moderation::{ContentModerator, PatternCategory};
pub use rate_limit::TokenBucketLimiter;
pub use url::UrlValidator;

use std::sync::Arc;

use crate::config::ResearchConfig;
use crate::state::{SafetyCheck, SearchResult};

/// Confidence reported when there is nothing to aggregate
const NO_EVIDENCE_CONFIDENCE: f64 = 0.5;

/// Per-source and per-document safety validation
#[derive(Debug, Clone)]
pub struct SafetyValidator {
    urls: UrlValidator,
    moderator: ContentModerator,
    limiter: Arc<TokenBucketLimiter>,
}

impl SafetyValidator {
    pub fn new(urls: UrlValidator, moderator: ContentModerator, limiter: Arc<TokenBucketLimiter>) -> Self {
        Self { urls, moderator, limiter }
    }

    /// Build all primitives from config. The limiter gets capacity `rpm` and
    /// refills at `rpm / 60` tokens per second.
    pub fn from_config(config: &ResearchConfig) -> Self {
        Self::new(
            UrlValidator::new(config.trusted_domains.iter().cloned()),
            ContentModerator::new(config.blocked_keywords.iter().cloned()),
            Arc::new(TokenBucketLimiter::per_minute(config.rate_limit_requests_per_minute)),
        )
    }

    /// The shared limiter, for handing to a search provider
    pub fn limiter(&self) -> Arc<TokenBucketLimiter> {
        Arc::clone(&self.limiter)
    }

    /// URL, content and title checks for one source, in that order
    pub fn validate_source(&self, source: &SearchResult) -> [SafetyCheck; 3] {
        [
            self.urls.validate(&source.url),
            self.moderator.moderate(&source.content),
            self.moderator.moderate(&source.title),
        ]
    }

    /// Three checks per source, flattened in source order
    pub fn validate_sources(&self, sources: &[SearchResult]) -> Vec<SafetyCheck> {
        sources.iter().flat_map(|s| self.validate_source(s)).collect()
    }

    /// Moderation of a finished draft
    pub fn validate_final_output(&self, content: &str) -> SafetyCheck {
        self.moderator.moderate(content)
    }

    /// Combine checks into a single verdict.
    ///
    /// All safe: safe with the lowest confidence. Any unsafe: unsafe with the
    /// highest confidence among the unsafe checks and the deduplicated union
    /// of their flagged content (first occurrence order). No checks: safe at
    /// 0.5.
    pub fn aggregate(checks: &[SafetyCheck]) -> SafetyCheck {
        if checks.is_empty() {
            return SafetyCheck::safe("No checks performed", NO_EVIDENCE_CONFIDENCE);
        }

        let failed: Vec<&SafetyCheck> = checks.iter().filter(|c| !c.is_safe).collect();
        if failed.is_empty() {
            let confidence = checks.iter().map(|c| c.confidence).fold(f64::INFINITY, f64::min);
            return SafetyCheck::safe("All safety checks passed", confidence);
        }

        let confidence = failed.iter().map(|c| c.confidence).fold(f64::NEG_INFINITY, f64::max);
        let mut flagged: Vec<String> = Vec::new();
        for item in failed.iter().flat_map(|c| c.flagged_content.iter()) {
            if !flagged.contains(item) {
                flagged.push(item.clone());
            }
        }

        SafetyCheck::unsafe_with(format!("Failed {} safety checks", failed.len()), confidence, flagged)
    }
}
