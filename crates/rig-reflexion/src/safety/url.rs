//! Source URL trust checks

use std::collections::BTreeSet;
use url::Url;

use crate::state::SafetyCheck;

const TRUSTED_CONFIDENCE: f64 = 0.9;
const UNTRUSTED_CONFIDENCE: f64 = 0.3;

/// Validates source URLs against a trusted-domain allow-list
#[derive(Debug, Clone)]
pub struct UrlValidator {
    trusted_domains: BTreeSet<String>,
}

impl UrlValidator {
    pub fn new<I, S>(trusted_domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            trusted_domains: trusted_domains
                .into_iter()
                .map(|d| d.into().to_lowercase())
                .collect(),
        }
    }

    /// True when the host (minus a leading `www.`) is a trusted domain or one of
    /// its subdomains. Unparseable URLs are never trusted.
    pub fn is_trusted_domain(&self, url: &str) -> bool {
        match Url::parse(url).ok().as_ref().and_then(Url::host_str) {
            Some(host) => self.is_trusted_host(host),
            None => false,
        }
    }

    fn is_trusted_host(&self, host: &str) -> bool {
        let host = host.to_lowercase();
        let host = host.strip_prefix("www.").unwrap_or(&host);

        self.trusted_domains.iter().any(|trusted| {
            host == trusted
                || host
                    .strip_suffix(trusted.as_str())
                    .is_some_and(|prefix| prefix.ends_with('.'))
        })
    }

    /// Structure, protocol and trust validation for one URL
    pub fn validate(&self, url: &str) -> SafetyCheck {
        let parsed = match Url::parse(url) {
            Ok(parsed) => parsed,
            Err(_) => return invalid_structure(url),
        };

        let host = match parsed.host_str() {
            Some(host) if !host.is_empty() => host,
            _ => return invalid_structure(url),
        };

        if !matches!(parsed.scheme(), "http" | "https") {
            return SafetyCheck::unsafe_with(
                "Unsupported protocol",
                1.0,
                vec![parsed.scheme().to_string()],
            );
        }

        if self.is_trusted_host(host) {
            SafetyCheck::safe("Trusted domain", TRUSTED_CONFIDENCE)
        } else {
            SafetyCheck::unsafe_with("Untrusted domain", UNTRUSTED_CONFIDENCE, vec![host.to_string()])
        }
    }
}

fn invalid_structure(url: &str) -> SafetyCheck {
    SafetyCheck::unsafe_with("Invalid URL structure", 1.0, vec![url.to_string()])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator() -> UrlValidator {
        UrlValidator::new(["example.com"])
    }

    #[test]
    fn test_trusted_exact_www_and_subdomain() {
        let v = validator();
        assert!(v.is_trusted_domain("https://example.com/p"));
        assert!(v.is_trusted_domain("https://www.example.com/p"));
        assert!(v.is_trusted_domain("https://sub.example.com/p"));
        assert!(v.is_trusted_domain("https://EXAMPLE.com/p"));
    }

    #[test]
    fn test_untrusted_lookalikes() {
        let v = validator();
        assert!(!v.is_trusted_domain("https://example.net/p"));
        assert!(!v.is_trusted_domain("https://badexample.com/p"));
        assert!(!v.is_trusted_domain("https://example.com.evil.org/p"));
        assert!(!v.is_trusted_domain("not-a-url"));
    }

    #[test]
    fn test_validate_trusted() {
        let check = validator().validate("https://sub.example.com/p");
        assert!(check.is_safe);
        assert_eq!(check.confidence, 0.9);
        assert!(check.flagged_content.is_empty());
    }

    #[test]
    fn test_validate_untrusted() {
        let check = validator().validate("https://example.net/p");
        assert!(!check.is_safe);
        assert_eq!(check.confidence, 0.3);
        assert_eq!(check.flagged_content, vec!["example.net".to_string()]);
    }

    #[test]
    fn test_validate_malformed() {
        let check = validator().validate("not-a-url");
        assert!(!check.is_safe);
        assert_eq!(check.confidence, 1.0);
        assert_eq!(check.reason, "Invalid URL structure");
        assert_eq!(check.flagged_content, vec!["not-a-url".to_string()]);
    }

    #[test]
    fn test_validate_missing_host() {
        let check = validator().validate("mailto:someone@example.com");
        assert!(!check.is_safe);
        assert_eq!(check.confidence, 1.0);
        assert_eq!(check.reason, "Invalid URL structure");
    }

    #[test]
    fn test_validate_unsupported_protocol() {
        let check = validator().validate("ftp://example.com/file");
        assert!(!check.is_safe);
        assert_eq!(check.confidence, 1.0);
        assert_eq!(check.reason, "Unsupported protocol");
        assert_eq!(check.flagged_content, vec!["ftp".to_string()]);
    }
}
