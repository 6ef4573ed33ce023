//! Structured output parsing for language-model responses
//!
//! Providers are asked for a fenced JSON block but do not always comply.
//! Every schema therefore goes through the same pipeline:
//!
//! 1. [`parse_strict`]: the fenced (or bare) JSON block, deserialized as-is
//! 2. [`StructuredOutput::parse_heuristic`]: a line-based best effort
//! 3. [`StructuredOutput::fallback`]: fixed defaults
//!
//! so a step never fails only because a response was malformed.

mod planning;
mod reflexion;
mod synthesis;

pub use planning::PlanningOutput;
pub use reflexion::ReflexionOutput;
pub use synthesis::SynthesisOutput;

use serde::de::DeserializeOwned;
use tracing::debug;

/// A schema the language model is asked to fill in
pub trait StructuredOutput: DeserializeOwned + Sized {
    /// Schema name for logging
    const NAME: &'static str;

    /// Best-effort extraction from free text. `None` when nothing usable was
    /// found.
    fn parse_heuristic(text: &str) -> Option<Self>;

    /// Values used when neither parser produced anything
    fn fallback() -> Self;

    /// Post-parse cleanup (clamping, trimming)
    fn normalized(self) -> Self {
        self
    }

    /// Run the full pipeline
    fn parse(text: &str) -> Self {
        if let Some(parsed) = parse_strict::<Self>(text) {
            debug!(schema = Self::NAME, "Parsed structured output from JSON");
            return parsed.normalized();
        }
        if let Some(parsed) = Self::parse_heuristic(text) {
            debug!(schema = Self::NAME, "Parsed structured output heuristically");
            return parsed.normalized();
        }
        debug!(schema = Self::NAME, "Using fallback structured output");
        Self::fallback()
    }
}

/// Deserialize the JSON block of `text`, if there is one and it matches `T`
pub fn parse_strict<T: DeserializeOwned>(text: &str) -> Option<T> {
    let json = extract_fenced_json(text)?;
    serde_json::from_str(json).ok()
}

/// The body of the first ```` ```json ```` fence, else of the first plain
/// fence, else the whole text when it is a bare JSON object.
pub fn extract_fenced_json(text: &str) -> Option<&str> {
    if let Some(body) = fenced_body(text, "```json") {
        return Some(body);
    }
    if let Some(body) = fenced_body(text, "```") {
        if body.starts_with('{') {
            return Some(body);
        }
    }

    let trimmed = text.trim();
    (trimmed.starts_with('{') && trimmed.ends_with('}')).then_some(trimmed)
}

fn fenced_body<'a>(text: &'a str, opener: &str) -> Option<&'a str> {
    let start = text.find(opener)? + opener.len();
    let rest = &text[start..];
    let end = rest.find("```")?;
    Some(rest[..end].trim())
}

/// The item text of a bulleted (`-`, `*`, `•`) or numbered (`1.`, `2)`) line
pub(crate) fn list_item(line: &str) -> Option<&str> {
    let line = line.trim();
    for bullet in ['-', '*', '•'] {
        if let Some(rest) = line.strip_prefix(bullet) {
            return Some(rest.trim());
        }
    }

    let digits = line.chars().take_while(char::is_ascii_digit).count();
    if digits > 0 {
        let rest = &line[digits..];
        if let Some(rest) = rest.strip_prefix('.').or_else(|| rest.strip_prefix(')')) {
            return Some(rest.trim());
        }
    }
    None
}

/// Text after the first `:` of a header line, if any
pub(crate) fn header_remainder(line: &str) -> Option<&str> {
    let (_, rest) = line.split_once(':')?;
    let rest = rest.trim().trim_matches('*').trim();
    (!rest.is_empty()).then_some(rest)
}

/// Strip surrounding quotes and trailing commas an LLM may leave on list items
pub(crate) fn clean_item(item: &str) -> String {
    item.trim()
        .trim_end_matches(',')
        .trim_matches(|c| c == '"' || c == '\'' || c == '`')
        .trim()
        .to_string()
}
