//! Invalidation patterns.

use super::strategy::STORAGE_KEY_SEPARATOR;
use crate::{Error, ErrorContext, Result};
use regex::Regex;

/// Selects cache keys for invalidation.
///
/// Patterns match the caller-facing key, never the strategy prefix.
#[derive(Debug, Clone)]
pub enum KeyPattern {
    Exact(String),
    /// Glob with `*` wildcards, compiled to an anchored regex.
    Glob(Regex),
    Regex(Regex),
}

impl KeyPattern {
    /// Strings containing `*` are treated as globs, everything else as an exact key.
    pub fn parse(pattern: &str) -> Result<Self> {
        if !pattern.contains('*') {
            return Ok(KeyPattern::Exact(pattern.to_string()));
        }
        let escaped: Vec<String> = pattern.split('*').map(regex::escape).collect();
        let source = format!("^{}$", escaped.join(".*"));
        Regex::new(&source).map(KeyPattern::Glob).map_err(|e| {
            Error::validation_with_context(
                "invalid invalidation pattern",
                ErrorContext::new()
                    .with_details(format!("{}: {}", pattern, e))
                    .with_component("cache_pattern"),
            )
        })
    }

    pub fn regex(source: &str) -> Result<Self> {
        Regex::new(source).map(KeyPattern::Regex).map_err(|e| {
            Error::validation_with_context(
                "invalid invalidation regex",
                ErrorContext::new()
                    .with_details(format!("{}: {}", source, e))
                    .with_component("cache_pattern"),
            )
        })
    }

    pub fn matches(&self, key: &str) -> bool {
        match self {
            KeyPattern::Exact(k) => k == key,
            KeyPattern::Glob(re) | KeyPattern::Regex(re) => re.is_match(key),
        }
    }

    /// Match against a durable-tier key of the form `strategy::key`.
    pub fn matches_storage_key(&self, storage_key: &str) -> bool {
        match storage_key.split_once(STORAGE_KEY_SEPARATOR) {
            Some((_, key)) => self.matches(key),
            None => self.matches(storage_key),
        }
    }
}

impl From<&str> for KeyPattern {
    /// Exact-key pattern. Use [`KeyPattern::parse`] for globs.
    fn from(key: &str) -> Self {
        KeyPattern::Exact(key.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_pattern() {
        let p = KeyPattern::parse("client:42").unwrap();
        assert!(matches!(p, KeyPattern::Exact(_)));
        assert!(p.matches("client:42"));
        assert!(!p.matches("client:421"));
    }

    #[test]
    fn test_glob_pattern_escapes_metacharacters() {
        let p = KeyPattern::parse("report.v1:*").unwrap();
        assert!(p.matches("report.v1:abc"));
        assert!(p.matches("report.v1:"));
        assert!(!p.matches("reportXv1:abc"));
        assert!(!p.matches("x-report.v1:abc"));
    }

    #[test]
    fn test_storage_key_ignores_strategy_prefix() {
        let p = KeyPattern::parse("user:*").unwrap();
        assert!(p.matches_storage_key("ai_responses::user:7"));
        assert!(!p.matches_storage_key("ai_responses::team:7"));
    }

    #[test]
    fn test_invalid_regex_rejected() {
        assert!(KeyPattern::regex("(").is_err());
        assert!(KeyPattern::regex("^a+$").unwrap().matches("aaa"));
    }
}
