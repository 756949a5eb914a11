//! Regular expressions compiled once, when a matcher is built.

use regex::Regex;

use crate::result::{ProbeError, ProbeResult};

/// A compiled regex and the source it was written as.
///
/// A pattern that fails to compile keeps the compiler's message; it matches
/// nothing and [`Pattern::check`] reports it as a configuration error.
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    compiled: Result<Regex, String>,
}

impl Pattern {
    #[must_use]
    pub fn new(source: impl Into<String>) -> Self {
        let source = source.into();
        let compiled = Regex::new(&source).map_err(|e| e.to_string());
        Self { source, compiled }
    }

    /// Shown as `source`, matched with `regex`
    pub(crate) fn translated(source: impl Into<String>, regex: &str) -> Self {
        Self {
            source: source.into(),
            compiled: Regex::new(regex).map_err(|e| e.to_string()),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    #[must_use]
    pub fn is_match(&self, haystack: &str) -> bool {
        self.compiled
            .as_ref()
            .is_ok_and(|re| re.is_match(haystack))
    }

    /// `Config` error if the pattern did not compile
    pub fn check(&self) -> ProbeResult<()> {
        match &self.compiled {
            Ok(_) => Ok(()),
            Err(e) => Err(ProbeError::config(format!(
                "invalid pattern /{}/: {e}",
                self.source
            ))),
        }
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for Pattern {}

impl std::fmt::Display for Pattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.source)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_pattern_matches() {
        let p = Pattern::new(r"\$[\d,]+\.\d{2}");
        assert!(p.check().is_ok());
        assert!(p.is_match("Total $1,250.00"));
        assert_eq!(p.to_string(), r"\$[\d,]+\.\d{2}");
    }

    #[test]
    fn test_invalid_pattern_is_config_error() {
        let p = Pattern::new("(unclosed");
        assert!(!p.is_match("(unclosed"));
        let err = p.check().unwrap_err();
        assert!(matches!(err, ProbeError::Config { .. }));
        assert!(err.to_string().contains("/(unclosed/"));
    }

    #[test]
    fn test_translated_keeps_source() {
        let p = Pattern::translated("**/x", "^.*/x$");
        assert_eq!(p.as_str(), "**/x");
        assert!(p.is_match("https://a/x"));
        assert_eq!(p, Pattern::translated("**/x", "^.*/x$"));
    }
}
