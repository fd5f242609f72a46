//! Compiles and applies the `--include`/`--exclude` path patterns.
//!
//! Patterns are anchored to the end of the path at compile time (a `$` is appended), matching
//! the source tool's "the full path must match" semantics, and are matched against raw path
//! bytes rather than `&str` so that non-UTF8 path components never cause a panic.
use core::fmt;
use regex::bytes::Regex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseRegexError {
    pattern: String,
    message: String,
}

impl fmt::Display for ParseRegexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid regex '{}': {}", self.pattern, self.message)
    }
}

impl std::error::Error for ParseRegexError {}

/// A single anchored path pattern, compiled once and reused for every entry it is tested
/// against.
#[derive(Debug, Clone)]
pub struct AnchoredPattern {
    regex: Regex,
}

impl AnchoredPattern {
    pub fn compile(pattern: &str) -> Result<Self, ParseRegexError> {
        let anchored = if pattern.ends_with('$') {
            pattern.to_owned()
        } else {
            format!("{pattern}$")
        };

        let regex = Regex::new(&anchored).map_err(|e| ParseRegexError {
            pattern: pattern.to_owned(),
            message: e.to_string(),
        })?;

        Ok(Self { regex })
    }

    #[must_use]
    #[inline]
    pub fn is_match(&self, path: &[u8]) -> bool {
        self.regex.is_match(path)
    }
}

/// The include/exclude pair a directory counter consults for every entry.
#[derive(Debug, Clone, Default)]
pub struct PathFilter {
    pub include: Option<AnchoredPattern>,
    pub exclude: Option<AnchoredPattern>,
}

impl PathFilter {
    pub fn new(include: Option<&str>, exclude: Option<&str>) -> Result<Self, ParseRegexError> {
        Ok(Self {
            include: include.map(AnchoredPattern::compile).transpose()?,
            exclude: exclude.map(AnchoredPattern::compile).transpose()?,
        })
    }

    /// `true` if `path` should be dropped outright because it matches `--exclude`.
    #[must_use]
    #[inline]
    pub fn is_excluded(&self, path: &[u8]) -> bool {
        self.exclude.as_ref().is_some_and(|re| re.is_match(path))
    }

    /// `true` if `--include` is configured and `path` fails to match it.
    #[must_use]
    #[inline]
    pub fn fails_include(&self, path: &[u8]) -> bool {
        self.include.as_ref().is_some_and(|re| !re.is_match(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anchors_at_end() {
        let pattern = AnchoredPattern::compile(r".*/d").unwrap();
        assert!(pattern.is_match(b"/root/r/d"));
        assert!(!pattern.is_match(b"/root/r/d/f3"));
    }

    #[test]
    fn exclude_and_include_combine() {
        let filter = PathFilter::new(Some(r".*/d/.*"), None).unwrap();
        assert!(!filter.fails_include(b"/root/r/d/f3"));
        assert!(filter.fails_include(b"/root/r/f1"));
    }

    #[test]
    fn invalid_pattern_reports_error() {
        assert!(AnchoredPattern::compile("(unterminated").is_err());
    }
}
