//! Ant-style include patterns.
//!
//! `*` matches within a single path segment, `**` spans segments, `?`
//! matches one character. Patterns are matched against the path relative
//! to the watch root.

use std::path::Path;

use globset::{GlobBuilder, GlobMatcher};

/// Compiled include pattern.
#[derive(Debug, Clone)]
pub struct AntInclude {
    pattern: String,
    matcher: GlobMatcher,
}

impl AntInclude {
    /// Compile a pattern.
    ///
    /// # Errors
    ///
    /// Returns the underlying glob error for a malformed pattern.
    pub fn new(pattern: &str) -> Result<Self, globset::Error> {
        // literal_separator keeps `*` from crossing segment boundaries,
        // which is what distinguishes Ant `*` from Ant `**`.
        let matcher = GlobBuilder::new(pattern)
            .literal_separator(true)
            .build()?
            .compile_matcher();
        Ok(Self {
            pattern: pattern.to_string(),
            matcher,
        })
    }

    /// Match a root-relative path against the pattern.
    #[must_use]
    pub fn matches(&self, relative: &Path) -> bool {
        self.matcher.is_match(relative)
    }

    /// The source pattern.
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }
}
