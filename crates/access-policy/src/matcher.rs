use anyhow::{Context, Result};
use globset::{Glob, GlobMatcher};

/// A pre-compiled glob pattern over application identifiers.
///
/// `*` matches any run of characters including `.`, so `com.facebook.*`
/// covers every package under that prefix. Patterns without wildcards match
/// exactly one identifier.
#[derive(Debug, Clone)]
pub struct IdentifierPattern {
    pattern: String,
    matcher: GlobMatcher,
}

impl IdentifierPattern {
    /// Compile `pattern`. Returns an error if the glob syntax is invalid.
    pub fn compile(pattern: &str) -> Result<Self> {
        let matcher = Glob::new(pattern)
            .with_context(|| format!("invalid identifier pattern: {pattern}"))?
            .compile_matcher();
        Ok(Self {
            pattern: pattern.to_string(),
            matcher,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.pattern
    }

    pub fn is_match(&self, id: &str) -> bool {
        self.matcher.is_match(id)
    }
}
