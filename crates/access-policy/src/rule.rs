use std::fmt;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::decision::RuleKind;
use crate::matcher::IdentifierPattern;
use crate::schema::OverrideRule;
use crate::store::RuleStore;

/// Identifier blocked unconditionally, independent of the rule store.
pub const BROWSER_OVERRIDE_ID: &str = "com.android.chrome";

/// Rule name reported when an identifier is found in the rule store.
pub const STORE_RULE_NAME: &str = "rule-store";

/// Rule name reported for the built-in browser override.
pub const BROWSER_RULE_NAME: &str = "builtin-browser-block";

/// Names reserved by built-in rules; policy files may not reuse them.
pub const RESERVED_RULE_NAMES: &[&str] = &[STORE_RULE_NAME, BROWSER_RULE_NAME];

/// A single predicate in the policy. The engine ORs all installed rules.
///
/// Implementations must be pure with respect to the decision: no I/O and no
/// side effects beyond reading shared state.
pub trait AccessRule: Send + Sync + fmt::Debug {
    /// Stable name used in decisions and diagnostics.
    fn name(&self) -> &str;

    fn kind(&self) -> RuleKind;

    /// Whether this rule blocks `id`.
    fn matches(&self, id: &str) -> bool;
}

/// Blocks any identifier explicitly present in the shared [`RuleStore`].
#[derive(Debug)]
pub struct StoreMembershipRule {
    store: Arc<RuleStore>,
}

impl StoreMembershipRule {
    pub fn new(store: Arc<RuleStore>) -> Self {
        Self { store }
    }
}

impl AccessRule for StoreMembershipRule {
    fn name(&self) -> &str {
        STORE_RULE_NAME
    }

    fn kind(&self) -> RuleKind {
        RuleKind::StoreMembership
    }

    fn matches(&self, id: &str) -> bool {
        self.store.contains(id)
    }
}

/// Blocks one fixed identifier. Not affected by store mutations.
#[derive(Debug)]
pub struct FixedIdentifierRule {
    name: String,
    id: String,
}

impl FixedIdentifierRule {
    pub fn new(name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
        }
    }

    /// The always-on browser block.
    pub fn browser() -> Self {
        Self::new(BROWSER_RULE_NAME, BROWSER_OVERRIDE_ID)
    }
}

impl AccessRule for FixedIdentifierRule {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> RuleKind {
        RuleKind::HardcodedOverride
    }

    fn matches(&self, id: &str) -> bool {
        id == self.id
    }
}

/// Blocks identifiers matching a glob pattern from the policy file.
#[derive(Debug)]
pub struct PatternRule {
    name: String,
    pattern: IdentifierPattern,
}

impl PatternRule {
    pub fn new(name: impl Into<String>, pattern: IdentifierPattern) -> Self {
        Self {
            name: name.into(),
            pattern,
        }
    }

    /// Compile a configured override. The error names the offending rule.
    pub fn from_override(rule: &OverrideRule) -> Result<Self> {
        let pattern = IdentifierPattern::compile(&rule.pattern)
            .with_context(|| format!("failed to compile pattern for rule '{}'", rule.name))?;
        Ok(Self::new(rule.name.clone(), pattern))
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }
}

impl AccessRule for PatternRule {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> RuleKind {
        RuleKind::ConfiguredOverride
    }

    fn matches(&self, id: &str) -> bool {
        self.pattern.is_match(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_rule_tracks_store() {
        let store = Arc::new(RuleStore::new());
        let rule = StoreMembershipRule::new(Arc::clone(&store));
        assert!(!rule.matches("a.b.c"));
        store.add("a.b.c");
        assert!(rule.matches("a.b.c"));
        store.remove("a.b.c");
        assert!(!rule.matches("a.b.c"));
        assert_eq!(rule.kind(), RuleKind::StoreMembership);
    }

    #[test]
    fn browser_rule_matches_only_chrome() {
        let rule = FixedIdentifierRule::browser();
        assert!(rule.matches("com.android.chrome"));
        assert!(!rule.matches("com.android.chrome.beta"));
        assert!(!rule.matches("org.mozilla.firefox"));
        assert_eq!(rule.name(), BROWSER_RULE_NAME);
        assert_eq!(rule.kind(), RuleKind::HardcodedOverride);
    }

    #[test]
    fn pattern_rule_from_override() {
        let rule = PatternRule::from_override(&OverrideRule {
            name: "social".to_string(),
            description: None,
            pattern: "com.facebook.*".to_string(),
        })
        .unwrap();
        assert_eq!(rule.pattern(), "com.facebook.*");
        assert!(rule.matches("com.facebook.katana"));
        assert_eq!(rule.kind(), RuleKind::ConfiguredOverride);
    }

    #[test]
    fn bad_pattern_error_names_rule() {
        let err = PatternRule::from_override(&OverrideRule {
            name: "broken".to_string(),
            description: None,
            pattern: "[oops".to_string(),
        })
        .unwrap_err();
        assert!(err.to_string().contains("broken"), "unexpected error: {err}");
    }
}
