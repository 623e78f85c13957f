use serde::{Deserialize, Serialize};

/// Top-level policy file.
///
/// The built-in rules (rule-store membership and the browser override) are
/// always installed; this file only adds to them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PolicyConfig {
    /// Schema version; currently must be "1.0".
    pub version: String,
    /// Additional always-on block rules, evaluated after the built-ins.
    #[serde(default)]
    pub overrides: Vec<OverrideRule>,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            overrides: Vec::new(),
        }
    }
}

/// A configured override that blocks every identifier matching `pattern`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OverrideRule {
    /// Human-readable, unique rule name.
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Glob over application identifiers, e.g. `com.facebook.*`.
    pub pattern: String,
}
