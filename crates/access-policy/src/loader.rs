use std::collections::HashSet;
use std::path::Path;

use anyhow::{bail, ensure, Context, Result};

use crate::rule::{PatternRule, RESERVED_RULE_NAMES};
use crate::schema::{OverrideRule, PolicyConfig};

const SUPPORTED_VERSION: &str = "1.0";

/// Read and validate a policy file.
pub fn load_policy(path: impl AsRef<Path>) -> Result<PolicyConfig> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read policy file: {}", path.display()))?;
    load_policy_from_str(&contents)
        .with_context(|| format!("failed to parse policy file: {}", path.display()))
}

/// Parse a policy document and check it before any engine sees it.
///
/// Every override pattern is compiled here, so a policy that loads is a
/// policy [`AccessPolicyEngine::with_config`](crate::AccessPolicyEngine::with_config)
/// accepts.
pub fn load_policy_from_str(yaml: &str) -> Result<PolicyConfig> {
    let config: PolicyConfig = serde_yml::from_str(yaml).context("YAML deserialization failed")?;

    ensure!(
        config.version == SUPPORTED_VERSION,
        "unsupported policy version '{}'; only '{SUPPORTED_VERSION}' is supported",
        config.version
    );

    let mut names = HashSet::with_capacity(config.overrides.len());
    for (index, rule) in config.overrides.iter().enumerate() {
        check_override(rule).with_context(|| format!("invalid override #{}", index + 1))?;
        if !names.insert(rule.name.as_str()) {
            bail!("duplicate rule name: '{}'", rule.name);
        }
    }

    Ok(config)
}

fn check_override(rule: &OverrideRule) -> Result<()> {
    ensure!(!rule.name.trim().is_empty(), "rule name must not be empty");
    ensure!(
        !RESERVED_RULE_NAMES.contains(&rule.name.as_str()),
        "rule name '{}' is reserved for a built-in rule",
        rule.name
    );
    PatternRule::from_override(rule)?;
    Ok(())
}
