use std::fmt;

/// The outcome of evaluating an application identifier against the policy.
///
/// Decisions are computed fresh on every call and never cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessDecision {
    /// The identifier that was evaluated.
    pub application_id: String,
    /// Every rule that matched, in rule order. Empty means allowed.
    pub matches: Vec<RuleMatch>,
}

/// A single rule that contributed to a blocked verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleMatch {
    /// Name of the rule that matched.
    pub rule: String,
    /// What kind of rule it was.
    pub kind: RuleKind,
}

/// Distinguishes why an identifier was blocked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleKind {
    /// The identifier is explicitly present in the rule store.
    StoreMembership,
    /// A built-in rule that is always active and cannot be removed.
    HardcodedOverride,
    /// A pattern rule loaded from the policy file.
    ConfiguredOverride,
}

/// Binary verdict derived from an [`AccessDecision`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Allowed,
    Blocked,
}

impl AccessDecision {
    pub fn new(application_id: impl Into<String>, matches: Vec<RuleMatch>) -> Self {
        Self {
            application_id: application_id.into(),
            matches,
        }
    }

    pub fn verdict(&self) -> Verdict {
        if self.matches.is_empty() {
            Verdict::Allowed
        } else {
            Verdict::Blocked
        }
    }

    pub fn is_blocked(&self) -> bool {
        self.verdict() == Verdict::Blocked
    }

    /// Whether a rule of `kind` contributed to this decision.
    pub fn matched_by(&self, kind: RuleKind) -> bool {
        self.matches.iter().any(|m| m.kind == kind)
    }

    /// Name of the first matching rule, if any.
    pub fn primary_rule(&self) -> Option<&str> {
        self.matches.first().map(|m| m.rule.as_str())
    }

    /// Human-readable reason explaining the decision.
    pub fn reason(&self) -> String {
        if self.matches.is_empty() {
            return format!("{} is not blocked by any rule", self.application_id);
        }
        let causes: Vec<String> = self
            .matches
            .iter()
            .map(|m| format!("{} ({})", m.rule, m.kind))
            .collect();
        format!("{} is blocked by {}", self.application_id, causes.join(", "))
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RuleKind::StoreMembership => "store_membership",
            RuleKind::HardcodedOverride => "hardcoded_override",
            RuleKind::ConfiguredOverride => "configured_override",
        };
        f.write_str(s)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Allowed => f.write_str("allowed"),
            Verdict::Blocked => f.write_str("blocked"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn membership() -> RuleMatch {
        RuleMatch {
            rule: "rule-store".to_string(),
            kind: RuleKind::StoreMembership,
        }
    }

    #[test]
    fn empty_matches_is_allowed() {
        let d = AccessDecision::new("com.example", Vec::new());
        assert_eq!(d.verdict(), Verdict::Allowed);
        assert!(!d.is_blocked());
        assert!(d.primary_rule().is_none());
        assert_eq!(d.reason(), "com.example is not blocked by any rule");
    }

    #[test]
    fn any_match_is_blocked() {
        let d = AccessDecision::new("com.example", vec![membership()]);
        assert!(d.is_blocked());
        assert!(d.matched_by(RuleKind::StoreMembership));
        assert!(!d.matched_by(RuleKind::HardcodedOverride));
        assert_eq!(d.primary_rule(), Some("rule-store"));
    }

    #[test]
    fn reason_lists_every_cause() {
        let d = AccessDecision::new(
            "com.android.chrome",
            vec![
                membership(),
                RuleMatch {
                    rule: "builtin-browser".to_string(),
                    kind: RuleKind::HardcodedOverride,
                },
            ],
        );
        assert_eq!(
            d.reason(),
            "com.android.chrome is blocked by rule-store (store_membership), \
             builtin-browser (hardcoded_override)"
        );
    }

    #[test]
    fn verdict_display() {
        assert_eq!(Verdict::Allowed.to_string(), "allowed");
        assert_eq!(Verdict::Blocked.to_string(), "blocked");
    }
}
