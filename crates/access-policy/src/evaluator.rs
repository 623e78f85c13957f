use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info};

use crate::decision::{AccessDecision, RuleKind, RuleMatch};
use crate::rule::{AccessRule, FixedIdentifierRule, PatternRule, StoreMembershipRule};
use crate::schema::PolicyConfig;
use crate::store::RuleStore;

// ---------------------------------------------------------------------------
// Observer hook
// ---------------------------------------------------------------------------

/// A change applied to the rule store through the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleChange {
    /// `id` was requested to be blocked. `inserted` is false when it already was.
    Added { id: String, inserted: bool },
    /// `id` was requested to be unblocked. `removed` is false when it was absent.
    Removed { id: String, removed: bool },
}

/// Receives every decision and store mutation after it has been applied.
///
/// Observers run synchronously on the caller's thread, so they must not
/// block. Telemetry, tracing and audit trails hang off this hook; the
/// predicate itself stays free of side effects.
pub trait DecisionObserver: Send + Sync {
    fn on_decision(&self, decision: &AccessDecision);

    fn on_rule_change(&self, _change: &RuleChange) {}
}

/// Emits one structured `tracing` record per decision and mutation.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl DecisionObserver for TracingObserver {
    fn on_decision(&self, decision: &AccessDecision) {
        let id = decision.application_id.as_str();
        if !decision.is_blocked() {
            debug!(application_id = id, "application is not blocked");
            return;
        }
        if decision.matched_by(RuleKind::StoreMembership) {
            debug!(application_id = id, "application is in the blocked set");
        }
        if decision.matched_by(RuleKind::HardcodedOverride) {
            debug!(application_id = id, "application is blocked by a hardcoded override");
        }
        for m in decision
            .matches
            .iter()
            .filter(|m| m.kind == RuleKind::ConfiguredOverride)
        {
            debug!(
                application_id = id,
                rule = m.rule.as_str(),
                "application is blocked by a configured override"
            );
        }
    }

    fn on_rule_change(&self, change: &RuleChange) {
        match change {
            RuleChange::Added { id, inserted } => {
                debug!(application_id = id.as_str(), inserted, "added application to blocked set")
            }
            RuleChange::Removed { id, removed } => debug!(
                application_id = id.as_str(),
                removed, "removed application from blocked set"
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// AccessPolicyEngine
// ---------------------------------------------------------------------------

/// Central decision point for "is this application currently blocked".
///
/// Holds an injected [`RuleStore`] and an ordered list of [`AccessRule`]s
/// evaluated with OR semantics. The first two rules are always the store
/// membership rule and the browser override; configured overrides follow.
/// Because the browser override is a separate rule, `unblock` can never make
/// `com.android.chrome` allowed.
///
/// # Monitoring vocabulary
///
/// [`monitor`](Self::monitor) and [`stop_monitoring`](Self::stop_monitoring)
/// are aliases of [`block`](Self::block) and [`unblock`](Self::unblock): they
/// mutate the same set used for decisions. Whether "monitoring" was ever
/// meant to be a separate observe-only concept is unresolved, so both names
/// are kept and behave identically.
pub struct AccessPolicyEngine {
    store: Arc<RuleStore>,
    rules: Vec<Box<dyn AccessRule>>,
    observers: Vec<Arc<dyn DecisionObserver>>,
}

impl std::fmt::Debug for AccessPolicyEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let rule_names: Vec<&str> = self.rules.iter().map(|r| r.name()).collect();
        f.debug_struct("AccessPolicyEngine")
            .field("rules", &rule_names)
            .field("blocked_count", &self.store.len())
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl AccessPolicyEngine {
    /// Create an engine with only the built-in rules.
    pub fn new(store: Arc<RuleStore>) -> Self {
        let rules: Vec<Box<dyn AccessRule>> = vec![
            Box::new(StoreMembershipRule::new(Arc::clone(&store))),
            Box::new(FixedIdentifierRule::browser()),
        ];
        Self {
            store,
            rules,
            observers: Vec::new(),
        }
    }

    /// Create an engine with the built-in rules plus every override from a
    /// validated [`PolicyConfig`]. Fails if any pattern does not compile.
    pub fn with_config(store: Arc<RuleStore>, config: &PolicyConfig) -> Result<Self> {
        let mut engine = Self::new(store);
        for rule in &config.overrides {
            engine.rules.push(Box::new(PatternRule::from_override(rule)?));
        }
        info!(
            overrides = config.overrides.len(),
            total_rules = engine.rules.len(),
            "access policy engine configured"
        );
        Ok(engine)
    }

    /// Append a custom rule after the existing ones.
    pub fn with_rule(mut self, rule: impl AccessRule + 'static) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    /// Register an observer notified after every decision and mutation.
    pub fn with_observer(mut self, observer: Arc<dyn DecisionObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn store(&self) -> &Arc<RuleStore> {
        &self.store
    }

    /// Names of the installed rules, in evaluation order.
    pub fn rule_names(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    // -- Decisions ------------------------------------------------------------

    /// Evaluate `id` against every rule and return the full decision.
    ///
    /// All rules are checked so that the decision records every cause.
    pub fn evaluate(&self, id: &str) -> AccessDecision {
        let decision = self.decide(id);
        for observer in &self.observers {
            observer.on_decision(&decision);
        }
        decision
    }

    /// Whether `id` is currently blocked.
    pub fn is_blocked(&self, id: &str) -> bool {
        self.evaluate(id).is_blocked()
    }

    fn decide(&self, id: &str) -> AccessDecision {
        let matches = self
            .rules
            .iter()
            .filter(|rule| rule.matches(id))
            .map(|rule| RuleMatch {
                rule: rule.name().to_string(),
                kind: rule.kind(),
            })
            .collect();
        AccessDecision::new(id, matches)
    }

    // -- Mutations ------------------------------------------------------------

    /// Add `id` to the blocked set. Idempotent.
    pub fn block(&self, id: &str) {
        let inserted = self.store.add(id);
        self.notify_change(RuleChange::Added {
            id: id.to_string(),
            inserted,
        });
    }

    /// Remove `id` from the blocked set. Does not touch built-in or
    /// configured overrides; an absent id is a no-op.
    pub fn unblock(&self, id: &str) {
        let removed = self.store.remove(id);
        self.notify_change(RuleChange::Removed {
            id: id.to_string(),
            removed,
        });
    }

    /// Alias of [`block`](Self::block).
    pub fn monitor(&self, id: &str) {
        self.block(id);
    }

    /// Alias of [`unblock`](Self::unblock).
    pub fn stop_monitoring(&self, id: &str) {
        self.unblock(id);
    }

    fn notify_change(&self, change: RuleChange) {
        debug!(blocked = ?self.store.snapshot(), "current blocked set");
        for observer in &self.observers {
            observer.on_rule_change(&change);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
