use access_policy::{AccessDecision, DecisionObserver, RuleChange};
use audit_log::{AuditEntry, AuditEventType, AuditSink, AuditSource, DecisionRecord};

const COMPONENT: &str = "access-policy";

/// Records every decision and rule mutation in the audit trail.
///
/// Uses the non-blocking [`AuditSink::try_log`] so the decision path never
/// waits on the writer.
pub struct AuditObserver {
    audit: AuditSink,
}

impl AuditObserver {
    pub fn new(audit: AuditSink) -> Self {
        Self { audit }
    }
}

pub fn decision_record(decision: &AccessDecision) -> DecisionRecord {
    DecisionRecord {
        application_id: decision.application_id.clone(),
        blocked: decision.is_blocked(),
        matched_rules: decision.matches.iter().map(|m| m.rule.clone()).collect(),
        reason: decision.reason(),
    }
}

impl DecisionObserver for AuditObserver {
    fn on_decision(&self, decision: &AccessDecision) {
        let event_type = if decision.is_blocked() {
            AuditEventType::AccessDenied
        } else {
            AuditEventType::AccessEvaluated
        };
        let causes: Vec<String> = decision.matches.iter().map(|m| m.kind.to_string()).collect();
        let entry = AuditEntry::new(
            event_type,
            AuditSource::new(COMPONENT),
            serde_json::json!({ "causes": causes }),
        )
        .with_decision(decision_record(decision));
        self.audit.try_log(entry);
    }

    fn on_rule_change(&self, change: &RuleChange) {
        let (event_type, details) = match change {
            RuleChange::Added { id, inserted } => (
                AuditEventType::RuleAdded,
                serde_json::json!({ "application_id": id, "inserted": inserted }),
            ),
            RuleChange::Removed { id, removed } => (
                AuditEventType::RuleRemoved,
                serde_json::json!({ "application_id": id, "removed": removed }),
            ),
        };
        self.audit
            .try_log(AuditEntry::new(event_type, AuditSource::new(COMPONENT), details));
    }
}
