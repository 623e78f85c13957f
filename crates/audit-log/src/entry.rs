use serde::{Deserialize, Serialize};

/// A single audit record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: uuid::Uuid,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub event_type: AuditEventType,
    pub source: AuditSource,
    pub details: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision: Option<DecisionRecord>,
}

impl AuditEntry {
    /// Create an entry with a fresh UUID v4 and the current UTC timestamp.
    pub fn new(
        event_type: AuditEventType,
        source: AuditSource,
        details: serde_json::Value,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            timestamp: chrono::Utc::now(),
            event_type,
            source,
            details,
            decision: None,
        }
    }

    /// Attach the access decision that produced this entry.
    pub fn with_decision(mut self, decision: DecisionRecord) -> Self {
        self.decision = Some(decision);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    ProcessStarted,
    ProcessStopped,
    PolicyLoaded,
    /// A decision that came out allowed.
    AccessEvaluated,
    /// A decision that came out blocked.
    AccessDenied,
    RuleAdded,
    RuleRemoved,
    ForegroundChanged,
    /// A method call answered with an error or not-implemented.
    CallRejected,
}

/// The component that produced an entry, plus optional call context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditSource {
    pub component: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub call_id: Option<String>,
}

impl AuditSource {
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            channel: None,
            call_id: None,
        }
    }

    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = Some(channel.into());
        self
    }

    pub fn with_call_id(mut self, call_id: impl Into<String>) -> Self {
        self.call_id = Some(call_id.into());
        self
    }
}

/// Serializable summary of an access decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub application_id: String,
    pub blocked: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub matched_rules: Vec<String>,
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_serializes_snake_case_event() {
        let entry = AuditEntry::new(
            AuditEventType::RuleAdded,
            AuditSource::new("engine"),
            serde_json::json!({"application_id": "a.b.c"}),
        );
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["event_type"], "rule_added");
        assert_eq!(value["source"]["component"], "engine");
        assert!(value["source"].get("channel").is_none());
        assert!(value.get("decision").is_none());
    }

    #[test]
    fn decision_is_attached() {
        let entry = AuditEntry::new(
            AuditEventType::AccessDenied,
            AuditSource::new("engine")
                .with_channel("com.hugh.coughacks/rule_check")
                .with_call_id("7"),
            serde_json::Value::Null,
        )
        .with_decision(DecisionRecord {
            application_id: "com.android.chrome".to_string(),
            blocked: true,
            matched_rules: vec!["builtin-browser-block".to_string()],
            reason: "hardcoded".to_string(),
        });

        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["decision"]["blocked"], true);
        assert_eq!(value["decision"]["matched_rules"][0], "builtin-browser-block");
        assert_eq!(value["source"]["call_id"], "7");
    }

    #[test]
    fn allowed_decision_omits_empty_rules() {
        let record = DecisionRecord {
            application_id: "x".to_string(),
            blocked: false,
            matched_rules: Vec::new(),
            reason: "none".to_string(),
        };
        let value = serde_json::to_value(&record).unwrap();
        assert!(value.get("matched_rules").is_none());
        let back: DecisionRecord = serde_json::from_value(value).unwrap();
        assert_eq!(back, record);
    }
}
