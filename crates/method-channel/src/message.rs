use serde::{Deserialize, Serialize};

use crate::error::{ChannelError, INVALID_ARGUMENT};

/// A named method invocation with loosely typed arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodCall {
    pub method: String,
    #[serde(default)]
    pub arguments: serde_json::Value,
}

impl MethodCall {
    pub fn new(method: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self {
            method: method.into(),
            arguments,
        }
    }

    /// Look up a string argument by key. Null, missing, and non-string
    /// values all come back as `None`.
    pub fn argument_str(&self, key: &str) -> Option<&str> {
        self.arguments.get(key).and_then(|v| v.as_str())
    }

    /// Like [`argument_str`](Self::argument_str) but turns absence into an
    /// [`ChannelError::InvalidArgument`] carrying `message`.
    pub fn require_str(&self, key: &str, message: &str) -> Result<&str, ChannelError> {
        self.argument_str(key)
            .ok_or_else(|| ChannelError::invalid_argument(message))
    }
}

/// The result of dispatching a [`MethodCall`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MethodOutcome {
    Success {
        value: serde_json::Value,
    },
    Error {
        code: String,
        message: String,
        #[serde(default)]
        details: serde_json::Value,
    },
    NotImplemented,
}

impl MethodOutcome {
    pub fn success(value: impl Into<serde_json::Value>) -> Self {
        Self::Success {
            value: value.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

impl From<Result<serde_json::Value, ChannelError>> for MethodOutcome {
    fn from(result: Result<serde_json::Value, ChannelError>) -> Self {
        match result {
            Ok(value) => Self::Success { value },
            Err(ChannelError::InvalidArgument { message }) => Self::Error {
                code: INVALID_ARGUMENT.to_string(),
                message,
                details: serde_json::Value::Null,
            },
            Err(ChannelError::NotImplemented { .. }) => Self::NotImplemented,
        }
    }
}

/// A one-way invocation pushed from the native side toward the UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub channel: String,
    pub method: String,
    #[serde(default)]
    pub arguments: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn argument_lookup() {
        let call = MethodCall::new("isAppBlocked", json!({"app": "a.b.c", "n": 3}));
        assert_eq!(call.argument_str("app"), Some("a.b.c"));
        assert_eq!(call.argument_str("n"), None);
        assert_eq!(call.argument_str("missing"), None);

        let call = MethodCall::new("isAppBlocked", json!({"app": null}));
        assert_eq!(call.argument_str("app"), None);

        let call = MethodCall::new("isAppBlocked", serde_json::Value::Null);
        let err = call.require_str("app", "App package name is required").unwrap_err();
        assert_eq!(err, ChannelError::invalid_argument("App package name is required"));
    }

    #[test]
    fn call_arguments_default_to_null() {
        let call: MethodCall = serde_json::from_value(json!({"method": "isAppBlocked"})).unwrap();
        assert!(call.arguments.is_null());
    }

    #[test]
    fn outcome_wire_shape() {
        assert_eq!(
            serde_json::to_value(MethodOutcome::success(true)).unwrap(),
            json!({"status": "success", "value": true})
        );
        assert_eq!(
            serde_json::to_value(MethodOutcome::NotImplemented).unwrap(),
            json!({"status": "not_implemented"})
        );
    }

    #[test]
    fn errors_map_to_outcomes() {
        let outcome: MethodOutcome = Err(ChannelError::invalid_argument("missing")).into();
        assert_eq!(
            outcome,
            MethodOutcome::Error {
                code: "INVALID_ARGUMENT".to_string(),
                message: "missing".to_string(),
                details: serde_json::Value::Null,
            }
        );

        let outcome: MethodOutcome = Err(ChannelError::not_implemented("c", "m")).into();
        assert_eq!(outcome, MethodOutcome::NotImplemented);
        assert!(!outcome.is_success());
    }
}
