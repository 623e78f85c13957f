use std::collections::HashMap;
use std::sync::Arc;

use tracing::warn;

use crate::error::ChannelError;
use crate::handler::MethodCallHandler;
use crate::message::{MethodCall, MethodOutcome};

/// Routes method calls to the handler registered for their channel.
///
/// A call on a channel with no handler is answered as not implemented, the
/// same as an unknown method on a known channel.
#[derive(Default)]
pub struct ChannelRouter {
    handlers: HashMap<String, Arc<dyn MethodCallHandler>>,
}

impl ChannelRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` under its own channel name, replacing any earlier
    /// handler for that channel.
    pub fn register(&mut self, handler: Arc<dyn MethodCallHandler>) {
        self.handlers.insert(handler.channel().to_string(), handler);
    }

    pub fn with_handler(mut self, handler: Arc<dyn MethodCallHandler>) -> Self {
        self.register(handler);
        self
    }

    /// Registered channel names, sorted.
    pub fn channels(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Dispatch `call` on `channel` and return the typed result.
    pub fn call(
        &self,
        channel: &str,
        call: &MethodCall,
    ) -> Result<serde_json::Value, ChannelError> {
        match self.handlers.get(channel) {
            Some(handler) => handler.on_method_call(call),
            None => Err(ChannelError::not_implemented(channel, call.method.as_str())),
        }
    }

    /// Dispatch `call` on `channel` and convert the result into a wire outcome.
    pub fn dispatch(&self, channel: &str, call: &MethodCall) -> MethodOutcome {
        let result = self.call(channel, call);
        if let Err(err) = &result {
            warn!(channel, method = call.method.as_str(), %err, "method call rejected");
        }
        result.into()
    }
}

impl std::fmt::Debug for ChannelRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelRouter")
            .field("channels", &self.channels())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    struct Echo;

    impl MethodCallHandler for Echo {
        fn channel(&self) -> &str {
            "test/echo"
        }

        fn on_method_call(&self, call: &MethodCall) -> Result<serde_json::Value, ChannelError> {
            match call.method.as_str() {
                "echo" => Ok(call.arguments.clone()),
                other => Err(ChannelError::not_implemented(self.channel(), other)),
            }
        }
    }

    #[test]
    fn routes_by_channel() {
        let router = ChannelRouter::new().with_handler(Arc::new(Echo));
        assert_eq!(router.channels(), vec!["test/echo"]);

        let outcome = router.dispatch("test/echo", &MethodCall::new("echo", json!([1, 2])));
        assert_eq!(outcome, MethodOutcome::success(json!([1, 2])));
    }

    #[test]
    fn unknown_channel_is_not_implemented() {
        let router = ChannelRouter::new().with_handler(Arc::new(Echo));
        let outcome = router.dispatch("test/missing", &MethodCall::new("echo", json!(null)));
        assert_eq!(outcome, MethodOutcome::NotImplemented);

        let err = router
            .call("test/missing", &MethodCall::new("echo", json!(null)))
            .unwrap_err();
        assert_eq!(err, ChannelError::not_implemented("test/missing", "echo"));
    }

    #[test]
    fn unknown_method_is_not_implemented() {
        let router = ChannelRouter::new().with_handler(Arc::new(Echo));
        let outcome = router.dispatch("test/echo", &MethodCall::new("shout", json!(null)));
        assert_eq!(outcome, MethodOutcome::NotImplemented);
    }
}
