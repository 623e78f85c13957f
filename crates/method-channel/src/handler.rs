use std::sync::Arc;

use access_policy::AccessPolicyEngine;
use serde_json::Value;
use tracing::{debug, info};

use crate::error::ChannelError;
use crate::message::MethodCall;

/// Channel answering "is this application blocked" queries.
pub const RULE_CHECK_CHANNEL: &str = "com.hugh.coughacks/rule_check";

/// Channel carrying block/unblock mutations and `onAppOpened` notifications.
pub const APP_MONITOR_CHANNEL: &str = "com.hugh.coughacks/app_monitor";

/// Method pushed to the UI when a blocked application reaches the foreground.
pub const APP_OPENED_METHOD: &str = "onAppOpened";

/// Synchronous handler for every method on one channel.
///
/// Handlers must answer within a single in-process call: no I/O and no
/// waiting on external resources.
pub trait MethodCallHandler: Send + Sync {
    /// The channel this handler serves.
    fn channel(&self) -> &str;

    /// Handle `call`. Unknown methods return [`ChannelError::NotImplemented`].
    fn on_method_call(&self, call: &MethodCall) -> Result<Value, ChannelError>;
}

/// Serves `isAppBlocked` and `isAppCurrentlyBlocked`, both keyed by `app`.
pub struct RuleCheckHandler {
    engine: Arc<AccessPolicyEngine>,
}

impl RuleCheckHandler {
    pub fn new(engine: Arc<AccessPolicyEngine>) -> Self {
        Self { engine }
    }
}

impl MethodCallHandler for RuleCheckHandler {
    fn channel(&self) -> &str {
        RULE_CHECK_CHANNEL
    }

    fn on_method_call(&self, call: &MethodCall) -> Result<Value, ChannelError> {
        match call.method.as_str() {
            "isAppBlocked" | "isAppCurrentlyBlocked" => {
                let app = call.require_str("app", "App package name is required")?;
                let decision = self.engine.evaluate(app);
                debug!(
                    method = call.method.as_str(),
                    application_id = app,
                    verdict = %decision.verdict(),
                    "answered rule check"
                );
                Ok(Value::Bool(decision.is_blocked()))
            }
            other => Err(ChannelError::not_implemented(RULE_CHECK_CHANNEL, other)),
        }
    }
}

/// Serves `monitorApp` / `stopMonitoringApp`, keyed by `packageName`.
///
/// Both methods mutate the blocked set: monitoring an application blocks it.
/// See [`AccessPolicyEngine::monitor`].
pub struct AppMonitorHandler {
    engine: Arc<AccessPolicyEngine>,
}

impl AppMonitorHandler {
    pub fn new(engine: Arc<AccessPolicyEngine>) -> Self {
        Self { engine }
    }
}

impl MethodCallHandler for AppMonitorHandler {
    fn channel(&self) -> &str {
        APP_MONITOR_CHANNEL
    }

    fn on_method_call(&self, call: &MethodCall) -> Result<Value, ChannelError> {
        match call.method.as_str() {
            "monitorApp" => {
                let package = call.require_str("packageName", "Package name is required")?;
                self.engine.monitor(package);
                info!(application_id = package, "monitoring application");
                Ok(Value::Bool(true))
            }
            "stopMonitoringApp" => {
                let package = call.require_str("packageName", "Package name is required")?;
                self.engine.stop_monitoring(package);
                info!(application_id = package, "stopped monitoring application");
                Ok(Value::Bool(true))
            }
            other => Err(ChannelError::not_implemented(APP_MONITOR_CHANNEL, other)),
        }
    }
}
