//! Method-call endpoint and foreground monitor for the access policy engine.
//!
//! The UI talks to the engine through named channels carrying
//! [`MethodCall`]s; each channel is served by a [`MethodCallHandler`] and a
//! [`ChannelRouter`] picks the handler. The OS side reports foreground
//! transitions to a [`ForegroundMonitor`], which consults the engine and may
//! push an `onAppOpened` [`Notification`] back toward the UI.
//!
//! ```text
//!   UI ──MethodCall──▶ ChannelRouter ──▶ RuleCheckHandler  ──┐
//!                                   └──▶ AppMonitorHandler ──┤
//!                                                             ▼
//!   OS ──AccessibilityEvent──▶ ForegroundMonitor ──▶ AccessPolicyEngine
//!   UI ◀──Notification (onAppOpened)──┘
//! ```

pub mod error;
pub mod foreground;
pub mod handler;
pub mod message;
pub mod router;

pub use error::ChannelError;
pub use foreground::{AccessibilityEvent, AccessibilityEventKind, ForegroundMonitor};
pub use handler::{
    AppMonitorHandler, MethodCallHandler, RuleCheckHandler, APP_MONITOR_CHANNEL,
    APP_OPENED_METHOD, RULE_CHECK_CHANNEL,
};
pub use message::{MethodCall, MethodOutcome, Notification};
pub use router::ChannelRouter;

use std::sync::Arc;

use access_policy::AccessPolicyEngine;

/// Build a router serving both the rule-check and app-monitor channels.
pub fn default_router(engine: Arc<AccessPolicyEngine>) -> ChannelRouter {
    ChannelRouter::new()
        .with_handler(Arc::new(RuleCheckHandler::new(Arc::clone(&engine))))
        .with_handler(Arc::new(AppMonitorHandler::new(engine)))
}
