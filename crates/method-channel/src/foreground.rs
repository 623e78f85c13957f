use std::sync::Arc;

use access_policy::{AccessDecision, AccessPolicyEngine, RuleKind};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info, trace};

use crate::handler::{APP_MONITOR_CHANNEL, APP_OPENED_METHOD};
use crate::message::Notification;

/// Accessibility event categories the monitor can receive. Only window state
/// changes signal a foreground transition.
///
/// Unrecognised kinds deserialize as [`AccessibilityEventKind::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AccessibilityEventKind {
    WindowStateChanged,
    WindowContentChanged,
    ViewClicked,
    ViewFocused,
    Other,
}

impl From<String> for AccessibilityEventKind {
    fn from(kind: String) -> Self {
        match kind.as_str() {
            "window_state_changed" => Self::WindowStateChanged,
            "window_content_changed" => Self::WindowContentChanged,
            "view_clicked" => Self::ViewClicked,
            "view_focused" => Self::ViewFocused,
            _ => Self::Other,
        }
    }
}

impl From<AccessibilityEventKind> for String {
    fn from(kind: AccessibilityEventKind) -> Self {
        let s = match kind {
            AccessibilityEventKind::WindowStateChanged => "window_state_changed",
            AccessibilityEventKind::WindowContentChanged => "window_content_changed",
            AccessibilityEventKind::ViewClicked => "view_clicked",
            AccessibilityEventKind::ViewFocused => "view_focused",
            AccessibilityEventKind::Other => "other",
        };
        s.to_string()
    }
}

/// An accessibility event as delivered by the OS side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessibilityEvent {
    pub event_type: AccessibilityEventKind,
    #[serde(default)]
    pub package_name: Option<String>,
}

impl AccessibilityEvent {
    pub fn window_state_changed(package_name: impl Into<String>) -> Self {
        Self {
            event_type: AccessibilityEventKind::WindowStateChanged,
            package_name: Some(package_name.into()),
        }
    }
}

/// Consults the engine on every foreground transition.
///
/// The consult is observational: nothing is enforced here. When the
/// foreground application is explicitly in the blocked set, an
/// `onAppOpened` notification carrying its identifier is published on the
/// app-monitor channel for the UI to act on. Hardcoded and configured
/// overrides alone do not trigger the notification.
pub struct ForegroundMonitor {
    engine: Arc<AccessPolicyEngine>,
    notices: broadcast::Sender<Notification>,
}

impl ForegroundMonitor {
    pub fn new(engine: Arc<AccessPolicyEngine>, notices: broadcast::Sender<Notification>) -> Self {
        Self { engine, notices }
    }

    /// Subscribe to notifications published by this monitor.
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.notices.subscribe()
    }

    /// Handle a raw accessibility event. Non-window-state events and events
    /// without a package name are dropped.
    pub fn on_accessibility_event(&self, event: &AccessibilityEvent) -> Option<AccessDecision> {
        if event.event_type != AccessibilityEventKind::WindowStateChanged {
            trace!(kind = ?event.event_type, "ignoring accessibility event");
            return None;
        }
        self.on_foreground_changed(event.package_name.as_deref())
    }

    /// Fire-and-forget foreground notification. A missing identifier is
    /// dropped silently. The returned decision is informational only.
    pub fn on_foreground_changed(&self, application_id: Option<&str>) -> Option<AccessDecision> {
        let Some(id) = application_id else {
            debug!("foreground change without package name dropped");
            return None;
        };

        debug!(application_id = id, "application opened");
        let decision = self.engine.evaluate(id);

        if decision.matched_by(RuleKind::StoreMembership) {
            self.publish_app_opened(id);
        }

        Some(decision)
    }

    fn publish_app_opened(&self, id: &str) {
        let notice = Notification {
            channel: APP_MONITOR_CHANNEL.to_string(),
            method: APP_OPENED_METHOD.to_string(),
            arguments: serde_json::Value::String(id.to_string()),
        };
        match self.notices.send(notice) {
            Ok(receivers) => info!(application_id = id, receivers, "relayed onAppOpened"),
            Err(_) => debug!(application_id = id, "no listener for onAppOpened"),
        }
    }
}
