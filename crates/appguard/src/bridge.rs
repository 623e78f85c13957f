use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::TryRecvError;
use tracing::{debug, info, warn};

use audit_log::{AuditEntry, AuditEventType, AuditSink, AuditSource};
use method_channel::{
    AccessibilityEvent, ChannelRouter, ForegroundMonitor, MethodCall, MethodOutcome, Notification,
};

// ---------------------------------------------------------------------------
// Frames
// ---------------------------------------------------------------------------

/// One line read from the embedding host.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundFrame {
    /// A method call expecting exactly one `result` frame with the same id.
    Call {
        id: String,
        channel: String,
        method: String,
        #[serde(default)]
        arguments: serde_json::Value,
    },
    /// A fire-and-forget accessibility event from the OS side.
    AccessibilityEvent(AccessibilityEvent),
}

/// One line written back to the embedding host.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundFrame {
    Result { id: String, outcome: MethodOutcome },
    Invoke(Notification),
}

/// Counters reported when the bridge loop ends.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BridgeStats {
    pub frames_in: u64,
    pub frames_out: u64,
    pub malformed: u64,
}

// ---------------------------------------------------------------------------
// Bridge
// ---------------------------------------------------------------------------

/// Connects the JSON-lines host stream to the router and foreground monitor.
pub struct Bridge {
    router: ChannelRouter,
    monitor: ForegroundMonitor,
    audit: AuditSink,
}

impl Bridge {
    pub fn new(router: ChannelRouter, monitor: ForegroundMonitor, audit: AuditSink) -> Self {
        Self {
            router,
            monitor,
            audit,
        }
    }

    /// Handle one decoded frame. Calls produce a result frame; events do not.
    pub fn handle_frame(&self, frame: InboundFrame) -> Option<OutboundFrame> {
        match frame {
            InboundFrame::Call {
                id,
                channel,
                method,
                arguments,
            } => {
                let call = MethodCall::new(method, arguments);
                let outcome = self.router.dispatch(&channel, &call);
                if !outcome.is_success() {
                    self.audit_rejection(&id, &channel, &call, &outcome);
                }
                Some(OutboundFrame::Result { id, outcome })
            }
            InboundFrame::AccessibilityEvent(event) => {
                if let Some(decision) = self.monitor.on_accessibility_event(&event) {
                    self.audit.try_log(AuditEntry::new(
                        AuditEventType::ForegroundChanged,
                        AuditSource::new("foreground-monitor"),
                        serde_json::json!({
                            "application_id": decision.application_id,
                            "blocked": decision.is_blocked(),
                        }),
                    ));
                }
                None
            }
        }
    }

    fn audit_rejection(&self, id: &str, channel: &str, call: &MethodCall, outcome: &MethodOutcome) {
        let details = match outcome {
            MethodOutcome::Error { code, message, .. } => serde_json::json!({
                "method": call.method,
                "code": code,
                "message": message,
            }),
            _ => serde_json::json!({ "method": call.method, "code": "NOT_IMPLEMENTED" }),
        };
        self.audit.try_log(AuditEntry::new(
            AuditEventType::CallRejected,
            AuditSource::new("method-channel")
                .with_channel(channel)
                .with_call_id(id),
            details,
        ));
    }

    /// Read frames from `reader` until EOF or shutdown, writing results and
    /// relayed notifications to `writer`.
    ///
    /// Malformed lines are logged and skipped. Notifications raised while
    /// handling a frame are written right after that frame's result.
    pub async fn run<R, W>(
        &self,
        reader: R,
        mut writer: W,
        mut notices: broadcast::Receiver<Notification>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<BridgeStats>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();
        let mut stats = BridgeStats::default();

        loop {
            let line = tokio::select! {
                _ = shutdown.recv() => {
                    info!("bridge received shutdown signal");
                    break;
                }
                line = lines.next_line() => line.context("failed to read from host")?,
            };

            let Some(line) = line else {
                debug!("host closed input");
                break;
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            stats.frames_in += 1;
            match serde_json::from_str::<InboundFrame>(line) {
                Ok(frame) => {
                    if let Some(out) = self.handle_frame(frame) {
                        write_frame(&mut writer, &out).await?;
                        stats.frames_out += 1;
                    }
                }
                Err(err) => {
                    stats.malformed += 1;
                    warn!(%err, "skipping malformed frame");
                }
            }

            stats.frames_out += drain_notices(&mut notices, &mut writer).await?;
        }

        writer.flush().await.context("failed to flush host output")?;
        Ok(stats)
    }
}

async fn drain_notices<W>(
    notices: &mut broadcast::Receiver<Notification>,
    writer: &mut W,
) -> Result<u64>
where
    W: AsyncWrite + Unpin,
{
    let mut written = 0;
    loop {
        match notices.try_recv() {
            Ok(notice) => {
                write_frame(writer, &OutboundFrame::Invoke(notice)).await?;
                written += 1;
            }
            Err(TryRecvError::Lagged(skipped)) => {
                warn!(skipped, "notification receiver lagged");
            }
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return Ok(written),
        }
    }
}

async fn write_frame<W>(writer: &mut W, frame: &OutboundFrame) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut line = serde_json::to_vec(frame).context("failed to encode frame")?;
    line.push(b'\n');
    writer
        .write_all(&line)
        .await
        .context("failed to write to host")?;
    writer.flush().await.context("failed to flush host output")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use access_policy::{AccessPolicyEngine, RuleStore};
    use serde_json::{json, Value};

    use super::*;

    async fn bridge() -> (Bridge, broadcast::Receiver<Notification>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let (audit, _handle) = AuditSink::start(dir.path().join("audit.jsonl")).await.unwrap();
        let engine = Arc::new(AccessPolicyEngine::new(Arc::new(RuleStore::new())));
        let (tx, rx) = broadcast::channel(16);
        let monitor = ForegroundMonitor::new(Arc::clone(&engine), tx);
        let router = method_channel::default_router(engine);
        (Bridge::new(router, monitor, audit), rx, dir)
    }

    fn output_frames(buf: Vec<u8>) -> Vec<Value> {
        String::from_utf8(buf)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn inbound_frames_decode() {
        let frame: InboundFrame = serde_json::from_value(json!({
            "type": "call",
            "id": "1",
            "channel": "com.hugh.coughacks/rule_check",
            "method": "isAppBlocked",
            "arguments": {"app": "a.b.c"}
        }))
        .unwrap();
        assert!(matches!(frame, InboundFrame::Call { ref method, .. } if method == "isAppBlocked"));

        let frame: InboundFrame = serde_json::from_value(json!({
            "type": "accessibility_event",
            "event_type": "window_state_changed",
            "package_name": "com.x"
        }))
        .unwrap();
        assert_eq!(
            frame,
            InboundFrame::AccessibilityEvent(AccessibilityEvent::window_state_changed("com.x"))
        );
    }

    #[test]
    fn outbound_frames_encode() {
        let frame = OutboundFrame::Result {
            id: "9".to_string(),
            outcome: MethodOutcome::success(true),
        };
        assert_eq!(
            serde_json::to_value(&frame).unwrap(),
            json!({"type": "result", "id": "9", "outcome": {"status": "success", "value": true}})
        );

        let frame = OutboundFrame::Invoke(Notification {
            channel: "c".to_string(),
            method: "onAppOpened".to_string(),
            arguments: json!("com.x"),
        });
        assert_eq!(
            serde_json::to_value(&frame).unwrap(),
            json!({"type": "invoke", "channel": "c", "method": "onAppOpened", "arguments": "com.x"})
        );
    }

    #[tokio::test]
    async fn end_to_end_session() {
        let (bridge, notices, _dir) = bridge().await;
        let (_shutdown_tx, shutdown_rx) = broadcast::channel::<()>(1);

        let input = [
            r#"{"type":"call","id":"1","channel":"com.hugh.coughacks/rule_check","method":"isAppBlocked","arguments":{"app":"com.android.chrome"}}"#,
            r#"{"type":"call","id":"2","channel":"com.hugh.coughacks/app_monitor","method":"monitorApp","arguments":{"packageName":"a.b.c"}}"#,
            "",
            "this is not json",
            r#"{"type":"accessibility_event","event_type":"window_state_changed","package_name":"a.b.c"}"#,
            r#"{"type":"accessibility_event","event_type":"window_state_changed"}"#,
            r#"{"type":"call","id":"3","channel":"com.hugh.coughacks/rule_check","method":"isAppBlocked"}"#,
            r#"{"type":"call","id":"4","channel":"com.hugh.coughacks/rule_check","method":"nope","arguments":{}}"#,
        ]
        .join("\n");

        let mut output = Vec::new();
        let stats = bridge
            .run(input.as_bytes(), &mut output, notices, shutdown_rx)
            .await
            .unwrap();

        assert_eq!(
            stats,
            BridgeStats {
                frames_in: 7,
                frames_out: 5,
                malformed: 1
            }
        );

        let frames = output_frames(output);
        assert_eq!(frames[0]["id"], "1");
        assert_eq!(frames[0]["outcome"], json!({"status": "success", "value": true}));
        assert_eq!(frames[1]["outcome"]["value"], true);
        assert_eq!(
            frames[2],
            json!({
                "type": "invoke",
                "channel": "com.hugh.coughacks/app_monitor",
                "method": "onAppOpened",
                "arguments": "a.b.c"
            })
        );
        assert_eq!(frames[3]["id"], "3");
        assert_eq!(frames[3]["outcome"]["status"], "error");
        assert_eq!(frames[3]["outcome"]["code"], "INVALID_ARGUMENT");
        assert_eq!(frames[4]["outcome"], json!({"status": "not_implemented"}));
    }

    #[tokio::test]
    async fn shutdown_stops_the_loop() {
        let (bridge, notices, _dir) = bridge().await;
        let (shutdown_tx, shutdown_rx) = broadcast::channel::<()>(1);
        let (client, server) = tokio::io::duplex(1024);
        let (server_read, _server_write) = tokio::io::split(server);

        shutdown_tx.send(()).unwrap();
        let stats = bridge
            .run(
                tokio::io::BufReader::new(server_read),
                tokio::io::sink(),
                notices,
                shutdown_rx,
            )
            .await
            .unwrap();
        assert_eq!(stats, BridgeStats::default());
        drop(client);
    }
}
