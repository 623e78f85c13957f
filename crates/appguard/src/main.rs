mod bridge;
mod cli;
mod config;
mod observer;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::BufReader;
use tokio::sync::broadcast;
use tracing::{info, warn};

use access_policy::{AccessPolicyEngine, PolicyConfig, RuleStore, TracingObserver};
use audit_log::{AuditEntry, AuditEventType, AuditSink, AuditSource};
use method_channel::{default_router, ForegroundMonitor, Notification};

use crate::bridge::Bridge;
use crate::cli::Cli;
use crate::observer::AuditObserver;

/// Capacity of the notification channel between the foreground monitor and
/// the bridge writer.
const NOTICE_BUFFER: usize = 64;

fn main() -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;

    let result = runtime.block_on(run());

    // A pending stdin read on the blocking pool cannot be cancelled.
    // Do not wait for it, or a signal will not end the process while the
    // host holds the pipe open.
    runtime.shutdown_background();
    result
}

async fn run() -> Result<()> {
    // 1. Parse CLI args, load config, merge overrides.
    let cli = Cli::parse();
    let mut cfg = config::load(&cli.config)?;
    cfg.merge_cli(&cli);

    // 2. JSON tracing on stderr; stdout carries bridge frames.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cfg.logging.level));

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_writer(std::io::stderr)
        .init();

    info!(
        config_file = %cli.config.display(),
        policy_file = ?cfg.policy_file,
        audit_log = %cfg.logging.audit_log_path.display(),
        "appguard starting"
    );

    // 3. Audit trail.
    let (audit, audit_handle) = AuditSink::start(&cfg.logging.audit_log_path)
        .await
        .context("failed to start audit logger")?;

    audit
        .log(AuditEntry::new(
            AuditEventType::ProcessStarted,
            AuditSource::new("appguard"),
            serde_json::json!({
                "version": env!("CARGO_PKG_VERSION"),
                "config_file": cli.config.display().to_string(),
            }),
        ))
        .await;

    // 4. Policy and engine. The rule store always starts empty.
    let policy = match &cfg.policy_file {
        Some(path) => {
            access_policy::loader::load_policy(path).context("failed to load policy file")?
        }
        None => PolicyConfig::default(),
    };
    let store = Arc::new(RuleStore::new());
    let engine = AccessPolicyEngine::with_config(store, &policy)
        .context("failed to initialize access policy engine")?
        .with_observer(Arc::new(TracingObserver))
        .with_observer(Arc::new(AuditObserver::new(audit.clone())));
    let engine = Arc::new(engine);

    info!(?engine, "access policy engine ready");

    audit
        .log(AuditEntry::new(
            AuditEventType::PolicyLoaded,
            AuditSource::new("appguard"),
            serde_json::json!({
                "policy_file": cfg.policy_file.as_ref().map(|p| p.display().to_string()),
                "rules": engine.rule_names(),
            }),
        ))
        .await;

    // 5. Endpoint, monitor and bridge.
    let (notice_tx, notice_rx) = broadcast::channel::<Notification>(NOTICE_BUFFER);
    let monitor = ForegroundMonitor::new(Arc::clone(&engine), notice_tx);
    let router = default_router(Arc::clone(&engine));
    info!(?router, "method channels registered");
    let bridge = Bridge::new(router, monitor, audit.clone());

    // 6. Shutdown on ctrl-c or SIGTERM.
    let (shutdown_tx, shutdown_rx) = broadcast::channel::<()>(1);
    tokio::spawn(async move {
        wait_for_signal().await;
        let _ = shutdown_tx.send(());
    });

    // 7. Serve until the host closes stdin or a signal arrives.
    let result = bridge
        .run(
            BufReader::new(tokio::io::stdin()),
            tokio::io::stdout(),
            notice_rx,
            shutdown_rx,
        )
        .await;

    info!(?result, "appguard shutting down");

    audit
        .log(AuditEntry::new(
            AuditEventType::ProcessStopped,
            AuditSource::new("appguard"),
            serde_json::json!({
                "result": format!("{:?}", result),
                "blocked_count": engine.store().len(),
            }),
        ))
        .await;

    // Every sink clone must be gone before the writer task can finish.
    drop(bridge);
    drop(engine);
    drop(audit);
    if let Err(err) = audit_handle.await {
        warn!(%err, "audit writer task failed");
    }

    result.map(|_| ())
}

async fn wait_for_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("received SIGINT (ctrl-c)"),
                    _ = sigterm.recv() => info!("received SIGTERM"),
                }
            }
            Err(err) => {
                warn!(%err, "failed to register SIGTERM handler; listening for ctrl-c only");
                ctrl_c.await.ok();
                info!("received SIGINT (ctrl-c)");
            }
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("received SIGINT (ctrl-c)");
    }
}
