#![cfg(unix)]

use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

fn spawn_appguard(dir: &Path) -> Child {
    Command::new(env!("CARGO_BIN_EXE_appguard"))
        .arg("--config")
        .arg(dir.join("missing.yaml"))
        .arg("--audit-log")
        .arg(dir.join("audit.jsonl"))
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .unwrap()
}

fn wait_for_audit_event(path: &Path, event: &str, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    let needle = format!("\"event_type\":\"{event}\"");
    while Instant::now() < deadline {
        if std::fs::read_to_string(path).is_ok_and(|s| s.contains(&needle)) {
            return true;
        }
        std::thread::sleep(Duration::from_millis(50));
    }
    false
}

#[test]
fn sigterm_exits_while_host_keeps_stdin_open() {
    let dir = tempfile::tempdir().unwrap();
    let audit = dir.path().join("audit.jsonl");
    let mut child = spawn_appguard(dir.path());
    let _stdin = child.stdin.take().unwrap();

    assert!(
        wait_for_audit_event(&audit, "policy_loaded", Duration::from_secs(10)),
        "appguard never finished starting"
    );
    // Let the signal task install its handlers.
    std::thread::sleep(Duration::from_millis(300));

    let status = Command::new("kill")
        .arg("-TERM")
        .arg(child.id().to_string())
        .status()
        .unwrap();
    assert!(status.success());

    let deadline = Instant::now() + Duration::from_secs(10);
    let exit = loop {
        if let Some(exit) = child.try_wait().unwrap() {
            break Some(exit);
        }
        if Instant::now() >= deadline {
            break None;
        }
        std::thread::sleep(Duration::from_millis(50));
    };

    if exit.is_none() {
        child.kill().ok();
        child.wait().ok();
        panic!("appguard still running after SIGTERM with stdin open");
    }

    assert!(wait_for_audit_event(
        &audit,
        "process_stopped",
        Duration::from_secs(1)
    ));
}
