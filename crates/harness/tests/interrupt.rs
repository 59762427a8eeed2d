//! Ctrl-C handling while the crawler runs
//!
//! SIGINT is sent to the test process itself. These tests live in their own
//! binary so no unrelated test sees the signal.

#![cfg(unix)]

use std::fs;
use std::time::{Duration, Instant};

use crawlprobe_common::{
    DiagnosticKind, HarnessConfig, Invocation, LocatorConfig, Verdict, INTERRUPTED_EXIT_CODE,
};
use crawlprobe_harness::{Harness, HarnessState, ModuleProbe, ProcessRunner};
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use tokio::signal::unix::{signal, SignalKind};
use tokio::task::JoinHandle;

struct NoModule;

impl ModuleProbe for NoModule {
    fn is_importable(&self, _module: &str) -> bool {
        false
    }
}

/// Keep sending SIGINT to this process until aborted.
///
/// A listener is registered first, so the default disposition never
/// terminates the test binary.
fn keep_interrupting() -> JoinHandle<()> {
    let guard = signal(SignalKind::interrupt()).unwrap();
    tokio::spawn(async move {
        let _guard = guard;
        loop {
            tokio::time::sleep(Duration::from_millis(200)).await;
            let _ = kill(Pid::this(), Signal::SIGINT);
        }
    })
}

#[tokio::test]
async fn ctrl_c_stops_the_crawler_group() {
    let sender = keep_interrupting();
    let invocation = Invocation {
        executable: "sh".to_string(),
        arguments: vec!["-c".to_string(), "echo started; sleep 30".to_string()],
    };

    let start = Instant::now();
    let result = ProcessRunner::new(std::env::temp_dir())
        .run(&invocation, Duration::from_secs(60))
        .await
        .unwrap();
    sender.abort();

    assert!(start.elapsed() < Duration::from_secs(15));
    assert!(result.interrupted);
    assert!(!result.timed_out);
    assert_eq!(result.exit_code, INTERRUPTED_EXIT_CODE);
    assert_eq!(result.stdout_lines, vec!["started"]);
}

#[tokio::test]
async fn ctrl_c_during_the_crawl_is_inconclusive() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("fake_tool.sh"),
        "echo started\nsleep 30\ntouch LATE_WRITE\n",
    )
    .unwrap();
    let config = HarnessConfig {
        working_dir: dir.path().to_path_buf(),
        interpreter: "sh".to_string(),
        timeout_secs: 60,
        locator: LocatorConfig {
            candidate_paths: vec!["fake_tool.sh".to_string()],
            ..LocatorConfig::default()
        },
        ..HarnessConfig::default()
    };

    let sender = keep_interrupting();
    let report = Harness::new(config).with_probe(NoModule).run().await.unwrap();
    sender.abort();

    assert_eq!(report.verdict, Verdict::Inconclusive);
    assert!(report.has_diagnostic(DiagnosticKind::ProcessInterrupted));
    assert!(!report.has_diagnostic(DiagnosticKind::ProcessTimeout));
    assert!(report.execution.as_ref().unwrap().interrupted);
    assert!(!report.states.contains(&HarnessState::Validated));

    // Nothing in the group survives to finish the script
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(!dir.path().join("LATE_WRITE").exists());
}
