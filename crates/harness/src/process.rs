//! Process runner - spawning the crawler under a wall-clock limit

use std::future::Future;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};

use crawlprobe_common::{ExecutionResult, Invocation, INTERRUPTED_EXIT_CODE, TIMEOUT_EXIT_CODE};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, trace, warn};

use crate::error::{HarnessError, HarnessResult};

/// Time the process group gets between SIGTERM and SIGKILL
const TERM_GRACE: Duration = Duration::from_millis(500);

/// Time reader tasks get to drain the pipes once the child is gone
const READER_GRACE: Duration = Duration::from_secs(2);

/// How the wait on the child ended
enum WaitOutcome {
    Exited(std::io::Result<ExitStatus>),
    TimedOut,
    Interrupted,
}

/// Runs one invocation and captures its output
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    working_dir: PathBuf,
}

impl ProcessRunner {
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
        }
    }

    /// Run `invocation` and wait at most `limit` for it to finish.
    ///
    /// Only a spawn or wait failure is an error. A timeout yields a result with
    /// `timed_out` set and the sentinel exit code, keeping whatever output was
    /// produced before termination. Ctrl-C terminates the process group the
    /// same way and yields `interrupted`.
    pub async fn run(&self, invocation: &Invocation, limit: Duration) -> HarnessResult<ExecutionResult> {
        self.run_until(invocation, limit, interrupt_signal()).await
    }

    /// Like [`ProcessRunner::run`], with `interrupt` standing in for Ctrl-C
    pub async fn run_until<F>(
        &self,
        invocation: &Invocation,
        limit: Duration,
        interrupt: F,
    ) -> HarnessResult<ExecutionResult>
    where
        F: Future<Output = ()>,
    {
        let command_line = invocation.command_line();
        info!("Running `{}` (timeout {:?})", command_line, limit);

        let mut cmd = Command::new(&invocation.executable);
        cmd.args(&invocation.arguments)
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // Own process group, so termination reaches anything the crawler forks
        #[cfg(unix)]
        cmd.process_group(0);

        let started = Instant::now();
        let mut child = cmd.spawn().map_err(|source| HarnessError::Spawn {
            command: command_line.clone(),
            source,
        })?;

        let (stdout_tx, stdout_rx) = mpsc::unbounded_channel();
        let (stderr_tx, stderr_rx) = mpsc::unbounded_channel();
        let mut readers = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            readers.push(tokio::spawn(forward_lines(stdout, stdout_tx, "stdout")));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(tokio::spawn(forward_lines(stderr, stderr_tx, "stderr")));
        }

        let outcome = tokio::select! {
            status = child.wait() => WaitOutcome::Exited(status),
            _ = tokio::time::sleep(limit) => WaitOutcome::TimedOut,
            _ = interrupt => WaitOutcome::Interrupted,
        };

        let (exit_code, timed_out, interrupted) = match outcome {
            WaitOutcome::Exited(Ok(status)) => (exit_code(status), false, false),
            WaitOutcome::Exited(Err(source)) => {
                return Err(HarnessError::Wait {
                    command: command_line,
                    source,
                })
            }
            WaitOutcome::TimedOut => {
                warn!("`{}` exceeded {:?}, terminating", command_line, limit);
                terminate(&mut child).await;
                (TIMEOUT_EXIT_CODE, true, false)
            }
            WaitOutcome::Interrupted => {
                warn!("Interrupted, terminating `{}`", command_line);
                terminate(&mut child).await;
                (INTERRUPTED_EXIT_CODE, false, true)
            }
        };
        let duration = started.elapsed();

        join_readers(readers).await;

        let result = ExecutionResult {
            exit_code,
            stdout_lines: drain(stdout_rx),
            stderr_lines: drain(stderr_rx),
            duration_seconds: duration.as_secs_f64(),
            timed_out,
            interrupted,
        };

        debug!(
            "Process finished: exit={} stdout={} stderr={} lines in {:.2}s",
            result.exit_code,
            result.stdout_lines.len(),
            result.stderr_lines.len(),
            result.duration_seconds
        );
        Ok(result)
    }
}

/// Resolves on Ctrl-C; never resolves when the handler cannot be installed
async fn interrupt_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Cannot listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}

async fn forward_lines<R>(reader: R, tx: UnboundedSender<String>, stream: &'static str)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                let line = line.trim_end_matches(['\n', '\r']);
                trace!("[{}] {}", stream, line);
                if tx.send(line.to_string()).is_err() {
                    break;
                }
            }
            Err(e) => {
                debug!("Stopped reading {}: {}", stream, e);
                break;
            }
        }
    }
}

/// Wait for the readers up to a shared deadline, then abandon the stragglers
async fn join_readers(readers: Vec<JoinHandle<()>>) {
    let deadline = tokio::time::Instant::now() + READER_GRACE;
    for mut reader in readers {
        if tokio::time::timeout_at(deadline, &mut reader).await.is_err() {
            warn!("Output pipe still open after the process ended, abandoning reader");
            reader.abort();
        }
    }
}

fn drain(mut rx: UnboundedReceiver<String>) -> Vec<String> {
    let mut lines = Vec::new();
    while let Ok(line) = rx.try_recv() {
        lines.push(line);
    }
    lines
}

async fn terminate(child: &mut Child) {
    #[cfg(unix)]
    {
        use nix::sys::signal::{killpg, Signal};
        use nix::unistd::Pid;

        if let Some(pid) = child.id() {
            let group = Pid::from_raw(pid as i32);
            if killpg(group, Signal::SIGTERM).is_ok() {
                let _ = timeout(TERM_GRACE, child.wait()).await;
            }
            // Leftover group members get no second chance
            let _ = killpg(group, Signal::SIGKILL);
        }
    }

    if let Err(e) = child.kill().await {
        debug!("Kill after termination: {}", e);
    }
}

fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    -1
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn shell(script: &str) -> Invocation {
        Invocation {
            executable: "sh".to_string(),
            arguments: vec!["-c".to_string(), script.to_string()],
        }
    }

    fn runner() -> ProcessRunner {
        ProcessRunner::new(std::env::temp_dir())
    }

    #[tokio::test]
    async fn test_captures_streams_and_exit_code() {
        let result = runner()
            .run(&shell("echo out1; echo err1 >&2; echo out2; exit 3"), Duration::from_secs(10))
            .await
            .unwrap();

        assert_eq!(result.exit_code, 3);
        assert!(!result.timed_out);
        assert!(!result.succeeded());
        assert_eq!(result.stdout_lines, vec!["out1", "out2"]);
        assert_eq!(result.stderr_lines, vec!["err1"]);
    }

    #[tokio::test]
    async fn test_timeout_returns_sentinel_with_partial_output() {
        let start = Instant::now();
        let result = runner()
            .run(&shell("echo started; sleep 30"), Duration::from_millis(500))
            .await
            .unwrap();

        assert!(result.timed_out);
        assert_eq!(result.exit_code, TIMEOUT_EXIT_CODE);
        assert_eq!(result.stdout_lines, vec!["started"]);
        assert!(start.elapsed() < Duration::from_secs(10));
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_duration_stops_at_termination() {
        // setsid leaves the group but keeps stdout open, so the readers wait out their grace.
        let start = Instant::now();
        let result = runner()
            .run(&shell("setsid sleep 5 & sleep 30"), Duration::from_millis(300))
            .await
            .unwrap();

        assert!(result.timed_out);
        assert!(start.elapsed() >= READER_GRACE);
        assert!(result.duration_seconds < READER_GRACE.as_secs_f64());
    }

    #[tokio::test]
    async fn test_interrupt_terminates_and_keeps_output() {
        let start = Instant::now();
        let result = runner()
            .run_until(
                &shell("echo started; sleep 30"),
                Duration::from_secs(30),
                tokio::time::sleep(Duration::from_millis(300)),
            )
            .await
            .unwrap();

        assert!(result.interrupted);
        assert!(!result.timed_out);
        assert!(!result.succeeded());
        assert_eq!(result.exit_code, INTERRUPTED_EXIT_CODE);
        assert_eq!(result.stdout_lines, vec!["started"]);
        assert!(start.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_exit_before_interrupt_is_a_normal_exit() {
        let result = runner()
            .run_until(&shell("exit 0"), Duration::from_secs(10), std::future::pending())
            .await
            .unwrap();
        assert!(!result.interrupted);
        assert!(result.succeeded());
    }

    #[tokio::test]
    async fn test_spawn_failure_is_an_error() {
        let invocation = Invocation {
            executable: "/nonexistent/crawler-binary".to_string(),
            arguments: vec![],
        };
        let err = runner().run(&invocation, Duration::from_secs(1)).await.unwrap_err();
        match err {
            HarnessError::Spawn { command, .. } => assert!(command.contains("crawler-binary")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_signal_exit_maps_above_128() {
        let result = runner().run(&shell("kill -9 $$"), Duration::from_secs(10)).await.unwrap();
        assert_eq!(result.exit_code, 137);
        assert!(!result.timed_out);
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_decoded_lossily() {
        let result = runner()
            .run(&shell(r"printf 'ok\377done\n'"), Duration::from_secs(10))
            .await
            .unwrap();
        assert_eq!(result.stdout_lines.len(), 1);
        assert!(result.stdout_lines[0].starts_with("ok"));
        assert!(result.stdout_lines[0].ends_with("done"));
        assert!(result.stdout_lines[0].contains('\u{FFFD}'));
    }

    #[tokio::test]
    async fn test_runs_in_working_dir() {
        let dir = tempfile::tempdir().unwrap();
        let result = ProcessRunner::new(dir.path())
            .run(&shell("pwd -P"), Duration::from_secs(10))
            .await
            .unwrap();
        let expected = dir.path().canonicalize().unwrap();
        assert_eq!(result.stdout_lines, vec![expected.display().to_string()]);
    }
}
