//! Open the exported workbook in the system viewer

use std::io::{BufRead, IsTerminal, Write};
use std::path::Path;
use std::process::{Command, Stdio};

use crawlprobe_harness::{HarnessError, HarnessReport, HarnessResult, PostRunHook};
use tracing::{debug, info};

/// Post-run hook that offers to open the artifact
pub struct OpenArtifactHook {
    assume_yes: bool,
}

impl OpenArtifactHook {
    pub fn new(assume_yes: bool) -> Self {
        Self { assume_yes }
    }

    fn confirm(&self, report: &HarnessReport) -> bool {
        if self.assume_yes {
            return true;
        }
        if !std::io::stdin().is_terminal() {
            debug!("stdin is not a terminal, not asking to open the workbook");
            return false;
        }

        ask(
            &mut std::io::stderr(),
            &mut std::io::stdin().lock(),
            &format!("Verdict is {}. Open {} now? [y/N] ", report.verdict, report.artifact_path),
        )
    }
}

/// Write `question` to `prompt` and read a yes/no answer from `input`
fn ask(prompt: &mut impl Write, input: &mut impl BufRead, question: &str) -> bool {
    if write!(prompt, "{}", question).and_then(|_| prompt.flush()).is_err() {
        return false;
    }
    let mut answer = String::new();
    if input.read_line(&mut answer).is_err() {
        return false;
    }
    is_yes(&answer)
}

impl PostRunHook for OpenArtifactHook {
    fn on_favorable(&self, report: &HarnessReport) -> HarnessResult<()> {
        if !self.confirm(report) {
            return Ok(());
        }

        let path = Path::new(&report.artifact_path);
        let (program, args) = opener();
        info!("Opening {} with {}", path.display(), program);
        Command::new(program)
            .args(args)
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map(|_| ())
            .map_err(|e| HarnessError::io(path, e))
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes" | "s" | "sim")
}

/// Platform viewer launcher and its leading arguments
fn opener() -> (&'static str, &'static [&'static str]) {
    const NO_ARGS: &[&str] = &[];
    const WINDOWS_START: &[&str] = &["/C", "start", ""];

    if cfg!(target_os = "macos") {
        ("open", NO_ARGS)
    } else if cfg!(windows) {
        ("cmd", WINDOWS_START)
    } else {
        ("xdg-open", NO_ARGS)
    }
}
