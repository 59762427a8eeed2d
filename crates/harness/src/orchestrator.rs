//! Harness orchestrator that drives locate, run and validate

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use crawlprobe_common::{
    Candidate, Diagnostic, DiagnosticKind, ExecutionResult, HarnessConfig, Invocation,
    TargetConfig, Verdict, WorkbookReport, WorkbookValidator,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::error::{HarnessError, HarnessResult};
use crate::hook::PostRunHook;
use crate::locator::{InterpreterProbe, Locator, ModuleProbe};
use crate::process::ProcessRunner;

/// File name of the JSON report written by [`HarnessReport::write_json`]
pub const REPORT_FILE_NAME: &str = "crawlprobe-report.json";

/// Pipeline states, recorded in the order they are reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "verdict", rename_all = "snake_case")]
pub enum HarnessState {
    Idle,
    Located,
    Executed,
    Validated,
    Reported(Verdict),
}

impl fmt::Display for HarnessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HarnessState::Idle => write!(f, "idle"),
            HarnessState::Located => write!(f, "located"),
            HarnessState::Executed => write!(f, "executed"),
            HarnessState::Validated => write!(f, "validated"),
            HarnessState::Reported(verdict) => write!(f, "reported({})", verdict),
        }
    }
}

/// Everything a human needs to diagnose a run without re-running it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarnessReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub target: TargetConfig,
    pub artifact_path: String,
    pub log_path: String,
    pub candidate: Option<Candidate>,
    pub invocation: Option<Invocation>,
    pub execution: Option<ExecutionResult>,
    pub workbook: Option<WorkbookReport>,
    pub log_file_present: bool,
    pub states: Vec<HarnessState>,
    pub diagnostics: Vec<Diagnostic>,
    pub verdict: Verdict,
}

impl HarnessReport {
    fn begin(config: &HarnessConfig, artifact: &Path, log: &Path) -> Self {
        let now = Utc::now();
        Self {
            started_at: now,
            finished_at: now,
            target: config.target.clone(),
            artifact_path: artifact.display().to_string(),
            log_path: log.display().to_string(),
            candidate: None,
            invocation: None,
            execution: None,
            workbook: None,
            log_file_present: false,
            states: vec![HarnessState::Idle],
            diagnostics: Vec::new(),
            verdict: Verdict::Inconclusive,
        }
    }

    pub fn has_diagnostic(&self, kind: DiagnosticKind) -> bool {
        self.diagnostics.iter().any(|d| d.kind == kind)
    }

    fn diagnose(&mut self, kind: DiagnosticKind, message: impl Into<String>) {
        let diagnostic = Diagnostic::new(kind, message);
        warn!("{}: {}", diagnostic.kind, diagnostic.message);
        self.diagnostics.push(diagnostic);
    }

    /// Write the report as pretty JSON into `dir`
    pub fn write_json(&self, dir: &Path) -> HarnessResult<PathBuf> {
        std::fs::create_dir_all(dir).map_err(|e| HarnessError::io(dir, e))?;

        let path = dir.join(REPORT_FILE_NAME);
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, json).map_err(|e| HarnessError::io(&path, e))?;

        info!("Report written to: {}", path.display());
        Ok(path)
    }
}

/// Verification harness for one crawl run
pub struct Harness {
    config: HarnessConfig,
    probe: Arc<dyn ModuleProbe>,
    hook: Option<Box<dyn PostRunHook>>,
}

impl Harness {
    pub fn new(config: HarnessConfig) -> Self {
        let probe = Arc::new(InterpreterProbe::new(config.interpreter.clone()));
        Self {
            config,
            probe,
            hook: None,
        }
    }

    /// Replace the import probe used as the locator's last resort
    pub fn with_probe(mut self, probe: impl ModuleProbe + 'static) -> Self {
        self.probe = Arc::new(probe);
        self
    }

    /// Install a hook that runs after favorable verdicts
    pub fn with_hook(mut self, hook: impl PostRunHook + 'static) -> Self {
        self.hook = Some(Box::new(hook));
        self
    }

    /// Run the full pipeline.
    ///
    /// Every crawler-side failure becomes a verdict plus diagnostics. Only
    /// environment failures (invalid configuration, filesystem errors, an
    /// interpreter that cannot be spawned) are returned as errors.
    pub async fn run(&self) -> HarnessResult<HarnessReport> {
        self.config.validate()?;

        let artifact = self.config.resolved_artifact_path();
        let log = self.config.resolved_log_path();
        let mut report = HarnessReport::begin(&self.config, &artifact, &log);

        clear_previous(&artifact)?;
        clear_previous(&log)?;

        // Idle -> Located
        let locator = Locator::new(
            self.config.locator.clone(),
            self.config.module_name.clone(),
            Arc::clone(&self.probe),
        );
        let base_dir = self.config.working_dir.clone();
        let located = tokio::task::spawn_blocking(move || locator.locate(&base_dir)).await?;
        let Some(candidate) = located else {
            report.diagnose(
                DiagnosticKind::LocatorExhausted,
                format!(
                    "no entry point under {}: {} conventional path(s), keyword search and import of '{}' all failed",
                    self.config.working_dir.display(),
                    self.config.locator.candidate_paths.len(),
                    self.config.module_name
                ),
            );
            return self.finish(report, Verdict::Inconclusive);
        };
        report.states.push(HarnessState::Located);

        // Located -> Executed
        let invocation = self.config.invocation(&candidate);
        report.candidate = Some(candidate);
        let execution = ProcessRunner::new(&self.config.working_dir)
            .run(&invocation, self.config.timeout())
            .await?;
        report.states.push(HarnessState::Executed);

        let stopped = execution.timed_out || execution.interrupted;
        if execution.interrupted {
            report.diagnose(
                DiagnosticKind::ProcessInterrupted,
                format!(
                    "`{}` was stopped by an interrupt; kept {} stdout and {} stderr line(s)",
                    invocation.command_line(),
                    execution.stdout_lines.len(),
                    execution.stderr_lines.len()
                ),
            );
        } else if execution.timed_out {
            report.diagnose(
                DiagnosticKind::ProcessTimeout,
                format!(
                    "`{}` exceeded {}s; kept {} stdout and {} stderr line(s)",
                    invocation.command_line(),
                    self.config.timeout_secs,
                    execution.stdout_lines.len(),
                    execution.stderr_lines.len()
                ),
            );
        } else if execution.exit_code != 0 {
            report.diagnose(
                DiagnosticKind::ProcessFailed,
                format!("`{}` exited with code {}", invocation.command_line(), execution.exit_code),
            );
        }
        report.invocation = Some(invocation);
        report.execution = Some(execution);
        report.log_file_present = log.is_file();

        if stopped {
            return self.finish(report, Verdict::Inconclusive);
        }

        // Executed -> Validated
        if !artifact.is_file() {
            report.diagnose(
                DiagnosticKind::ArtifactMissing,
                format!("no artifact at {} after the crawl", artifact.display()),
            );
            return self.finish(report, Verdict::Inconclusive);
        }

        let validator = WorkbookValidator::new(self.config.sheets.clone(), self.config.signatures.clone());
        let workbook = match validator.validate(&artifact) {
            Ok(workbook) => workbook,
            Err(e) => {
                report.states.push(HarnessState::Validated);
                report.diagnose(DiagnosticKind::ArtifactUnreadable, e.to_string());
                return self.finish(report, Verdict::Problems);
            }
        };
        report.states.push(HarnessState::Validated);

        // Validated -> Reported
        let verdict = Verdict::classify(&workbook);
        if let Some(message) = mismatch_message(&workbook, verdict) {
            report.diagnose(DiagnosticKind::StructuralMismatch, message);
        }
        let missing = workbook.missing_parsers();
        if !missing.is_empty() {
            debug!("Parsers without matching columns: {}", missing.join(", "));
        }
        report.workbook = Some(workbook);

        self.finish(report, verdict)
    }

    fn finish(&self, mut report: HarnessReport, verdict: Verdict) -> HarnessResult<HarnessReport> {
        report.verdict = verdict;
        report.states.push(HarnessState::Reported(verdict));
        report.finished_at = Utc::now();
        info!("Verdict: {}", verdict);

        if let Some(dir) = &self.config.report_dir {
            report.write_json(&self.config.working_dir.join(dir))?;
        }

        if verdict.is_favorable() {
            if let Some(hook) = &self.hook {
                if let Err(e) = hook.on_favorable(&report) {
                    error!("Post-run hook failed: {}", e);
                }
            }
        }

        Ok(report)
    }
}

/// Remove a file left by an earlier run; absence is fine
fn clear_previous(path: &Path) -> HarnessResult<()> {
    match std::fs::remove_file(path) {
        Ok(()) => {
            debug!("Removed stale {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(HarnessError::io(path, e)),
    }
}

fn mismatch_message(workbook: &WorkbookReport, verdict: Verdict) -> Option<String> {
    let sheets = workbook.sheet_names.join(", ");
    match verdict {
        Verdict::Success | Verdict::Inconclusive => None,
        Verdict::Partial => Some(format!("no redirect sheet among [{}]", sheets)),
        Verdict::Problems => Some(match &workbook.main_data_sheet_name {
            None => format!("no main data sheet among [{}]", sheets),
            Some(name) => format!("main data sheet '{}' has no data rows", name),
        }),
    }
}
