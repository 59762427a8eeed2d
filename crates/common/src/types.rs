//! Core types for crawlprobe

use std::collections::BTreeSet;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::config::TargetConfig;

/// Exit code reported for a process the runner had to terminate.
///
/// Real processes report 0..=255 on Unix (or `128 + signal` as mapped by the
/// runner), so `i32::MIN` can never collide with an observed code.
pub const TIMEOUT_EXIT_CODE: i32 = i32::MIN;

/// Exit code reported for a process terminated because the harness was interrupted
pub const INTERRUPTED_EXIT_CODE: i32 = i32::MIN + 1;

// ============================================================================
// Entry point candidates
// ============================================================================

/// How a candidate entry point is started
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateKind {
    /// A script file run through the interpreter
    FileScript,
    /// A module importable by the interpreter (`-m <module>`)
    PackageModule,
}

impl std::fmt::Display for CandidateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CandidateKind::FileScript => write!(f, "file script"),
            CandidateKind::PackageModule => write!(f, "package module"),
        }
    }
}

/// Ordinal confidence of a candidate; higher wins
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Confidence(pub u32);

impl Confidence {
    /// Recursive search hit whose name contains a preferred keyword
    pub const SEARCH_PREFERRED: Confidence = Confidence(20);
    /// Recursive search hit matching only a plain keyword
    pub const SEARCH_KEYWORD: Confidence = Confidence(10);
    /// Importable module, the last resort
    pub const MODULE: Confidence = Confidence(0);

    const CONVENTIONAL_TOP: u32 = 1_000;

    /// Confidence for the conventional path at `index` in the ordered list.
    ///
    /// Always above every search confidence.
    pub fn conventional(index: usize) -> Confidence {
        let floor = Self::SEARCH_PREFERRED.0 + 1;
        let index = u32::try_from(index).unwrap_or(u32::MAX);
        Confidence(Self::CONVENTIONAL_TOP.saturating_sub(index).max(floor))
    }
}

/// A located entry point for the crawler
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    /// File path (for scripts) or module name (for packages)
    pub path: String,
    pub kind: CandidateKind,
    pub confidence: Confidence,
}

// ============================================================================
// Invocation
// ============================================================================

/// A fully built command line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invocation {
    pub executable: String,
    pub arguments: Vec<String>,
}

impl Invocation {
    /// Build the crawl invocation for a candidate and the fixed target parameters
    pub fn for_candidate(candidate: &Candidate, interpreter: &str, target: &TargetConfig) -> Self {
        let mut arguments = match candidate.kind {
            CandidateKind::FileScript => vec![candidate.path.clone()],
            CandidateKind::PackageModule => vec!["-m".to_string(), candidate.path.clone()],
        };
        arguments.extend([
            target.host.clone(),
            "--max-urls".to_string(),
            target.max_urls.to_string(),
            "--workers".to_string(),
            target.workers.to_string(),
        ]);
        arguments.extend(target.extra_args.iter().cloned());

        Self {
            executable: interpreter.to_string(),
            arguments,
        }
    }

    /// Shell-quoted rendering for logs and reports
    pub fn command_line(&self) -> String {
        let mut parts = Vec::with_capacity(self.arguments.len() + 1);
        parts.push(shell_quote(&self.executable));
        parts.extend(self.arguments.iter().map(|arg| shell_quote(arg)));
        parts.join(" ")
    }
}

fn shell_quote(arg: &str) -> String {
    if arg.is_empty() {
        return "''".to_string();
    }
    let safe = arg.chars().all(|ch| {
        matches!(
            ch,
            'a'..='z' | 'A'..='Z' | '0'..='9' | '_' | '-' | '.' | '/' | ':' | '@' | '+' | '='
        )
    });
    if safe {
        return arg.to_string();
    }
    format!("'{}'", arg.replace('\'', "'\"'\"'"))
}

// ============================================================================
// Execution
// ============================================================================

/// Outcome of running one invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub exit_code: i32,
    pub stdout_lines: Vec<String>,
    pub stderr_lines: Vec<String>,
    pub duration_seconds: f64,
    pub timed_out: bool,
    /// Terminated because the harness received an interrupt
    #[serde(default)]
    pub interrupted: bool,
}

impl ExecutionResult {
    pub fn succeeded(&self) -> bool {
        !self.timed_out && !self.interrupted && self.exit_code == 0
    }

    /// Last `n` lines of a captured stream
    pub fn tail(lines: &[String], n: usize) -> &[String] {
        &lines[lines.len().saturating_sub(n)..]
    }
}

// ============================================================================
// Workbook report
// ============================================================================

/// Matched versus expected columns for one parser signature
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SignatureHit {
    pub matched: BTreeSet<String>,
    pub expected: BTreeSet<String>,
}

impl SignatureHit {
    /// A parser counts as present when at least one expected column was seen
    pub fn is_present(&self) -> bool {
        !self.matched.is_empty()
    }
}

/// Structural summary of a crawl workbook
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WorkbookReport {
    pub path: String,
    pub sheet_names: Vec<String>,
    pub has_redirect_sheet: bool,
    pub redirect_sheet_name: Option<String>,
    pub main_data_sheet_name: Option<String>,
    pub row_count: usize,
    pub column_names: BTreeSet<String>,
    pub parser_signature_hits: IndexMap<String, SignatureHit>,
}

impl WorkbookReport {
    /// Record the redirect sheet; keeps the flag and the name in step
    pub fn set_redirect_sheet(&mut self, name: Option<String>) {
        self.has_redirect_sheet = name.is_some();
        self.redirect_sheet_name = name;
    }

    /// Whether a main data sheet was found and holds at least one row
    pub fn has_data_rows(&self) -> bool {
        self.main_data_sheet_name.is_some() && self.row_count > 0
    }

    /// Names of parsers whose signature matched at least one column
    pub fn present_parsers(&self) -> Vec<&str> {
        self.parser_signature_hits
            .iter()
            .filter(|(_, hit)| hit.is_present())
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Names of parsers with no matching column
    pub fn missing_parsers(&self) -> Vec<&str> {
        self.parser_signature_hits
            .iter()
            .filter(|(_, hit)| !hit.is_present())
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

// ============================================================================
// Verdict and diagnostics
// ============================================================================

/// Final structural judgment of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Success,
    Partial,
    Problems,
    Inconclusive,
}

impl Verdict {
    /// Classify a workbook report. Total over every report.
    pub fn classify(report: &WorkbookReport) -> Verdict {
        match (report.has_data_rows(), report.has_redirect_sheet) {
            (true, true) => Verdict::Success,
            (true, false) => Verdict::Partial,
            (false, _) => Verdict::Problems,
        }
    }

    pub fn is_favorable(&self) -> bool {
        matches!(self, Verdict::Success | Verdict::Partial)
    }

    /// Process exit code for unattended use; only `Success` is zero
    pub fn exit_code(&self) -> i32 {
        match self {
            Verdict::Success => 0,
            Verdict::Partial => 1,
            Verdict::Problems => 2,
            Verdict::Inconclusive => 3,
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Verdict::Success => write!(f, "success"),
            Verdict::Partial => write!(f, "partial"),
            Verdict::Problems => write!(f, "problems"),
            Verdict::Inconclusive => write!(f, "inconclusive"),
        }
    }
}

/// Category of a non-success condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    LocatorExhausted,
    ProcessTimeout,
    ProcessInterrupted,
    ProcessFailed,
    ArtifactMissing,
    ArtifactUnreadable,
    StructuralMismatch,
}

impl std::fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DiagnosticKind::LocatorExhausted => "locator exhausted",
            DiagnosticKind::ProcessTimeout => "process timeout",
            DiagnosticKind::ProcessInterrupted => "process interrupted",
            DiagnosticKind::ProcessFailed => "process failed",
            DiagnosticKind::ArtifactMissing => "artifact missing",
            DiagnosticKind::ArtifactUnreadable => "artifact unreadable",
            DiagnosticKind::StructuralMismatch => "structural mismatch",
        };
        f.write_str(name)
    }
}

/// A recovered non-success condition with its explanation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}
