//! crawlprobe harness
//!
//! Verifies a seofrog crawl end to end:
//! - Finds the crawler's entry point in a working directory
//! - Runs it against a fixed target under a wall-clock limit
//! - Inspects the exported workbook and classifies the outcome
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Harness (orchestrator)                  │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Idle                                                       │
//! │    ├── Locator::locate(base_dir) -> Option<Candidate>       │
//! │    │     ├── conventional paths                             │
//! │    │     ├── keyword search (walkdir)                       │
//! │    │     └── ModuleProbe (import check)                     │
//! │  Located                                                    │
//! │    ├── ProcessRunner::run(invocation, timeout)              │
//! │  Executed                                                   │
//! │    ├── WorkbookValidator::validate(artifact)                │
//! │  Validated                                                  │
//! │    └── Verdict::classify(report) -> Reported(verdict)       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  PostRunHook::on_favorable(report)   (success / partial)    │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod hook;
pub mod locator;
pub mod orchestrator;
pub mod process;

pub use error::{HarnessError, HarnessResult};
pub use hook::PostRunHook;
pub use locator::{InterpreterProbe, Locator, ModuleProbe, DEFAULT_IMPORT_TIMEOUT};
pub use orchestrator::{Harness, HarnessReport, HarnessState, REPORT_FILE_NAME};
pub use process::ProcessRunner;
