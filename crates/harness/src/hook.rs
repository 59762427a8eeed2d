//! Post-run hook seam

use crate::error::HarnessResult;
use crate::orchestrator::HarnessReport;

/// Action taken after a run with a favorable verdict (success or partial).
///
/// Failures are logged by the harness and never change the verdict.
pub trait PostRunHook: Send + Sync {
    fn on_favorable(&self, report: &HarnessReport) -> HarnessResult<()>;
}
