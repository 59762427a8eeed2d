//! Entry point lookup without running anything

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use crawlprobe_common::{HarnessConfig, Verdict};
use crawlprobe_harness::{InterpreterProbe, Locator};

use crate::output::{self, OutputFormat};

#[derive(Args)]
pub struct LocateArgs {
    /// Directory to search (defaults to the configured working directory)
    #[arg(long, env = "CRAWLPROBE_BASE_DIR")]
    pub base_dir: Option<PathBuf>,
}

pub fn execute(args: LocateArgs, config: HarnessConfig, format: OutputFormat) -> anyhow::Result<i32> {
    let base_dir = args.base_dir.unwrap_or_else(|| config.working_dir.clone());
    let probe = Arc::new(InterpreterProbe::new(config.interpreter.clone()));
    let locator = Locator::new(config.locator.clone(), config.module_name.clone(), probe);

    let Some(candidate) = locator.locate(&base_dir) else {
        match format {
            OutputFormat::Json => output::print_json(&serde_json::json!({ "candidate": null }))?,
            OutputFormat::Table => output::print_warning(&format!(
                "No entry point found under {}",
                base_dir.display()
            )),
        }
        return Ok(Verdict::Inconclusive.exit_code());
    };

    let invocation = config.invocation(&candidate);
    match format {
        OutputFormat::Json => output::print_json(&serde_json::json!({
            "candidate": candidate,
            "invocation": invocation,
        }))?,
        OutputFormat::Table => output::print_fields(&[
            ("Path", candidate.path.clone()),
            ("Kind", candidate.kind.to_string()),
            ("Confidence", candidate.confidence.0.to_string()),
            ("Command", invocation.command_line()),
        ]),
    }

    Ok(0)
}
