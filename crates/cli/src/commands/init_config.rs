//! Default configuration writer

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use crawlprobe_common::{HarnessConfig, DEFAULT_CONFIG_FILE};

use crate::output;

#[derive(Args)]
pub struct InitConfigArgs {
    /// Destination file
    #[arg(default_value = DEFAULT_CONFIG_FILE)]
    pub path: PathBuf,

    /// Overwrite an existing file
    #[arg(long)]
    pub force: bool,
}

pub fn execute(args: InitConfigArgs) -> anyhow::Result<i32> {
    anyhow::ensure!(
        args.force || !args.path.exists(),
        "{} already exists (use --force to overwrite)",
        args.path.display()
    );

    HarnessConfig::default()
        .save(&args.path)
        .with_context(|| format!("writing {}", args.path.display()))?;

    output::print_success(&format!("Wrote default configuration to {}", args.path.display()));
    Ok(0)
}
