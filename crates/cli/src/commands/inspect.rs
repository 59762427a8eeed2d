//! Standalone workbook inspection

use std::path::{Path, PathBuf};

use clap::Args;
use colored::Colorize;
use crawlprobe_common::{HarnessConfig, Verdict, WorkbookValidator};

use crate::output::{self, OutputFormat};

#[derive(Args)]
pub struct InspectArgs {
    /// Path to the exported workbook (.xlsx)
    #[arg(required = true)]
    pub path: PathBuf,
}

pub fn execute(args: InspectArgs, config: HarnessConfig, format: OutputFormat) -> anyhow::Result<i32> {
    if !args.path.is_file() {
        match format {
            OutputFormat::Json => output::print_json(&missing_file_json(&args.path))?,
            OutputFormat::Table => {
                eprintln!("{} File not found: {}", "Error:".red().bold(), args.path.display())
            }
        }
        return Ok(Verdict::Inconclusive.exit_code());
    }

    let validator = WorkbookValidator::new(config.sheets, config.signatures);
    let report = match validator.validate(&args.path) {
        Ok(report) => report,
        Err(e) => {
            match format {
                OutputFormat::Json => output::print_json(&serde_json::json!({
                    "path": args.path.display().to_string(),
                    "verdict": Verdict::Problems,
                    "error": e.to_string(),
                }))?,
                OutputFormat::Table => {
                    eprintln!("{} {}", "Error:".red().bold(), e);
                    println!(" Verdict: {}", output::verdict_label(Verdict::Problems));
                }
            }
            return Ok(Verdict::Problems.exit_code());
        }
    };

    let verdict = Verdict::classify(&report);
    match format {
        OutputFormat::Json => output::print_json(&serde_json::json!({
            "workbook": report,
            "verdict": verdict,
        }))?,
        OutputFormat::Table => {
            output::heading("Workbook Inspection Report");
            println!("{}  {}", "📦 Input:".bold(), report.path);
            println!();
            output::print_workbook(&report);
            output::rule();
            println!(" Verdict: {}", output::verdict_label(verdict));
            output::rule();
        }
    }

    Ok(verdict.exit_code())
}

fn missing_file_json(path: &Path) -> serde_json::Value {
    serde_json::json!({
        "path": path.display().to_string(),
        "verdict": Verdict::Inconclusive,
        "error": "file not found",
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_json_is_inconclusive() {
        let value = missing_file_json(Path::new("absent/crawl.xlsx"));
        assert_eq!(value["path"], "absent/crawl.xlsx");
        assert_eq!(value["verdict"], "inconclusive");
        assert_eq!(value["error"], "file not found");
    }

    #[test]
    fn test_missing_file_exits_inconclusive_in_both_formats() {
        let dir = tempfile::tempdir().unwrap();
        for format in [OutputFormat::Json, OutputFormat::Table] {
            let args = InspectArgs {
                path: dir.path().join("absent.xlsx"),
            };
            let code = execute(args, HarnessConfig::default(), format).unwrap();
            assert_eq!(code, Verdict::Inconclusive.exit_code());
        }
    }
}
