//! Full verification run

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use colored::Colorize;
use crawlprobe_common::HarnessConfig;
use crawlprobe_harness::{Harness, HarnessReport};

use crate::open::OpenArtifactHook;
use crate::output::{self, OutputFormat};

const TAIL_LINES: usize = 10;

#[derive(Args)]
pub struct RunArgs {
    /// Directory the crawler runs in and is searched from
    #[arg(long, env = "CRAWLPROBE_BASE_DIR")]
    pub base_dir: Option<PathBuf>,

    /// Target host to crawl
    #[arg(long, env = "CRAWLPROBE_HOST")]
    pub host: Option<String>,

    /// URL cap passed to the crawler
    #[arg(long, env = "CRAWLPROBE_MAX_URLS")]
    pub max_urls: Option<u32>,

    /// Worker count passed to the crawler
    #[arg(long, env = "CRAWLPROBE_WORKERS")]
    pub workers: Option<u32>,

    /// Subprocess timeout in seconds
    #[arg(long, env = "CRAWLPROBE_TIMEOUT")]
    pub timeout: Option<u64>,

    /// Workbook the crawler exports
    #[arg(long, env = "CRAWLPROBE_ARTIFACT")]
    pub artifact: Option<PathBuf>,

    /// Log file the crawler writes
    #[arg(long, env = "CRAWLPROBE_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// Interpreter used to start the crawler
    #[arg(long, env = "CRAWLPROBE_INTERPRETER")]
    pub interpreter: Option<String>,

    /// Module name for the import fallback
    #[arg(long, env = "CRAWLPROBE_MODULE")]
    pub module: Option<String>,

    /// Write the JSON report into this directory
    #[arg(long, env = "CRAWLPROBE_REPORT_DIR")]
    pub report_dir: Option<PathBuf>,

    /// Offer to open the workbook after a favorable verdict
    #[arg(long)]
    pub open: bool,

    /// Open without asking (with --open)
    #[arg(short, long)]
    pub yes: bool,
}

impl RunArgs {
    /// Layer command line (and environment) values over the loaded configuration
    pub fn apply(&self, config: &mut HarnessConfig) {
        if let Some(dir) = &self.base_dir {
            config.working_dir = dir.clone();
        }
        if let Some(host) = &self.host {
            config.target.host = host.clone();
        }
        if let Some(max_urls) = self.max_urls {
            config.target.max_urls = max_urls;
        }
        if let Some(workers) = self.workers {
            config.target.workers = workers;
        }
        if let Some(timeout) = self.timeout {
            config.timeout_secs = timeout;
        }
        if let Some(artifact) = &self.artifact {
            config.artifact_path = artifact.clone();
        }
        if let Some(log) = &self.log_file {
            config.log_path = log.clone();
        }
        if let Some(interpreter) = &self.interpreter {
            config.interpreter = interpreter.clone();
        }
        if let Some(module) = &self.module {
            config.module_name = module.clone();
        }
        if let Some(dir) = &self.report_dir {
            config.report_dir = Some(dir.clone());
        }
    }
}

pub async fn execute(args: RunArgs, mut config: HarnessConfig, format: OutputFormat) -> anyhow::Result<i32> {
    args.apply(&mut config);

    let mut harness = Harness::new(config);
    if args.open {
        harness = harness.with_hook(OpenArtifactHook::new(args.yes));
    }

    let report = harness.run().await.context("verification run failed")?;

    match format {
        OutputFormat::Json => output::print_json(&report)?,
        OutputFormat::Table => print_summary(&report),
    }

    Ok(report.verdict.exit_code())
}

fn print_summary(report: &HarnessReport) {
    output::heading("Crawl Verification Report");

    println!(
        "{}  {} (max {} URLs, {} worker(s))",
        "🎯 Target:".bold(),
        report.target.host,
        report.target.max_urls,
        report.target.workers
    );
    match &report.candidate {
        Some(candidate) => println!(
            "{}  {} ({}, confidence {})",
            "🔎 Entry:".bold(),
            candidate.path,
            candidate.kind,
            candidate.confidence.0
        ),
        None => println!("{}  {}", "🔎 Entry:".bold(), "not found".red()),
    }
    if let Some(invocation) = &report.invocation {
        println!("{}  {}", "▶️  Command:".bold(), invocation.command_line().dimmed());
    }
    println!();

    if let Some(execution) = &report.execution {
        println!("{}", "⚙️  Execution".bold());
        if execution.interrupted {
            println!("   Exit:     {}", "interrupted".red());
        } else if execution.timed_out {
            println!("   Exit:     {}", "timed out".red());
        } else if execution.exit_code == 0 {
            println!("   Exit:     {}", "0".green());
        } else {
            println!("   Exit:     {}", execution.exit_code.to_string().yellow());
        }
        println!("   Duration: {:.1}s", execution.duration_seconds);
        println!(
            "   Log file: {}",
            if report.log_file_present {
                "present".green()
            } else {
                "absent".yellow()
            }
        );
        if !execution.succeeded() {
            output::print_tail("stdout", &execution.stdout_lines, TAIL_LINES);
            output::print_tail("stderr", &execution.stderr_lines, TAIL_LINES);
        }
        println!();
    }

    println!("{}  {}", "📦 Artifact:".bold(), report.artifact_path);
    println!();
    if let Some(workbook) = &report.workbook {
        output::print_workbook(workbook);
    }

    output::print_diagnostics(&report.diagnostics);

    output::rule();
    println!(" Verdict: {}", output::verdict_label(report.verdict));
    output::rule();
}
