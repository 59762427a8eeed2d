//! Output formatting for CLI

use clap::ValueEnum;
use colored::{ColoredString, Colorize};
use comfy_table::{presets::UTF8_FULL, Cell, Color, ContentArrangement, Table};
use crawlprobe_common::{Diagnostic, Verdict, WorkbookReport};
use serde::Serialize;

/// Output format
#[derive(Debug, Clone, Copy, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable report
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print any serializable value as pretty JSON
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn rule() {
    println!("{}", "━".repeat(60).dimmed());
}

pub fn heading(title: &str) {
    println!();
    rule();
    println!(" {}", title.bold());
    rule();
    println!();
}

pub fn verdict_label(verdict: Verdict) -> ColoredString {
    match verdict {
        Verdict::Success => "✅ SUCCESS".green().bold(),
        Verdict::Partial => "⚠️  PARTIAL".yellow().bold(),
        Verdict::Problems => "❌ PROBLEMS".red().bold(),
        Verdict::Inconclusive => "❔ INCONCLUSIVE".magenta().bold(),
    }
}

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Sheet list, main sheet summary and the parser hit/miss table
pub fn print_workbook(report: &WorkbookReport) {
    println!("{}", "📊 Sheets".bold());
    if report.sheet_names.is_empty() {
        println!("   {}", "(none)".red());
    }
    for name in &report.sheet_names {
        let mut tags = Vec::new();
        if report.main_data_sheet_name.as_deref() == Some(name.as_str()) {
            tags.push("main".cyan().to_string());
        }
        if report.redirect_sheet_name.as_deref() == Some(name.as_str()) {
            tags.push("redirects".cyan().to_string());
        }
        if tags.is_empty() {
            println!("   • {}", name);
        } else {
            println!("   • {} [{}]", name, tags.join(", "));
        }
    }
    println!();

    println!("{}", "📋 Main Data Sheet".bold());
    match &report.main_data_sheet_name {
        Some(name) => {
            println!("   Sheet:    {}", name);
            println!("   Rows:     {}", report.row_count);
            println!("   Columns:  {}", report.column_names.len());
        }
        None => println!("   {}", "Not found".red()),
    }
    println!(
        "   Redirects: {}",
        if report.has_redirect_sheet {
            "✅ present".green()
        } else {
            "❌ missing".red()
        }
    );
    println!();

    if report.parser_signature_hits.is_empty() {
        return;
    }
    println!(
        "{}  {}/{} present",
        "🧩 Parser Signatures".bold(),
        report.present_parsers().len(),
        report.parser_signature_hits.len()
    );
    let mut table = new_table();
    table.set_header(vec!["Parser", "Status", "Matched", "Expected"]);
    for (name, hit) in &report.parser_signature_hits {
        let status = if hit.is_present() {
            Cell::new("present").fg(Color::Green)
        } else {
            Cell::new("missing").fg(Color::Red)
        };
        table.add_row(vec![
            Cell::new(name),
            status,
            Cell::new(join(&hit.matched)),
            Cell::new(join(&hit.expected)),
        ]);
    }
    println!("{table}");
    println!();
}

pub fn print_diagnostics(diagnostics: &[Diagnostic]) {
    if diagnostics.is_empty() {
        return;
    }
    println!("{}", "🩺 Diagnostics".bold());
    for diagnostic in diagnostics {
        println!("   • {} {}", format!("[{}]", diagnostic.kind).yellow(), diagnostic.message);
    }
    println!();
}

/// Print the last lines of a captured stream, if any
pub fn print_tail(label: &str, lines: &[String], n: usize) {
    if lines.is_empty() {
        return;
    }
    let tail = crawlprobe_common::ExecutionResult::tail(lines, n);
    println!("   {} (last {} of {}):", label.bold(), tail.len(), lines.len());
    for line in tail {
        println!("     {}", line.dimmed());
    }
}

/// Two-column key/value table
pub fn print_fields(fields: &[(&str, String)]) {
    let mut table = new_table();
    table.set_header(vec!["Field", "Value"]);
    for (key, value) in fields {
        table.add_row(vec![key.to_string(), value.clone()]);
    }
    println!("{table}");
}

fn join<'a>(names: impl IntoIterator<Item = &'a String>) -> String {
    let joined: Vec<&str> = names.into_iter().map(String::as_str).collect();
    if joined.is_empty() {
        "-".to_string()
    } else {
        joined.join(", ")
    }
}

pub fn print_success(message: &str) {
    println!("✅ {}", message);
}

pub fn print_warning(message: &str) {
    eprintln!("⚠️  {}", message);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_join_renders_dash_for_empty() {
        let empty: BTreeSet<String> = BTreeSet::new();
        assert_eq!(join(&empty), "-");

        let names: BTreeSet<String> = ["title", "og_tags_count"].iter().map(|s| s.to_string()).collect();
        assert_eq!(join(&names), "og_tags_count, title");
    }
}
