//! Workbook Validation Module
//!
//! Reduces the crawler's exported workbook to a structural report:
//! - Sheet enumeration in file order
//! - Redirect sheet detection by name keyword
//! - Main data sheet detection (keyword first, longest name as fallback)
//! - Row count and header columns of the main data sheet
//! - Parser signature matching against the declared column groups
//!
//! Only structure is checked. Cell contents are never validated.

use std::collections::BTreeSet;
use std::path::Path;

use calamine::{open_workbook_auto, Data, Range, Reader};
use indexmap::IndexMap;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::{ParserSignature, SheetRules};
use crate::types::{SignatureHit, WorkbookReport};

/// Errors that can occur while reading a workbook
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkbookError {
    #[error("Artifact unreadable: {path}: {reason}")]
    Unreadable { path: String, reason: String },
}

impl WorkbookError {
    fn unreadable(path: &Path, reason: impl ToString) -> Self {
        WorkbookError::Unreadable {
            path: path.display().to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Result type for workbook operations
pub type Result<T> = std::result::Result<T, WorkbookError>;

// ============================================================================
// Workbook Validator
// ============================================================================

/// Structural validator for crawl workbooks
#[derive(Debug, Clone)]
pub struct WorkbookValidator {
    rules: SheetRules,
    signatures: Vec<ParserSignature>,
}

impl WorkbookValidator {
    pub fn new(rules: SheetRules, signatures: Vec<ParserSignature>) -> Self {
        Self { rules, signatures }
    }

    /// Validate the workbook at `path`
    pub fn validate<P: AsRef<Path>>(&self, path: P) -> Result<WorkbookReport> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(WorkbookError::unreadable(path, "file does not exist"));
        }

        debug!("Validating workbook: {}", path.display());

        let mut workbook =
            open_workbook_auto(path).map_err(|e| WorkbookError::unreadable(path, e))?;

        let mut report = WorkbookReport {
            path: path.display().to_string(),
            sheet_names: workbook.sheet_names(),
            ..Default::default()
        };

        report.set_redirect_sheet(find_redirect_sheet(&report.sheet_names, &self.rules));
        report.main_data_sheet_name = find_main_sheet(&report.sheet_names, &self.rules);

        if let Some(ref main) = report.main_data_sheet_name {
            let range = workbook
                .worksheet_range(main)
                .map_err(|e| WorkbookError::unreadable(path, format!("sheet '{}': {}", main, e)))?;
            let (row_count, columns) = summarize_sheet(&range);
            report.row_count = row_count;
            report.column_names = columns;
        } else {
            warn!("No main data sheet in {}", path.display());
        }

        report.parser_signature_hits = match_signatures(&report.column_names, &self.signatures);

        debug!(
            "Workbook {}: {} sheets, {} rows, {} columns",
            path.display(),
            report.sheet_names.len(),
            report.row_count,
            report.column_names.len()
        );

        Ok(report)
    }
}

// ============================================================================
// Detection Rules
// ============================================================================

fn contains_any(name: &str, keywords: &[String]) -> bool {
    let name = name.to_lowercase();
    keywords
        .iter()
        .any(|keyword| name.contains(&keyword.to_lowercase()))
}

/// First sheet whose name contains a redirect keyword
pub fn find_redirect_sheet(sheet_names: &[String], rules: &SheetRules) -> Option<String> {
    sheet_names
        .iter()
        .find(|name| contains_any(name, &rules.redirect_keywords))
        .cloned()
}

/// The main data sheet: first keyword match, otherwise the longest name.
///
/// Length is measured in characters; ties keep the earliest sheet.
pub fn find_main_sheet(sheet_names: &[String], rules: &SheetRules) -> Option<String> {
    if let Some(name) = sheet_names
        .iter()
        .find(|name| contains_any(name, &rules.main_keywords))
    {
        return Some(name.clone());
    }

    let mut longest: Option<&String> = None;
    for name in sheet_names {
        let is_longer = longest.map_or(true, |best| {
            name.chars().count() > best.chars().count()
        });
        if is_longer {
            longest = Some(name);
        }
    }
    longest.cloned()
}

fn is_blank(cell: &Data) -> bool {
    match cell {
        Data::Empty => true,
        Data::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// Data row count and header names of a sheet.
///
/// The first row is the header; blank header cells are dropped and only data
/// rows with at least one non-blank cell are counted.
pub fn summarize_sheet(range: &Range<Data>) -> (usize, BTreeSet<String>) {
    let mut rows = range.rows();

    let columns = rows
        .next()
        .map(|header| {
            header
                .iter()
                .filter(|cell| !is_blank(cell))
                .map(|cell| cell.to_string().trim().to_string())
                .collect()
        })
        .unwrap_or_default();

    let row_count = rows.filter(|row| !row.iter().all(is_blank)).count();

    (row_count, columns)
}

/// Intersect each signature's columns with the observed header set
pub fn match_signatures(
    columns: &BTreeSet<String>,
    signatures: &[ParserSignature],
) -> IndexMap<String, SignatureHit> {
    signatures
        .iter()
        .map(|signature| {
            let expected: BTreeSet<String> = signature.columns.iter().cloned().collect();
            let matched = expected.intersection(columns).cloned().collect();
            (signature.name.clone(), SignatureHit { matched, expected })
        })
        .collect()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_signatures;
    use crate::fixture::WorkbookFixture;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn validator() -> WorkbookValidator {
        WorkbookValidator::new(SheetRules::default(), default_signatures())
    }

    #[test]
    fn test_redirect_sheet_first_match_case_insensitive() {
        let sheets = names(&["Resumo Executivo", "🔄 REDIRECTS Detectados", "Redirect 2"]);
        assert_eq!(
            find_redirect_sheet(&sheets, &SheetRules::default()),
            Some("🔄 REDIRECTS Detectados".to_string())
        );
        assert_eq!(find_redirect_sheet(&names(&["Erros HTTP"]), &SheetRules::default()), None);
    }

    #[test]
    fn test_main_sheet_prefers_keyword() {
        let sheets = names(&["Resumo Executivo Muito Longo", "Dados Completos", "Erros HTTP"]);
        assert_eq!(
            find_main_sheet(&sheets, &SheetRules::default()),
            Some("Dados Completos".to_string())
        );
    }

    #[test]
    fn test_main_sheet_falls_back_to_longest_name() {
        let sheets = names(&["Erros", "Problemas Meta", "Problemas Tags"]);
        // Equal length: first in file order wins.
        assert_eq!(
            find_main_sheet(&sheets, &SheetRules::default()),
            Some("Problemas Meta".to_string())
        );
        assert_eq!(find_main_sheet(&[], &SheetRules::default()), None);
    }

    #[test]
    fn test_longest_name_counts_characters() {
        // Both are 7 characters, but "Análise" is 8 bytes.
        let sheets = names(&["Resumos", "Análise"]);
        assert_eq!(
            find_main_sheet(&sheets, &SheetRules::default()),
            Some("Resumos".to_string())
        );
    }

    #[test]
    fn test_signature_matching() {
        let columns: BTreeSet<String> = ["url", "title", "og_tags_count"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let hits = match_signatures(&columns, &default_signatures());

        assert!(hits["meta"].is_present());
        assert_eq!(hits["meta"].matched.len(), 1);
        assert_eq!(hits["meta"].expected.len(), 4);
        assert!(hits["social"].is_present());
        assert!(!hits["technical"].is_present());
        let order: Vec<&str> = hits.keys().map(String::as_str).collect();
        assert_eq!(&order[..4], ["meta", "technical", "social", "schema"]);
    }

    #[test]
    fn test_validate_full_workbook() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("crawl.xlsx");
        WorkbookFixture::new()
            .sheet(
                "URLs_Completo",
                &["url", "title", "has_viewport", "og_tags_count", "schema_total_count"],
                5,
            )
            .sheet("Redirects_301_302", &["url", "status_code", "final_url"], 2)
            .write(&path)
            .unwrap();

        let report = validator().validate(&path).unwrap();

        assert_eq!(report.sheet_names, ["URLs_Completo", "Redirects_301_302"]);
        assert!(report.has_redirect_sheet);
        assert_eq!(report.redirect_sheet_name.as_deref(), Some("Redirects_301_302"));
        assert_eq!(report.main_data_sheet_name.as_deref(), Some("URLs_Completo"));
        assert_eq!(report.row_count, 5);
        assert!(report.column_names.contains("has_viewport"));
        for parser in ["meta", "technical", "social", "schema"] {
            assert!(report.parser_signature_hits[parser].is_present(), "{parser}");
        }
        assert!(!report.parser_signature_hits["headings"].is_present());
    }

    #[test]
    fn test_validate_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("crawl.xlsx");
        WorkbookFixture::new()
            .sheet("Dados Completos", &["url", "title", "word_count"], 3)
            .write(&path)
            .unwrap();

        let first = validator().validate(&path).unwrap();
        let second = validator().validate(&path).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_header_only_sheet_has_no_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("crawl.xlsx");
        WorkbookFixture::new()
            .sheet("Dados Completos", &["url", "title"], 0)
            .write(&path)
            .unwrap();

        let report = validator().validate(&path).unwrap();
        assert_eq!(report.row_count, 0);
        assert_eq!(report.column_names.len(), 2);
    }

    #[test]
    fn test_missing_file_is_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let err = validator().validate(dir.path().join("nope.xlsx")).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn test_corrupt_file_is_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("crawl.xlsx");
        std::fs::write(&path, b"this is not a zip container").unwrap();

        assert!(matches!(
            validator().validate(&path),
            Err(WorkbookError::Unreadable { .. })
        ));
    }
}
