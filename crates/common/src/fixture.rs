//! Synthetic crawl workbooks for tests
//!
//! Writes the smallest `.xlsx` container the workbook reader accepts: content
//! types, package relationships, the workbook part and one worksheet per sheet
//! using inline strings. Data cells are filled with `<column>-<row>` values.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

struct FixtureSheet {
    name: String,
    header: Vec<String>,
    rows: usize,
}

/// Builder for a multi-sheet workbook file
#[derive(Default)]
pub struct WorkbookFixture {
    sheets: Vec<FixtureSheet>,
}

impl WorkbookFixture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sheet with a header row and `rows` filled data rows
    pub fn sheet(mut self, name: &str, header: &[&str], rows: usize) -> Self {
        self.sheets.push(FixtureSheet {
            name: name.to_string(),
            header: header.iter().map(|h| h.to_string()).collect(),
            rows,
        });
        self
    }

    /// Write the workbook to `path`
    pub fn write(&self, path: &Path) -> std::io::Result<()> {
        let file = File::create(path)?;
        let mut zip = ZipWriter::new(file);
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);

        let mut parts = vec![
            ("[Content_Types].xml".to_string(), self.content_types()),
            ("_rels/.rels".to_string(), PACKAGE_RELS.to_string()),
            ("xl/workbook.xml".to_string(), self.workbook_xml()),
            ("xl/_rels/workbook.xml.rels".to_string(), self.workbook_rels()),
        ];
        for (i, sheet) in self.sheets.iter().enumerate() {
            parts.push((format!("xl/worksheets/sheet{}.xml", i + 1), sheet_xml(sheet)));
        }

        for (name, body) in parts {
            zip.start_file(name, options).map_err(std::io::Error::other)?;
            zip.write_all(body.as_bytes())?;
        }
        zip.finish().map_err(std::io::Error::other)?;
        Ok(())
    }

    fn content_types(&self) -> String {
        let mut xml = String::from(XML_DECL);
        xml.push_str(r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#);
        xml.push_str(r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#);
        xml.push_str(r#"<Default Extension="xml" ContentType="application/xml"/>"#);
        xml.push_str(r#"<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>"#);
        for i in 1..=self.sheets.len() {
            xml.push_str(&format!(
                r#"<Override PartName="/xl/worksheets/sheet{i}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#
            ));
        }
        xml.push_str("</Types>");
        xml
    }

    fn workbook_xml(&self) -> String {
        let mut xml = String::from(XML_DECL);
        xml.push_str(r#"<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets>"#);
        for (i, sheet) in self.sheets.iter().enumerate() {
            xml.push_str(&format!(
                r#"<sheet name="{}" sheetId="{}" r:id="rId{}"/>"#,
                escape(&sheet.name),
                i + 1,
                i + 1
            ));
        }
        xml.push_str("</sheets></workbook>");
        xml
    }

    fn workbook_rels(&self) -> String {
        let mut xml = String::from(XML_DECL);
        xml.push_str(r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#);
        for i in 1..=self.sheets.len() {
            xml.push_str(&format!(
                r#"<Relationship Id="rId{i}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{i}.xml"/>"#
            ));
        }
        xml.push_str("</Relationships>");
        xml
    }
}

const XML_DECL: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

const PACKAGE_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

fn sheet_xml(sheet: &FixtureSheet) -> String {
    let mut xml = String::from(XML_DECL);
    xml.push_str(r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>"#);
    if !sheet.header.is_empty() {
        xml.push_str(&row_xml(1, sheet.header.iter().map(String::as_str)));
        for row in 0..sheet.rows {
            let values: Vec<String> = sheet
                .header
                .iter()
                .map(|column| format!("{}-{}", column, row + 1))
                .collect();
            xml.push_str(&row_xml(row + 2, values.iter().map(String::as_str)));
        }
    }
    xml.push_str("</sheetData></worksheet>");
    xml
}

fn row_xml<'a>(number: usize, values: impl Iterator<Item = &'a str>) -> String {
    let mut xml = format!(r#"<row r="{number}">"#);
    for (col, value) in values.enumerate() {
        xml.push_str(&format!(
            r#"<c r="{}{}" t="inlineStr"><is><t>{}</t></is></c>"#,
            column_letters(col),
            number,
            escape(value)
        ));
    }
    xml.push_str("</row>");
    xml
}

/// Zero-based column index to spreadsheet letters (0 -> A, 26 -> AA)
fn column_letters(mut index: usize) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push(b'A' + (index % 26) as u8);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    letters.reverse();
    String::from_utf8_lossy(&letters).into_owned()
}

fn escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
