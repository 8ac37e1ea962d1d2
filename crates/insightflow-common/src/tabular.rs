//! Tabular preview extraction
//!
//! Uploaded files are reduced to a small preview sample at upload time: the header row defines the
//! columns, every cell is typed dynamically, and only the first [`PREVIEW_ROW_LIMIT`] data rows are
//! kept. Column types are inferred from the first data row.
//!
//! CSV and Excel workbooks go through the same preview builder, so both formats share header
//! handling, preview size and type inference. Repeated header names are made unique by suffixing
//! `_1`, `_2`, ... so no column is lost.

use std::collections::{HashMap, HashSet};
use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use thiserror::Error;

use crate::types::{ColumnMeta, ColumnType, Row, ScalarValue, MAX_EXACT_INTEGER};

/// Maximum number of rows kept in a dataset preview
pub const PREVIEW_ROW_LIMIT: usize = 10;

const CSV_MIME_TYPES: &[&str] = &["text/csv", "application/csv"];

const XLSX_MIME_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
const XLS_MIME_TYPE: &str = "application/vnd.ms-excel";

/// Errors raised while extracting a preview
#[derive(Debug, Error)]
pub enum TabularError {
    #[error("File is not valid UTF-8 text")]
    Encoding,

    #[error("Malformed CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Unreadable workbook: {0}")]
    Excel(#[from] calamine::Error),

    #[error("Workbook contains no worksheet")]
    NoWorksheet,
}

/// Recognised upload formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabularFormat {
    Csv,
    Excel,
}

impl TabularFormat {
    /// Detect the format from the file name and the client-supplied MIME type
    pub fn detect(file_name: &str, content_type: Option<&str>) -> Option<Self> {
        let lower = file_name.to_ascii_lowercase();
        let mime = content_type.map(|m| m.to_ascii_lowercase());
        let mime = mime.as_deref();

        if lower.ends_with(".csv") || mime.is_some_and(|m| CSV_MIME_TYPES.contains(&m)) {
            Some(TabularFormat::Csv)
        } else if lower.ends_with(".xlsx")
            || lower.ends_with(".xls")
            || mime.is_some_and(|m| m == XLSX_MIME_TYPE || m == XLS_MIME_TYPE)
        {
            Some(TabularFormat::Excel)
        } else {
            None
        }
    }

    /// MIME type recorded when the client did not send one
    pub fn default_mime_type(&self, file_name: &str) -> &'static str {
        match self {
            TabularFormat::Csv => "text/csv",
            TabularFormat::Excel if file_name.to_ascii_lowercase().ends_with(".xls") => {
                XLS_MIME_TYPE
            },
            TabularFormat::Excel => XLSX_MIME_TYPE,
        }
    }

    /// Parse file bytes in this format
    pub fn parse(&self, bytes: &[u8]) -> Result<TabularPreview, TabularError> {
        match self {
            TabularFormat::Csv => parse_csv(bytes),
            TabularFormat::Excel => parse_excel(bytes),
        }
    }
}

/// Preview sample and shape of a parsed file
#[derive(Debug, Clone, PartialEq)]
pub struct TabularPreview {
    pub columns: Vec<ColumnMeta>,
    pub preview: Vec<Row>,
    pub row_count: usize,
    pub column_count: usize,
}

impl TabularPreview {
    fn empty() -> Self {
        Self {
            columns: Vec::new(),
            preview: Vec::new(),
            row_count: 0,
            column_count: 0,
        }
    }
}

/// Accumulates data rows under a fixed header, keeping only the preview sample
struct PreviewBuilder {
    headers: Vec<String>,
    preview: Vec<Row>,
    row_count: usize,
}

impl PreviewBuilder {
    fn new(headers: Vec<String>) -> Self {
        Self {
            headers: unique_headers(headers),
            preview: Vec::new(),
            row_count: 0,
        }
    }

    /// Count a data row; cells are only consumed while the preview is filling up
    fn push_row(&mut self, cells: impl IntoIterator<Item = ScalarValue>) {
        self.row_count += 1;
        if self.preview.len() >= PREVIEW_ROW_LIMIT {
            return;
        }

        let mut cells = cells.into_iter();
        let row: Row = self
            .headers
            .iter()
            .map(|name| (name.clone(), cells.next().unwrap_or(ScalarValue::Null)))
            .collect();
        self.preview.push(row);
    }

    fn finish(self, source: &'static str) -> TabularPreview {
        let Some(first) = self.preview.first() else {
            tracing::debug!(source, "File contains no data rows");
            return TabularPreview::empty();
        };

        let columns: Vec<ColumnMeta> = first
            .iter()
            .map(|(name, value)| ColumnMeta::new(name.clone(), value.column_type()))
            .collect();

        tracing::debug!(
            source,
            rows = self.row_count,
            columns = columns.len(),
            numeric_columns = columns.iter().filter(|c| c.column_type == ColumnType::Number).count(),
            "Parsed tabular preview"
        );

        TabularPreview {
            column_count: columns.len(),
            columns,
            preview: self.preview,
            row_count: self.row_count,
        }
    }
}

/// Rename repeated header names to `name_1`, `name_2`, ... skipping names already taken
fn unique_headers(raw: Vec<String>) -> Vec<String> {
    let mut taken: HashSet<String> = raw.iter().cloned().collect();
    let mut seen: HashSet<String> = HashSet::with_capacity(raw.len());
    let mut suffixes: HashMap<String, usize> = HashMap::new();
    let mut headers = Vec::with_capacity(raw.len());

    for name in raw {
        if seen.insert(name.clone()) {
            headers.push(name);
            continue;
        }

        let suffix = suffixes.entry(name.clone()).or_insert(0);
        let renamed = loop {
            *suffix += 1;
            let candidate = format!("{}_{}", name, suffix);
            if taken.insert(candidate.clone()) {
                break candidate;
            }
        };
        seen.insert(renamed.clone());
        headers.push(renamed);
    }

    headers
}

/// Parse CSV bytes (header row required) into a preview
pub fn parse_csv(bytes: &[u8]) -> Result<TabularPreview, TabularError> {
    let text = std::str::from_utf8(bytes).map_err(|_| TabularError::Encoding)?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();
    let mut builder = PreviewBuilder::new(headers);

    for record in reader.records() {
        let record = record?;
        builder.push_row(record.iter().map(parse_cell));
    }

    Ok(builder.finish("csv"))
}

/// Parse an Excel workbook (`.xlsx` or `.xls`) into a preview of its first worksheet
///
/// The first non-empty row of the sheet is the header row. Fully empty rows are skipped.
pub fn parse_excel(bytes: &[u8]) -> Result<TabularPreview, TabularError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(TabularError::NoWorksheet)??;

    let mut rows = range
        .rows()
        .filter(|row| !row.iter().all(|cell| matches!(cell, Data::Empty)));

    let Some(header_row) = rows.next() else {
        tracing::debug!("Worksheet is empty");
        return Ok(TabularPreview::empty());
    };

    let headers: Vec<String> = header_row.iter().map(header_name).collect();
    let mut builder = PreviewBuilder::new(headers);

    for row in rows {
        builder.push_row(row.iter().map(excel_cell));
    }

    Ok(builder.finish("excel"))
}

fn header_name(cell: &Data) -> String {
    match cell {
        Data::String(s) => s.clone(),
        Data::Empty => String::new(),
        other => other.to_string(),
    }
}

/// Type a workbook cell; whole numbers become integers like their CSV counterparts
fn excel_cell(cell: &Data) -> ScalarValue {
    match cell {
        Data::Empty => ScalarValue::Null,
        Data::Int(i) => ScalarValue::Int(*i),
        Data::Float(f) => number(*f),
        Data::Bool(b) => ScalarValue::Bool(*b),
        Data::String(s) if s.is_empty() => ScalarValue::Null,
        Data::String(s) => ScalarValue::Text(s.clone()),
        // Dates keep their spreadsheet serial number
        Data::DateTime(dt) => number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => ScalarValue::Text(s.clone()),
        Data::Error(e) => ScalarValue::Text(e.to_string()),
    }
}

fn number(value: f64) -> ScalarValue {
    if !value.is_finite() {
        return ScalarValue::Null;
    }
    if value.fract() == 0.0 && value.abs() < MAX_EXACT_INTEGER {
        ScalarValue::Int(value as i64)
    } else {
        ScalarValue::Float(value)
    }
}

/// Type a raw cell: empty → null, true/false → bool, integer, finite float, otherwise text
pub fn parse_cell(raw: &str) -> ScalarValue {
    let trimmed = raw.trim();

    if raw.is_empty() {
        return ScalarValue::Null;
    }
    if trimmed.eq_ignore_ascii_case("true") {
        return ScalarValue::Bool(true);
    }
    if trimmed.eq_ignore_ascii_case("false") {
        return ScalarValue::Bool(false);
    }
    if let Ok(int) = trimmed.parse::<i64>() {
        return ScalarValue::Int(int);
    }
    if looks_numeric(trimmed) {
        if let Ok(float) = trimmed.parse::<f64>() {
            if float.is_finite() {
                return ScalarValue::Float(float);
            }
        }
    }

    ScalarValue::Text(raw.to_string())
}

// Rejects the textual forms Rust accepts but a spreadsheet would not ("inf", "NaN", "infinity")
fn looks_numeric(s: &str) -> bool {
    !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'))
}
