//! Spreadsheet ingestion for CSV and Excel (.xlsx/.xlsm/.xlsb) uploads.

use crate::table::{Cell, Table};
use anyhow::{Context, Result};
use calamine::{open_workbook_from_rs, Data, Reader, Xlsx, Xlsb};
use chrono::NaiveDateTime;
use std::io::Cursor;

/// One parsed worksheet.
#[derive(Debug, Clone)]
pub struct Sheet {
    pub name: String,
    pub table: Table,
}

/// Which worksheet of a workbook to analyze. CSV files always have a single
/// sheet; the default is the first one.
#[derive(Debug, Clone, PartialEq)]
pub enum SheetSelector {
    Index(usize),
    Name(String),
}

impl SheetSelector {
    /// Parse a query value: all digits → index, anything else → sheet name.
    pub fn parse(s: &str) -> Self {
        let trimmed = s.trim();
        if !trimmed.is_empty() && trimmed.chars().all(|c| c.is_ascii_digit()) {
            SheetSelector::Index(trimmed.parse().unwrap_or(0))
        } else {
            SheetSelector::Name(trimmed.to_string())
        }
    }
}

impl Default for SheetSelector {
    fn default() -> Self {
        SheetSelector::Index(0)
    }
}

/// Pick one sheet out of a parsed workbook.
pub fn select_sheet(sheets: Vec<Sheet>, selector: &SheetSelector) -> Result<Sheet> {
    let available: Vec<String> = sheets.iter().map(|s| s.name.clone()).collect();
    match selector {
        SheetSelector::Index(i) => {
            let count = sheets.len();
            sheets
                .into_iter()
                .nth(*i)
                .with_context(|| format!("Sheet index {} out of range ({} sheets)", i, count))
        }
        SheetSelector::Name(name) => sheets
            .into_iter()
            .find(|s| s.name == *name)
            .with_context(|| format!("No sheet named '{}'. Available: {:?}", name, available)),
    }
}

/// Dispatch file parsing by extension.
pub fn parse_file(filename: &str, data: &[u8]) -> Result<Vec<Sheet>> {
    let ext = filename.rsplit('.').next().unwrap_or("").to_lowercase();

    match ext.as_str() {
        "csv" => parse_csv(filename, data),
        "xlsx" | "xlsm" => parse_excel_xlsx(data),
        "xlsb" => parse_excel_xlsb(data),
        _ => anyhow::bail!(
            "Unsupported file type: .{}. Supported: .csv, .xlsx, .xlsm, .xlsb",
            ext
        ),
    }
}

/// Parse a CSV file into a single sheet. All cells are text; numeric and
/// date coercion happens later, per statistic.
fn parse_csv(filename: &str, data: &[u8]) -> Result<Vec<Sheet>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .has_headers(true)
        .from_reader(data);

    let headers: Vec<String> = reader
        .headers()
        .context("Failed to read CSV headers")?
        .iter()
        .map(|h| h.to_string())
        .collect();

    if headers.is_empty() {
        anyhow::bail!("CSV file has no headers");
    }

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.context("Failed to read CSV record")?;
        let row: Vec<Cell> = record
            .iter()
            .map(|f| {
                if f.trim().is_empty() {
                    Cell::Empty
                } else {
                    Cell::Text(f.to_string())
                }
            })
            .collect();
        rows.push(row);
    }

    let name = filename
        .rsplit('/')
        .next()
        .unwrap_or(filename)
        .rsplit('\\')
        .next()
        .unwrap_or(filename)
        .trim_end_matches(".csv")
        .to_string();

    Ok(vec![Sheet {
        name,
        table: Table::from_rows(headers, rows),
    }])
}

/// Parse an xlsx/xlsm workbook. All worksheets become separate sheets; the
/// first row of each is treated as headers.
fn parse_excel_xlsx(data: &[u8]) -> Result<Vec<Sheet>> {
    let cursor = Cursor::new(data.to_vec());
    let mut workbook: Xlsx<_> =
        open_workbook_from_rs(cursor).context("Failed to open Excel workbook")?;

    let sheet_names: Vec<String> = workbook.sheet_names().to_vec();
    let mut sheets = Vec::new();

    for name in &sheet_names {
        let range = match workbook.worksheet_range(name) {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!("Skipping sheet '{}': {}", name, e);
                continue;
            }
        };

        if let Some(sheet) = range_to_sheet(name, &range) {
            sheets.push(sheet);
        }
    }

    if sheets.is_empty() {
        anyhow::bail!("No sheets with data found in workbook");
    }

    Ok(sheets)
}

/// Parse an xlsb workbook.
fn parse_excel_xlsb(data: &[u8]) -> Result<Vec<Sheet>> {
    let cursor = Cursor::new(data.to_vec());
    let mut workbook: Xlsb<_> =
        open_workbook_from_rs(cursor).context("Failed to open Excel workbook")?;

    let sheet_names: Vec<String> = workbook.sheet_names().to_vec();
    let mut sheets = Vec::new();

    for name in &sheet_names {
        let range = match workbook.worksheet_range(name) {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!("Skipping sheet '{}': {}", name, e);
                continue;
            }
        };

        if let Some(sheet) = range_to_sheet(name, &range) {
            sheets.push(sheet);
        }
    }

    if sheets.is_empty() {
        anyhow::bail!("No sheets with data found in workbook");
    }

    Ok(sheets)
}

/// Convert a calamine range into a sheet. First row = headers. Sheets that
/// are empty or header-only are skipped, as are completely empty rows.
fn range_to_sheet(name: &str, range: &calamine::Range<Data>) -> Option<Sheet> {
    let mut row_iter = range.rows();

    let header_row = row_iter.next()?;
    let headers: Vec<String> = header_row.iter().map(header_to_string).collect();

    if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
        return None;
    }

    let mut rows = Vec::new();
    for row in row_iter {
        let cells: Vec<Cell> = row.iter().map(convert_cell).collect();
        if cells.iter().all(Cell::is_blank) {
            continue;
        }
        rows.push(cells);
    }

    if rows.is_empty() {
        return None;
    }

    Some(Sheet {
        name: name.to_string(),
        table: Table::from_rows(headers, rows),
    })
}

/// Header cells are always rendered to text, whatever their type.
fn header_to_string(cell: &Data) -> String {
    convert_cell(cell).render()
}

/// Convert a calamine cell into a typed cell. Error cells behave like
/// missing values so they never pollute distributions.
fn convert_cell(cell: &Data) -> Cell {
    match cell {
        Data::Empty => Cell::Empty,
        Data::String(s) => {
            if s.trim().is_empty() {
                Cell::Empty
            } else {
                Cell::Text(s.clone())
            }
        }
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Float(f) => Cell::Number(*f),
        Data::Bool(b) => Cell::Text(b.to_string()),
        Data::DateTime(dt) => dt.as_datetime().map(Cell::Date).unwrap_or(Cell::Empty),
        Data::DateTimeIso(s) => NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
            .map(Cell::Date)
            .unwrap_or_else(|_| Cell::Text(s.clone())),
        Data::DurationIso(s) => Cell::Text(s.clone()),
        Data::Error(_) => Cell::Empty,
    }
}
