#![allow(dead_code)]
//! Typed columnar table for spreadsheet-scale review data.
//!
//! Deliberately narrow: column lookup, per-column iteration, numeric and
//! date coercion-with-skip, and count/group-by aggregation. Not a general
//! data-analysis layer.

use chrono::{NaiveDate, NaiveDateTime};

/// A single cell value. Spreadsheet data is heterogeneous; anything that
/// fails type coercion later is skipped, not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Date(NaiveDateTime),
}

impl Cell {
    /// True for missing cells and whitespace-only text.
    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// String rendering used in distributions and samples.
    pub fn render(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.trim().to_string(),
            Cell::Number(n) => fmt_num(*n),
            Cell::Date(dt) => {
                if dt.time() == chrono::NaiveTime::MIN {
                    dt.date().format("%Y-%m-%d").to_string()
                } else {
                    dt.format("%Y-%m-%d %H:%M:%S").to_string()
                }
            }
        }
    }

    /// Numeric coercion. Text is parsed as a float; non-finite results and
    /// everything else are `None`.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(n) if n.is_finite() => Some(*n),
            Cell::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            _ => None,
        }
    }

    /// Date coercion. Text is tried against a fixed list of common formats.
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Cell::Date(dt) => Some(dt.date()),
            Cell::Text(s) => parse_date_str(s.trim()),
            _ => None,
        }
    }
}

/// Parse a date from its common textual forms (ISO first, then slash/dot
/// variants; `a/b/Y` is read month-first).
pub fn parse_date_str(s: &str) -> Option<NaiveDate> {
    if s.is_empty() {
        return None;
    }
    const DATETIME_FORMATS: [&str; 3] = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y/%m/%d %H:%M:%S",
    ];
    const DATE_FORMATS: [&str; 5] = ["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d", "%m/%d/%Y", "%Y%m%d"];

    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }
    None
}

/// Render a float without a trailing ".0" for whole numbers.
pub fn fmt_num(v: f64) -> String {
    if v == (v as i64) as f64 && v.abs() < i64::MAX as f64 {
        format!("{}", v as i64)
    } else {
        format!("{}", v)
    }
}

/// A named, ordered sequence of cells.
#[derive(Debug, Clone)]
pub struct Column {
    name: String,
    cells: Vec<Cell>,
}

impl Column {
    pub fn new(name: impl Into<String>, cells: Vec<Cell>) -> Self {
        Self {
            name: name.into(),
            cells,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// True when every cell is missing or whitespace-only.
    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(Cell::is_blank)
    }

    /// Trimmed, non-empty string renderings with their row indices.
    pub fn texts(&self) -> Vec<(usize, String)> {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, c)| !c.is_blank())
            .map(|(row, c)| (row, c.render()))
            .collect()
    }

    /// Row-indexed numeric values; cells that fail coercion are skipped.
    pub fn numeric_values(&self) -> Vec<(usize, f64)> {
        self.cells
            .iter()
            .enumerate()
            .filter_map(|(row, c)| c.as_number().map(|n| (row, n)))
            .collect()
    }

    /// Parseable dates in row order; unparseable cells are skipped.
    pub fn date_values(&self) -> Vec<NaiveDate> {
        self.cells.iter().filter_map(Cell::as_date).collect()
    }
}

/// Immutable columnar table. All columns have equal length.
#[derive(Debug, Clone)]
pub struct Table {
    columns: Vec<Column>,
    row_count: usize,
}

impl Table {
    pub fn new(columns: Vec<Column>) -> Self {
        let row_count = columns.first().map(Column::len).unwrap_or(0);
        debug_assert!(columns.iter().all(|c| c.len() == row_count));
        Self { columns, row_count }
    }

    /// Build from a header row plus data rows. Short rows are padded with
    /// empty cells, long rows truncated, so the equal-length invariant holds.
    pub fn from_rows(headers: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        let width = headers.len();
        let mut columns: Vec<Column> = headers
            .into_iter()
            .map(|h| Column::new(h, Vec::with_capacity(rows.len())))
            .collect();

        for mut row in rows {
            row.resize(width, Cell::Empty);
            for (col, cell) in columns.iter_mut().zip(row) {
                col.cells.push(cell);
            }
        }

        Self::new(columns)
    }

    pub fn headers(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name()).collect()
    }

    /// Column lookup by identifier; first match wins on duplicate headers.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name() == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// True when the table has no columns or no rows.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty() || self.row_count == 0
    }
}

/// Count occurrences of each value, preserving first-encountered order, then
/// sort descending by count. The stable sort keeps first-encountered order
/// for ties, so the result is deterministic.
pub fn value_counts<I>(values: I) -> Vec<(String, usize)>
where
    I: IntoIterator<Item = String>,
{
    let mut counts: Vec<(String, usize)> = Vec::new();
    for value in values {
        match counts.iter_mut().find(|(v, _)| *v == value) {
            Some((_, n)) => *n += 1,
            None => counts.push((value, 1)),
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
}
