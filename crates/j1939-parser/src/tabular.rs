//! Uniform cell access over the tabular shapes a log can arrive in.
//!
//! Row indices address data rows only; the header row is exposed through
//! [`Tabular::column_names`].

use calamine::{Data, Range};
use polars::prelude::*;

use crate::errors::ParserError;

pub trait Tabular {
    /// Sheet or table name used in log messages.
    fn name(&self) -> &str;
    fn row_count(&self) -> usize;
    fn column_names(&self) -> &[String];
    /// Trimmed cell text, `None` for empty or missing cells.
    fn cell(&self, row: usize, col: usize) -> Option<String>;

    fn column_count(&self) -> usize {
        self.column_names().len()
    }
}

fn clean(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn unnamed(idx: usize) -> String {
    format!("Unnamed: {idx}")
}

/// Delimited text split into a header and data rows.
#[derive(Debug, Clone)]
pub struct TextTable {
    name: String,
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl TextTable {
    pub fn parse(name: &str, text: &str, delimiter: u8) -> Result<Self, ParserError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(delimiter)
            .from_reader(text.as_bytes());

        let mut records = reader.records();
        let columns = match records.next() {
            Some(header) => header
                .map_err(|source| ParserError::Csv {
                    extractor: "text_table",
                    source,
                })?
                .iter()
                .enumerate()
                .map(|(idx, value)| clean(value).unwrap_or_else(|| unnamed(idx)))
                .collect(),
            None => Vec::new(),
        };

        let mut rows = Vec::new();
        for record in records {
            let record = record.map_err(|source| ParserError::Csv {
                extractor: "text_table",
                source,
            })?;
            rows.push(record.iter().map(str::to_string).collect());
        }

        Ok(Self {
            name: name.to_string(),
            columns,
            rows,
        })
    }
}

impl Tabular for TextTable {
    fn name(&self) -> &str {
        &self.name
    }

    fn row_count(&self) -> usize {
        self.rows.len()
    }

    fn column_names(&self) -> &[String] {
        &self.columns
    }

    fn cell(&self, row: usize, col: usize) -> Option<String> {
        self.rows.get(row)?.get(col).and_then(|value| clean(value))
    }
}

/// A worksheet read by calamine. The first used row is the header.
#[derive(Debug, Clone)]
pub struct SheetTable {
    name: String,
    columns: Vec<String>,
    range: Range<Data>,
}

impl SheetTable {
    pub fn new(name: &str, range: Range<Data>) -> Self {
        let columns = match range.rows().next() {
            Some(header) => header
                .iter()
                .enumerate()
                .map(|(idx, value)| sheet_text(value).unwrap_or_else(|| unnamed(idx)))
                .collect(),
            None => Vec::new(),
        };
        Self {
            name: name.to_string(),
            columns,
            range,
        }
    }
}

fn sheet_text(value: &Data) -> Option<String> {
    match value {
        Data::Empty | Data::Error(_) => None,
        Data::String(text) => clean(text),
        other => clean(&other.to_string()),
    }
}

impl Tabular for SheetTable {
    fn name(&self) -> &str {
        &self.name
    }

    fn row_count(&self) -> usize {
        self.range.height().saturating_sub(1)
    }

    fn column_names(&self) -> &[String] {
        &self.columns
    }

    fn cell(&self, row: usize, col: usize) -> Option<String> {
        self.range.get((row + 1, col)).and_then(sheet_text)
    }
}

/// An in-memory DataFrame, every column viewed as text.
#[derive(Debug, Clone)]
pub struct FrameTable {
    name: String,
    columns: Vec<String>,
    values: Vec<StringChunked>,
    height: usize,
}

impl FrameTable {
    pub fn new(name: &str, df: &DataFrame) -> PolarsResult<Self> {
        let mut columns = Vec::with_capacity(df.width());
        let mut values = Vec::with_capacity(df.width());
        for column in df.get_columns() {
            columns.push(column.name().to_string());
            let as_text = column.cast(&DataType::String)?;
            values.push(as_text.as_materialized_series().str()?.clone());
        }
        Ok(Self {
            name: name.to_string(),
            columns,
            values,
            height: df.height(),
        })
    }
}

impl Tabular for FrameTable {
    fn name(&self) -> &str {
        &self.name
    }

    fn row_count(&self) -> usize {
        self.height
    }

    fn column_names(&self) -> &[String] {
        &self.columns
    }

    fn cell(&self, row: usize, col: usize) -> Option<String> {
        self.values.get(col)?.get(row).and_then(clean)
    }
}
