// src/extractors/tabular.rs
use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use csv::ReaderBuilder;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::questions::models::{Level, Record};
use crate::utils::error::ExtractError;

// Headers produced for auto-index columns, e.g. "Unnamed: 0" when a table was
// written together with its row index.
static UNNAMED_HEADER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^Unnamed").expect("Failed to compile UNNAMED_HEADER_RE")
});

/// True for columns dropped on load: auto-index headers and blank headers.
pub fn is_unnamed_header(header: &str) -> bool {
    header.trim().is_empty() || UNNAMED_HEADER_RE.is_match(header)
}

/// Loads rows of an already tabular upload directly as records, one per row.
pub struct TabularLoader {
    delimiter: u8,
}

impl TabularLoader {
    pub fn new() -> Self {
        Self { delimiter: b',' }
    }

    pub fn with_delimiter(delimiter: u8) -> Self {
        Self { delimiter }
    }

    /// Loads delimited text whose first row is the header.
    pub fn load_delimited(&self, content: &[u8]) -> Result<Vec<Record>, ExtractError> {
        let mut reader = ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(true)
            .flexible(true)
            .from_reader(content);

        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

        let mut records = Vec::new();
        for (row_number, result) in reader.records().enumerate() {
            match result {
                Ok(row) => {
                    let cells: Vec<String> = row.iter().map(str::to_string).collect();
                    records.push(record_from_row(&headers, &cells));
                }
                Err(e) => {
                    tracing::warn!("Skipping unreadable row {}: {}", row_number + 1, e);
                }
            }
        }

        tracing::info!("Loaded {} records from delimited text ({} columns)", records.len(), headers.len());
        Ok(records)
    }

    /// Loads the first worksheet of a spreadsheet whose first row is the header.
    pub fn load_spreadsheet(&self, content: &[u8]) -> Result<Vec<Record>, ExtractError> {
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(content.to_vec()))
            .map_err(|e| ExtractError::Spreadsheet(e.to_string()))?;

        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| ExtractError::Spreadsheet("workbook contains no worksheets".to_string()))?
            .map_err(|e| ExtractError::Spreadsheet(e.to_string()))?;

        let mut rows = range.rows();
        let headers: Vec<String> = match rows.next() {
            Some(header_row) => header_row.iter().map(cell_text).collect(),
            None => {
                tracing::info!("Spreadsheet is empty, no records loaded");
                return Ok(Vec::new());
            }
        };

        let records: Vec<Record> = rows
            .map(|row| {
                let cells: Vec<String> = row.iter().map(cell_text).collect();
                record_from_row(&headers, &cells)
            })
            .collect();

        tracing::info!("Loaded {} records from spreadsheet ({} columns)", records.len(), headers.len());
        Ok(records)
    }
}

impl Default for TabularLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        other => other.to_string(),
    }
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Maps one row onto a record. Known headers fill the typed fields, everything
/// else is kept verbatim in `extra`. Missing trailing cells read as empty.
fn record_from_row(headers: &[String], cells: &[String]) -> Record {
    let mut record = Record::default();

    for (i, header) in headers.iter().enumerate() {
        if is_unnamed_header(header) {
            continue;
        }
        let value = cells.get(i).map(String::as_str).unwrap_or("");

        match header.as_str() {
            "Module" => record.module = value.to_string(),
            "Lesson" => record.lesson = value.to_string(),
            "Topic" => record.topic = value.to_string(),
            "Image" => record.image = non_empty(value),
            "Answer" => record.answer = value.to_string(),
            "Answer Description" => record.answer_description = non_empty(value),
            "Level" => record.level = Level::from_cell(value),
            _ => record.extra.push((header.clone(), value.to_string())),
        }
    }

    record
}
