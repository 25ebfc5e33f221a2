// src/extractors/document.rs
use std::path::Path;

use crate::extractors::tabular::TabularLoader;
use crate::questions::models::Record;
use crate::utils::error::ExtractError;

/// How an uploaded file is ingested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Page-structured document, linearized to text.
    Pdf,
    /// Already linear text.
    PlainText,
    /// Delimited text with the given separator.
    Delimited(u8),
    Spreadsheet,
}

impl SourceKind {
    /// Detects the kind from the file extension, falling back to the PDF magic bytes.
    pub fn detect(filename: &str, content: &[u8]) -> Result<Self, ExtractError> {
        let extension = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "pdf" => Ok(SourceKind::Pdf),
            "txt" => Ok(SourceKind::PlainText),
            "csv" => Ok(SourceKind::Delimited(b',')),
            "tsv" => Ok(SourceKind::Delimited(b'\t')),
            "xlsx" | "xlsm" | "xls" | "ods" => Ok(SourceKind::Spreadsheet),
            _ if is_pdf_magic(content) => Ok(SourceKind::Pdf),
            _ => Err(ExtractError::UnsupportedUpload(filename.to_string())),
        }
    }
}

/// Result of ingesting one upload.
#[derive(Debug)]
pub enum Extracted {
    /// Linear text that still has to go through section location and record extraction.
    Text(String),
    /// Rows of a tabular source, already records.
    Table(Vec<Record>),
}

/// Converts an uploaded file into text or, for tabular sources, records.
pub fn extract_upload(filename: &str, content: &[u8]) -> Result<Extracted, ExtractError> {
    let kind = SourceKind::detect(filename, content)?;
    tracing::info!("Ingesting '{}' ({} bytes) as {:?}", filename, content.len(), kind);

    match kind {
        SourceKind::Pdf => {
            // pdf-extract panics on some malformed documents instead of returning an error
            let text = std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(content))
                .map_err(|_| ExtractError::Pdf("document could not be parsed".to_string()))?
                .map_err(|e| ExtractError::Pdf(e.to_string()))?;
            tracing::debug!("Extracted {} bytes of text from PDF", text.len());
            Ok(Extracted::Text(text))
        }
        SourceKind::PlainText => {
            let text = String::from_utf8(content.to_vec())?;
            Ok(Extracted::Text(text.trim_start_matches('\u{feff}').to_string()))
        }
        SourceKind::Delimited(delimiter) => {
            let content = content.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(content);
            let records = TabularLoader::with_delimiter(delimiter).load_delimited(content)?;
            Ok(Extracted::Table(records))
        }
        SourceKind::Spreadsheet => {
            let records = TabularLoader::new().load_spreadsheet(content)?;
            Ok(Extracted::Table(records))
        }
    }
}

/// Check if bytes start with the PDF magic number, after an optional BOM or whitespace.
fn is_pdf_magic(bytes: &[u8]) -> bool {
    let trimmed = bytes
        .iter()
        .skip_while(|&&b| b == 0xEF || b == 0xBB || b == 0xBF || b.is_ascii_whitespace())
        .take(4)
        .copied()
        .collect::<Vec<_>>();

    trimmed.starts_with(b"%PDF")
}
