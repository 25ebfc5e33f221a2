// src/storage/mod.rs
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use rust_xlsxwriter::Workbook;

use crate::questions::models::{Level, Record, COLUMN_HEADERS};
use crate::utils::error::StorageError;

pub const DEFAULT_EXPORT_NAME: &str = "soru_tablosu.xlsx";

/// Longest string Excel accepts in a single cell.
pub const XLSX_MAX_CELL_CHARS: usize = 32_767;

/// Serializes a record sequence into a downloadable blob.
pub trait ExportSink {
    fn export(&self, records: &[Record]) -> Result<Vec<u8>, StorageError>;

    fn mime_type(&self) -> &'static str;
}

/// Picks the sink matching the output file name: CSV for `.csv`, a workbook otherwise.
pub fn sink_for(file_name: &str) -> Box<dyn ExportSink> {
    if file_name.to_lowercase().ends_with(".csv") {
        Box::new(CsvExport)
    } else {
        Box::new(XlsxExport)
    }
}

// Fixed headers followed by every extra column in first-seen order.
fn header_row(records: &[Record]) -> Vec<String> {
    let mut headers: Vec<String> = COLUMN_HEADERS.iter().map(|h| h.to_string()).collect();
    for record in records {
        for (name, _) in &record.extra {
            if !headers.contains(name) {
                headers.push(name.clone());
            }
        }
    }
    headers
}

fn row_cells<'a>(record: &'a Record, headers: &[String]) -> Vec<&'a str> {
    let mut cells: Vec<&str> = record.fixed_cells().to_vec();
    for header in &headers[COLUMN_HEADERS.len()..] {
        let value = record
            .extra
            .iter()
            .find(|(name, _)| name == header)
            .map(|(_, value)| value.as_str())
            .unwrap_or("");
        cells.push(value);
    }
    cells
}

// Cuts a cell down to the workbook limit on a char boundary.
fn fit_cell<'a>(cell: &'a str, row: u32, col: u16) -> &'a str {
    match cell.char_indices().nth(XLSX_MAX_CELL_CHARS) {
        Some((end, _)) => {
            tracing::warn!(
                "Cell at row {} column {} exceeds {} characters, truncating",
                row,
                col,
                XLSX_MAX_CELL_CHARS
            );
            &cell[..end]
        }
        None => cell,
    }
}

/// Single-sheet XLSX workbook, header row first, no index column.
///
/// Cells longer than [`XLSX_MAX_CELL_CHARS`] are truncated. Use [`CsvExport`]
/// to keep oversized image payloads intact.
pub struct XlsxExport;

impl ExportSink for XlsxExport {
    fn export(&self, records: &[Record]) -> Result<Vec<u8>, StorageError> {
        let headers = header_row(records);
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();

        for (col, header) in headers.iter().enumerate() {
            worksheet.write_string(0, col as u16, fit_cell(header, 0, col as u16))?;
        }
        for (row, record) in records.iter().enumerate() {
            for (col, cell) in row_cells(record, &headers).into_iter().enumerate() {
                if !cell.is_empty() {
                    let (row, col) = (row as u32 + 1, col as u16);
                    worksheet.write_string(row, col, fit_cell(cell, row, col))?;
                }
            }
        }

        Ok(workbook.save_to_buffer()?)
    }

    fn mime_type(&self) -> &'static str {
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
    }
}

/// Comma-delimited text with a header row.
pub struct CsvExport;

impl ExportSink for CsvExport {
    fn export(&self, records: &[Record]) -> Result<Vec<u8>, StorageError> {
        let headers = header_row(records);
        let mut writer = csv::Writer::from_writer(Vec::new());

        writer
            .write_record(&headers)
            .map_err(|e| StorageError::CsvWriter(e.to_string()))?;
        for record in records {
            writer
                .write_record(row_cells(record, &headers))
                .map_err(|e| StorageError::CsvWriter(e.to_string()))?;
        }

        writer
            .into_inner()
            .map_err(|e| StorageError::CsvWriter(e.to_string()))
    }

    fn mime_type(&self) -> &'static str {
        "text/csv"
    }
}

pub struct StorageManager {
    base_dir: PathBuf,
}

impl StorageManager {
    /// Creates a new StorageManager with the specified base directory
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self, StorageError> {
        let base_path = base_dir.as_ref().to_path_buf();

        // Create the base directory if it doesn't exist
        if !base_path.exists() {
            fs::create_dir_all(&base_path)
                .map_err(StorageError::IoError)?;
        }

        Ok(Self { base_dir: base_path })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Writes an export blob under the base directory
    pub fn save_export(&self, file_name: &str, blob: &[u8]) -> Result<PathBuf, StorageError> {
        let file_path = self.base_dir.join(file_name);

        fs::write(&file_path, blob)
            .map_err(StorageError::IoError)?;

        tracing::info!("Saved export ({} bytes) to {}", blob.len(), file_path.display());

        Ok(file_path)
    }

    /// Saves a JSON sidecar describing an export next to it
    pub fn save_export_metadata(
        &self,
        file_name: &str,
        records: &[Record],
        sources: &[String],
        mime_type: &str,
    ) -> Result<PathBuf, StorageError> {
        let stem = Path::new(file_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("export");
        let file_path = self.base_dir.join(format!("{}_meta.json", stem));

        let mut levels: BTreeMap<&str, usize> = BTreeMap::new();
        for record in records {
            let label = record.level.as_ref().map(Level::label).unwrap_or("(none)");
            *levels.entry(label).or_default() += 1;
        }

        let metadata = serde_json::json!({
            "export_file": file_name,
            "mime_type": mime_type,
            "sources": sources,
            "record_count": records.len(),
            "records_with_image": records.iter().filter(|r| r.image.is_some()).count(),
            "records_with_answer_description": records.iter().filter(|r| r.answer_description.is_some()).count(),
            "levels": levels,
            "export_timestamp": chrono::Utc::now().to_rfc3339(),
        });

        let metadata_str = serde_json::to_string_pretty(&metadata)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;

        fs::write(&file_path, metadata_str)
            .map_err(StorageError::IoError)?;

        tracing::info!("Saved metadata to {}", file_path.display());

        Ok(file_path)
    }
}

// --- Tests ---
#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractors::tabular::TabularLoader;
    use crate::questions::models::RecordTemplate;

    fn sample_records() -> Vec<Record> {
        let template = RecordTemplate::default();
        let mut first = Record::from_template(&template, "A", Some(Level::Easy));
        first.image = Some("aW1n".to_string());
        let second = Record::from_template(&template, "D", Some(Level::VeryHard));
        let third = Record::from_template(&template, "C", None);
        vec![first, second, third]
    }

    #[test]
    fn test_workbook_round_trip_preserves_fields() {
        let records = sample_records();
        let blob = XlsxExport.export(&records).unwrap();
        assert_eq!(&blob[0..2], b"PK", "xlsx is a zip container");

        let loaded = TabularLoader::new().load_spreadsheet(&blob).unwrap();

        assert_eq!(loaded.len(), records.len());
        for (original, reloaded) in records.iter().zip(&loaded) {
            assert_eq!(reloaded.module, original.module);
            assert_eq!(reloaded.lesson, original.lesson);
            assert_eq!(reloaded.topic, original.topic);
            assert_eq!(reloaded.answer, original.answer);
            assert_eq!(reloaded.level, original.level);
        }
        assert_eq!(loaded[0].image.as_deref(), Some("aW1n"));
    }

    #[test]
    fn test_oversized_image_payload_is_truncated_in_workbook() {
        let mut records = sample_records();
        records[0].image = Some("A".repeat(40_000));

        let blob = XlsxExport.export(&records).unwrap();
        let loaded = TabularLoader::new().load_spreadsheet(&blob).unwrap();

        assert_eq!(loaded[0].image.as_ref().map(String::len), Some(XLSX_MAX_CELL_CHARS));
        assert_eq!(loaded[0].answer, "A");

        // CSV has no cell limit
        let blob = CsvExport.export(&records).unwrap();
        let loaded = TabularLoader::new().load_delimited(&blob).unwrap();
        assert_eq!(loaded[0].image.as_ref().map(String::len), Some(40_000));
    }

    #[test]
    fn test_fit_cell_respects_char_boundaries() {
        let long = "é".repeat(XLSX_MAX_CELL_CHARS + 5);
        let fitted = fit_cell(&long, 1, 0);
        assert_eq!(fitted.chars().count(), XLSX_MAX_CELL_CHARS);
        assert_eq!(fit_cell("short", 1, 0), "short");
    }

    #[test]
    fn test_csv_round_trip_keeps_extra_columns() {
        let mut records = sample_records();
        records[1].extra.push(("Source".to_string(), "mock exam".to_string()));

        let blob = CsvExport.export(&records).unwrap();
        let text = String::from_utf8(blob.clone()).unwrap();
        assert!(text.starts_with("Module,Lesson,Topic,Image,Answer,Answer Description,Level,Source\n"));

        let loaded = TabularLoader::new().load_delimited(&blob).unwrap();
        assert_eq!(loaded[1].extra, vec![("Source".to_string(), "mock exam".to_string())]);
        assert_eq!(loaded[0].extra, vec![("Source".to_string(), String::new())]);
        assert_eq!(loaded[2].level, None);
    }

    #[test]
    fn test_empty_sequence_exports_header_only() {
        let blob = CsvExport.export(&[]).unwrap();
        assert_eq!(
            String::from_utf8(blob).unwrap(),
            "Module,Lesson,Topic,Image,Answer,Answer Description,Level\n"
        );
    }

    #[test]
    fn test_sink_selection_by_name() {
        assert_eq!(sink_for("out.CSV").mime_type(), "text/csv");
        assert_eq!(
            sink_for(DEFAULT_EXPORT_NAME).mime_type(),
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
        );
    }

    #[test]
    fn test_storage_writes_export_and_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageManager::new(dir.path().join("nested")).unwrap();
        let records = sample_records();

        let export_path = storage.save_export("table.csv", b"Module\n").unwrap();
        assert_eq!(fs::read(&export_path).unwrap(), b"Module\n");

        let meta_path = storage
            .save_export_metadata("table.csv", &records, &["limits.pdf".to_string()], "text/csv")
            .unwrap();
        assert!(meta_path.ends_with("table_meta.json"));

        let meta: serde_json::Value = serde_json::from_str(&fs::read_to_string(meta_path).unwrap()).unwrap();
        assert_eq!(meta["record_count"], 3);
        assert_eq!(meta["records_with_image"], 1);
        assert_eq!(meta["levels"]["Very Hard"], 1);
        assert_eq!(meta["levels"]["(none)"], 1);
        assert_eq!(meta["sources"][0], "limits.pdf");
    }
}
