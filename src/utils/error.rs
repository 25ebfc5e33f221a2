// src/utils/error.rs
use thiserror::Error;

// Define specific error types for different parts of the application
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Unsupported upload type: {0}")]
    UnsupportedUpload(String),

    #[error("PDF text extraction failed: {0}")]
    Pdf(String),

    #[error("Delimited text parsing failed: {0}")]
    Csv(#[from] csv::Error), // Automatically convert csv errors

    #[error("Spreadsheet parsing failed: {0}")]
    Spreadsheet(String),

    #[error("Uploaded text is not valid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
}

#[derive(Error, Debug)]
pub enum ImageError {
    #[error("Bitmap could not be decoded or encoded: {0}")]
    Bitmap(#[from] image::ImageError),

    #[error("Payload is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Workbook error: {0}")]
    Workbook(#[from] rust_xlsxwriter::XlsxError),

    #[error("CSV writer error: {0}")]
    CsvWriter(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    // No detail on purpose: the message must not reveal why the check failed.
    #[error("Access denied")]
    AccessDenied,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error), // Automatically convert IO errors

    #[error("Extraction failed: {0}")]
    Extraction(#[from] ExtractError),

    #[error("Image enrichment failed: {0}")]
    Image(#[from] ImageError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Data processing failed: {0}")]
    Processing(String),

    #[error("No record at index {index} (sequence has {len} records)")]
    RecordIndex { index: usize, len: usize },
}
