// src/extractors/mod.rs
pub mod document;
pub mod record;
pub mod section;
pub mod tabular;

// Re-export key extraction types for convenience
pub use document::{extract_upload, Extracted};
pub use record::RecordExtractor;
pub use section::{SectionLocator, Span};
