// src/session/mod.rs
//! Session-scoped state and the handlers invoked once per operator action.
//!
//! Every handler runs to completion synchronously against `&mut Session`; the
//! record sequence is never shared between sessions and never persisted.

pub mod access;

use serde::Serialize;

use crate::enrichment::{self, ImagePreview};
use crate::extractors::{extract_upload, Extracted, RecordExtractor, SectionLocator, Span};
use crate::questions::models::{ImageSlot, Level, Record, RecordTemplate};
use crate::storage::ExportSink;
use crate::utils::AppError;

pub use access::AccessGate;

/// One preview row.
#[derive(Debug, Clone, Serialize)]
pub struct RecordView {
    /// 1-based question number shown to the operator.
    pub number: usize,
    pub module: String,
    pub lesson: String,
    pub topic: String,
    pub answer: String,
    pub level: Option<String>,
    pub image: Option<ImagePreview>,
    pub answer_description: Option<ImagePreview>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub extra: Vec<(String, String)>,
}

/// What the operator sees after a handler ran.
#[derive(Debug, Clone, Serialize)]
pub struct RenderModel {
    /// Sections located in the last text upload; empty for tabular uploads.
    pub sections: Vec<SectionView>,
    pub rows: Vec<RecordView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SectionView {
    pub start: usize,
    pub end: usize,
    pub level: Option<String>,
}

impl From<&Span> for SectionView {
    fn from(span: &Span) -> Self {
        Self {
            start: span.start,
            end: span.end,
            level: span.level.as_ref().map(|l| l.label().to_string()),
        }
    }
}

pub struct Session {
    records: Vec<Record>,
    // Text and sections of the last text upload; empty after a tabular upload.
    source_text: String,
    sections: Vec<Span>,
    authenticated: bool,
    gate: Option<AccessGate>,
    locator: SectionLocator,
    extractor: RecordExtractor,
}

impl Session {
    /// Starts a session. Without a gate the session is open from the start.
    pub fn new(template: RecordTemplate, gate: Option<AccessGate>) -> Self {
        let mut session = Self {
            records: Vec::new(),
            source_text: String::new(),
            sections: Vec::new(),
            authenticated: false,
            gate,
            locator: SectionLocator::new(),
            extractor: RecordExtractor::new(template),
        };
        session.reset();
        session
    }

    /// Drops all records and, when gated, requires a fresh login.
    pub fn reset(&mut self) {
        self.records.clear();
        self.source_text.clear();
        self.sections.clear();
        self.authenticated = self.gate.is_none();
        tracing::debug!("Session reset (gated: {})", self.gate.is_some());
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Text the current sections were located in, if the last upload was text.
    pub fn source_text(&self) -> Option<&str> {
        if self.sections.is_empty() {
            None
        } else {
            Some(&self.source_text)
        }
    }

    pub fn sections(&self) -> &[Span] {
        &self.sections
    }

    pub fn login(&mut self, secret: &str) -> Result<(), AppError> {
        match &self.gate {
            None => Ok(()),
            Some(gate) if gate.verify(secret) => {
                self.authenticated = true;
                tracing::info!("Session unlocked");
                Ok(())
            }
            Some(_) => {
                tracing::warn!("Rejected access attempt");
                Err(AppError::AccessDenied)
            }
        }
    }

    fn ensure_access(&self) -> Result<(), AppError> {
        if self.authenticated {
            Ok(())
        } else {
            Err(AppError::AccessDenied)
        }
    }

    /// Upload handler: ingests a file and replaces the record sequence.
    ///
    /// On an extraction error the current sequence is left as it was.
    pub fn handle_upload(&mut self, filename: &str, content: &[u8]) -> Result<RenderModel, AppError> {
        self.ensure_access()?;
        match extract_upload(filename, content)? {
            Extracted::Text(text) => self.handle_text(&text),
            Extracted::Table(records) => {
                tracing::info!("Loaded {} records from tabular upload", records.len());
                self.source_text.clear();
                self.sections.clear();
                self.records = records;
                self.render()
            }
        }
    }

    /// Text handler: locates sections and re-extracts records, carrying
    /// enrichment over from the current sequence by position.
    pub fn handle_text(&mut self, text: &str) -> Result<RenderModel, AppError> {
        self.ensure_access()?;
        let spans = self.locator.locate(text);
        let records = self.extractor.extract(text, &spans, &self.records);

        let carried = records
            .iter()
            .filter(|r| r.image.is_some() || r.answer_description.is_some())
            .count();
        tracing::info!(
            "Extracted {} records from {} sections ({} previous, {} with carried-over images)",
            records.len(),
            spans.len(),
            self.records.len(),
            carried
        );

        self.source_text = text.to_string();
        self.sections = spans;
        self.records = records;
        self.render()
    }

    /// Attach handler: re-encodes the bitmap as PNG and stores it on record `index`.
    pub fn handle_attach_image(
        &mut self,
        index: usize,
        slot: ImageSlot,
        bitmap: &[u8],
    ) -> Result<RenderModel, AppError> {
        self.ensure_access()?;
        let len = self.records.len();
        let record = self
            .records
            .get_mut(index)
            .ok_or(AppError::RecordIndex { index, len })?;

        let encoded = enrichment::encode_attachment(bitmap)?;
        *record.slot_mut(slot) = Some(encoded);
        tracing::info!("Attached {:?} image to question {}", slot, index + 1);

        self.render()
    }

    /// Export handler: hands the current sequence to the sink.
    pub fn handle_export(&self, sink: &dyn ExportSink) -> Result<Vec<u8>, AppError> {
        self.ensure_access()?;
        let blob = sink.export(&self.records)?;
        tracing::info!("Exported {} records ({} bytes, {})", self.records.len(), blob.len(), sink.mime_type());
        Ok(blob)
    }

    pub fn render(&self) -> Result<RenderModel, AppError> {
        self.ensure_access()?;
        let rows = self
            .records
            .iter()
            .enumerate()
            .map(|(i, record)| RecordView {
                number: i + 1,
                module: record.module.clone(),
                lesson: record.lesson.clone(),
                topic: record.topic.clone(),
                answer: record.answer.clone(),
                level: record.level.as_ref().map(Level::label).map(str::to_string),
                image: enrichment::preview(record.slot(ImageSlot::Question)),
                answer_description: enrichment::preview(record.slot(ImageSlot::AnswerDescription)),
                extra: record.extra.clone(),
            })
            .collect();

        Ok(RenderModel {
            sections: self.sections.iter().map(SectionView::from).collect(),
            rows,
        })
    }
}

// --- Tests ---
#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrichment::tests::sample_bitmap;
    use crate::storage::CsvExport;
    use image::ImageFormat;

    fn open_session() -> Session {
        Session::new(RecordTemplate::default(), None)
    }

    fn png() -> Vec<u8> {
        sample_bitmap(ImageFormat::Png, 2, 2)
    }

    #[test]
    fn test_text_upload_renders_rows_and_sections() {
        let mut session = open_session();
        let text = "Easy Questions\nx=1 A\nEasy line no marker\nMedium Questions\ny=2 D\n";

        let model = session.handle_upload("limits.txt", text.as_bytes()).unwrap();

        assert_eq!(model.sections.len(), 2);
        assert_eq!(model.sections[0].level.as_deref(), Some("Easy"));
        assert_eq!(model.rows.len(), 2);
        assert_eq!(model.rows[1].number, 2);
        assert_eq!(model.rows[1].answer, "D");
        assert_eq!(model.rows[1].level.as_deref(), Some("Medium"));
        assert_eq!(session.source_text(), Some(text));
        assert_eq!(session.sections().len(), 2);
    }

    #[test]
    fn test_attach_then_reupload_carries_images_by_position() {
        let mut session = open_session();
        let text = "Easy Questions\nq1 A\nq2 B\nq3 C\n";
        session.handle_text(text).unwrap();

        let model = session.handle_attach_image(1, ImageSlot::Question, &png()).unwrap();
        assert_eq!(model.rows[1].image.as_ref().map(|p| p.width), Some(2));
        assert!(model.rows[0].image.is_none());

        session
            .handle_attach_image(1, ImageSlot::AnswerDescription, &sample_bitmap(ImageFormat::Bmp, 3, 1))
            .unwrap();

        // Same text again: the enrichment survives re-extraction.
        let model = session.handle_text(text).unwrap();
        assert!(model.rows[1].image.is_some());
        assert_eq!(model.rows[1].answer_description.as_ref().map(|p| p.width), Some(3));
    }

    #[test]
    fn test_reupload_with_fewer_records_truncates_without_error() {
        let mut session = open_session();
        session.handle_text("Easy Questions\nq1 A\nq2 B\nq3 C\n").unwrap();
        session.handle_attach_image(2, ImageSlot::Question, &png()).unwrap();

        let model = session.handle_text("Easy Questions\nn1 D\nn2 A\n").unwrap();

        assert_eq!(model.rows.len(), 2);
        assert!(model.rows.iter().all(|r| r.image.is_none()));
        assert_eq!(session.records().len(), 2);
    }

    #[test]
    fn test_attach_out_of_range_is_rejected() {
        let mut session = open_session();
        session.handle_text("1) only A\n").unwrap();

        let result = session.handle_attach_image(5, ImageSlot::Question, &png());
        assert!(matches!(result, Err(AppError::RecordIndex { index: 5, len: 1 })));
    }

    #[test]
    fn test_bad_bitmap_leaves_record_untouched() {
        let mut session = open_session();
        session.handle_text("1) only A\n").unwrap();

        assert!(session.handle_attach_image(0, ImageSlot::Question, b"nope").is_err());
        assert!(session.records()[0].image.is_none());
    }

    #[test]
    fn test_malformed_stored_payload_is_suppressed_and_still_exported() {
        let mut session = open_session();
        let csv = "Module,Answer,Image\nAP,A,@@broken@@\n";
        let model = session.handle_upload("prev.csv", csv.as_bytes()).unwrap();

        assert!(model.sections.is_empty());
        assert!(model.rows[0].image.is_none());

        let blob = session.handle_export(&CsvExport).unwrap();
        assert!(String::from_utf8(blob).unwrap().contains("@@broken@@"));
    }

    #[test]
    fn test_tabular_upload_replaces_sequence_without_carry_over() {
        let mut session = open_session();
        session.handle_text("Easy Questions\nq1 A\n").unwrap();
        session.handle_attach_image(0, ImageSlot::Question, &png()).unwrap();

        let csv = "Unnamed: 0,Module,Answer\n0,AP®,C\n";
        let model = session.handle_upload("table.csv", csv.as_bytes()).unwrap();

        assert_eq!(model.rows.len(), 1);
        assert_eq!(model.rows[0].module, "AP®");
        assert!(model.rows[0].image.is_none());
        assert!(session.records()[0].image.is_none());
        assert_eq!(session.source_text(), None);
    }

    #[test]
    fn test_failed_upload_keeps_previous_sequence() {
        let mut session = open_session();
        session.handle_text("Easy Questions\nq1 A\n").unwrap();

        assert!(session.handle_upload("deck.pptx", b"PK\x03\x04").is_err());
        assert_eq!(session.records().len(), 1);
    }

    #[test]
    fn test_gate_blocks_every_handler_until_login() {
        let salt = "s";
        let gate = AccessGate::new(salt, &AccessGate::hash_secret(salt, "letmein"));
        let mut session = Session::new(RecordTemplate::default(), Some(gate));

        assert!(!session.is_authenticated());
        assert!(matches!(session.handle_text("q A"), Err(AppError::AccessDenied)));
        assert!(matches!(session.render(), Err(AppError::AccessDenied)));
        assert!(matches!(session.handle_export(&CsvExport), Err(AppError::AccessDenied)));

        let denied = session.login("wrong").unwrap_err();
        assert_eq!(denied.to_string(), "Access denied");

        session.login("letmein").unwrap();
        assert_eq!(session.handle_text("q A").unwrap().rows.len(), 1);

        session.reset();
        assert!(!session.is_authenticated());
        assert!(session.records().is_empty());
    }

    #[test]
    fn test_reset_clears_records_of_open_session() {
        let mut session = open_session();
        session.handle_text("q A\n").unwrap();
        session.reset();

        assert!(session.is_authenticated());
        assert!(session.render().unwrap().rows.is_empty());
        assert_eq!(session.source_text(), None);
        assert!(session.sections().is_empty());
    }
}
