// src/extractors/record.rs
use crate::extractors::section::Span;
use crate::questions::models::{Level, Record, RecordTemplate};

// --- Constants ---
/// Trailing characters that mark a line as an answer line.
pub const ANSWER_CHOICES: [char; 4] = ['A', 'B', 'C', 'D'];

// Line boundaries recognised when splitting extracted text. Includes the form
// feed PDF extraction emits between pages.
fn is_line_break(c: char) -> bool {
    matches!(
        c,
        '\n' | '\r' | '\x0b' | '\x0c' | '\x1c' | '\x1d' | '\x1e' | '\u{85}' | '\u{2028}' | '\u{2029}'
    )
}

/// Splits text into lines on every line-break character.
///
/// A `\r\n` pair yields an extra empty line, which never qualifies and so never
/// shifts record positions.
pub fn split_lines(text: &str) -> impl Iterator<Item = &str> {
    text.split(is_line_break)
}

/// True when the trimmed line ends with one of the answer choices.
pub fn is_qualifying_line(line: &str) -> bool {
    line.trim().ends_with(&ANSWER_CHOICES[..])
}

/// Last whitespace-delimited token of the trimmed line.
///
/// For a qualifying line this is the token carrying the trailing choice letter,
/// i.e. the same character the qualifying test looked at.
pub fn answer_token(line: &str) -> &str {
    line.split_whitespace().last().unwrap_or_default()
}

/// Turns located spans into question records, carrying image enrichment over
/// from the previous sequence by position.
pub struct RecordExtractor {
    template: RecordTemplate,
}

impl RecordExtractor {
    pub fn new(template: RecordTemplate) -> Self {
        Self { template }
    }

    /// Extracts the records of every span, in span order.
    pub fn extract(&self, text: &str, spans: &[Span], previous: &[Record]) -> Vec<Record> {
        let mut records = Vec::new();
        for span in spans {
            let span_records = self.extract_span(span.slice(text), span.level.clone(), previous);
            tracing::debug!(
                "Span [{}, {}) level {:?} produced {} records",
                span.start,
                span.end,
                span.level.as_ref().map(Level::label),
                span_records.len()
            );
            records.extend(span_records);
        }
        records
    }

    /// Extracts the records of a single span.
    ///
    /// The i-th record emitted here reuses the enrichment stored at index i of
    /// `previous`. The counter restarts for every span, so carried-over images
    /// only line up while section boundaries stay where they were.
    pub fn extract_span(&self, span_text: &str, level: Option<Level>, previous: &[Record]) -> Vec<Record> {
        split_lines(span_text)
            .filter(|line| is_qualifying_line(line))
            .enumerate()
            .map(|(i, line)| {
                let mut record = Record::from_template(&self.template, answer_token(line.trim()), level.clone());
                if let Some(prior) = previous.get(i) {
                    record.image = prior.image.clone();
                    record.answer_description = prior.answer_description.clone();
                }
                record
            })
            .collect()
    }
}

impl Default for RecordExtractor {
    fn default() -> Self {
        Self::new(RecordTemplate::default())
    }
}
