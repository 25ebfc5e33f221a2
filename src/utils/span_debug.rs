// src/utils/span_debug.rs
use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::extractors::section::Span;
use crate::extractors::record::{is_qualifying_line, split_lines};
use crate::utils::error::AppError;

/// Renders extracted text with a banner at every span boundary and a `>>` in
/// front of each line that produces a record.
pub fn annotate_spans(text: &str, spans: &[Span]) -> String {
    let mut annotated = String::new();

    // Preamble before the first marker is shown but flagged as ignored
    let first_start = spans.first().map(|s| s.start).unwrap_or(text.len());
    if first_start > 0 {
        annotated.push_str(&format!("==== ignored preamble [0, {}) ====\n", first_start));
        annotated.push_str(&text[..first_start]);
        annotated.push('\n');
    }

    for (i, span) in spans.iter().enumerate() {
        let level = span.level.as_ref().map(|l| l.label()).unwrap_or("(no level)");
        annotated.push_str(&format!("==== span {} [{}, {}) {} ====\n", i, span.start, span.end, level));

        for line in split_lines(span.slice(text)) {
            if is_qualifying_line(line) {
                annotated.push_str(">> ");
            } else {
                annotated.push_str("   ");
            }
            annotated.push_str(line);
            annotated.push('\n');
        }
    }

    annotated
}

/// Saves the annotated text to a file for debugging section boundaries
pub fn save_debug_spans(text: &str, spans: &[Span], filename: &Path) -> Result<(), AppError> {
    let mut file = File::create(filename)?;
    file.write_all(annotate_spans(text, spans).as_bytes())?;

    tracing::info!("Saved span debug dump to {}", filename.display());
    Ok(())
}
