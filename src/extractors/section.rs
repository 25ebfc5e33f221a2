// src/extractors/section.rs

// --- Imports ---
use crate::questions::models::Level;

// --- Constants ---
// Anchor markers in semantic difficulty order. Lookup order does not matter:
// spans are ordered by where each marker first appears in the text.
pub const SECTION_MARKERS: [(&str, Level); 4] = [
    ("Easy Questions", Level::Easy),
    ("Medium Questions", Level::Medium),
    ("Hard Questions", Level::Hard),
    ("Very Hard Questions", Level::VeryHard),
];

// --- Data Structures ---
/// A contiguous byte range of the extracted text tagged with the level of the
/// marker that opens it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub level: Option<Level>,
}

impl Span {
    /// Slices the span out of the text it was located in.
    pub fn slice<'a>(&self, text: &'a str) -> &'a str {
        &text[self.start..self.end]
    }
}

// --- Main Locator Structure ---
pub struct SectionLocator {
    markers: Vec<(String, Level)>,
}

impl SectionLocator {
    pub fn new() -> Self {
        Self {
            markers: SECTION_MARKERS
                .iter()
                .map(|(marker, level)| (marker.to_string(), level.clone()))
                .collect(),
        }
    }

    /// Splits `text` into spans opened by the first occurrence of each marker.
    ///
    /// Text before the first marker is not covered. With no markers at all the
    /// whole text becomes one span without a level.
    pub fn locate(&self, text: &str) -> Vec<Span> {
        // 1. First occurrence of every marker that appears at all
        let mut boundaries: Vec<(usize, Option<Level>)> = self
            .markers
            .iter()
            .filter_map(|(marker, level)| text.find(marker.as_str()).map(|offset| (offset, Some(level.clone()))))
            .collect();

        if boundaries.is_empty() {
            tracing::debug!("No section markers found, treating {} bytes as one unlabelled span", text.len());
            return vec![Span { start: 0, end: text.len(), level: None }];
        }

        // 2. Order by appearance in the document, not by catalog order
        boundaries.sort_by_key(|(offset, _)| *offset);

        // 3. Terminal sentinel
        boundaries.push((text.len(), None));

        // 4. Consecutive boundaries form the spans
        let spans: Vec<Span> = boundaries
            .windows(2)
            .map(|pair| Span {
                start: pair[0].0,
                end: pair[1].0,
                level: pair[0].1.clone(),
            })
            .collect();

        for span in &spans {
            tracing::debug!(
                "Located span [{}, {}) level {:?}",
                span.start,
                span.end,
                span.level.as_ref().map(Level::label)
            );
        }

        spans
    }
}

impl Default for SectionLocator {
    fn default() -> Self {
        Self::new()
    }
}
