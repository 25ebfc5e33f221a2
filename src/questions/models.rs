// src/questions/models.rs
use serde::{Serialize, Serializer};
use std::fmt;

/// Column headers of the exported table, in export order.
pub const COLUMN_HEADERS: [&str; 7] = [
    "Module",
    "Lesson",
    "Topic",
    "Image",
    "Answer",
    "Answer Description",
    "Level",
];

/// Difficulty label attached to a record by the section it was found in.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Level {
    Easy,
    Medium,
    Hard,
    VeryHard,
    /// Level text loaded verbatim from a tabular source that is not one of the known labels.
    Other(String),
}

impl Level {
    pub fn label(&self) -> &str {
        match self {
            Level::Easy => "Easy",
            Level::Medium => "Medium",
            Level::Hard => "Hard",
            Level::VeryHard => "Very Hard",
            Level::Other(text) => text,
        }
    }

    /// Parses a level cell from a tabular source. Empty cells mean "no level".
    ///
    /// Only exact labels map to known levels; any other text, padding
    /// included, is kept verbatim as `Other` so it exports unchanged.
    pub fn from_cell(cell: &str) -> Option<Level> {
        match cell {
            "" => None,
            "Easy" => Some(Level::Easy),
            "Medium" => Some(Level::Medium),
            "Hard" => Some(Level::Hard),
            "Very Hard" => Some(Level::VeryHard),
            _ => Some(Level::Other(cell.to_string())),
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for Level {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

/// Descriptive strings stamped on every record produced from text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordTemplate {
    pub module: String,
    pub lesson: String,
    pub topic: String,
}

impl Default for RecordTemplate {
    fn default() -> Self {
        Self {
            module: "AP®".to_string(),
            lesson: "Maths".to_string(),
            topic: "Limits".to_string(),
        }
    }
}

/// One exam question row. Its position in the session sequence is its only identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Record {
    #[serde(rename = "Module")]
    pub module: String,
    #[serde(rename = "Lesson")]
    pub lesson: String,
    #[serde(rename = "Topic")]
    pub topic: String,
    /// Base64 PNG of the question illustration.
    #[serde(rename = "Image")]
    pub image: Option<String>,
    #[serde(rename = "Answer")]
    pub answer: String,
    /// Base64 PNG of the explanation illustration.
    #[serde(rename = "Answer Description")]
    pub answer_description: Option<String>,
    #[serde(rename = "Level")]
    pub level: Option<Level>,
    /// Columns from a tabular source that are not part of the fixed header set, in source order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub extra: Vec<(String, String)>,
}

impl Record {
    pub fn from_template(template: &RecordTemplate, answer: &str, level: Option<Level>) -> Self {
        Self {
            module: template.module.clone(),
            lesson: template.lesson.clone(),
            topic: template.topic.clone(),
            image: None,
            answer: answer.to_string(),
            answer_description: None,
            level,
            extra: Vec::new(),
        }
    }

    /// Cell values in `COLUMN_HEADERS` order. Absent payloads and levels become empty cells.
    pub fn fixed_cells(&self) -> [&str; 7] {
        [
            self.module.as_str(),
            self.lesson.as_str(),
            self.topic.as_str(),
            self.image.as_deref().unwrap_or(""),
            self.answer.as_str(),
            self.answer_description.as_deref().unwrap_or(""),
            self.level.as_ref().map(Level::label).unwrap_or(""),
        ]
    }

    pub fn slot(&self, slot: ImageSlot) -> Option<&str> {
        match slot {
            ImageSlot::Question => self.image.as_deref(),
            ImageSlot::AnswerDescription => self.answer_description.as_deref(),
        }
    }

    pub fn slot_mut(&mut self, slot: ImageSlot) -> &mut Option<String> {
        match slot {
            ImageSlot::Question => &mut self.image,
            ImageSlot::AnswerDescription => &mut self.answer_description,
        }
    }
}

/// Which of the two image payloads of a record an attachment targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ImageSlot {
    Question,
    AnswerDescription,
}

impl std::str::FromStr for ImageSlot {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "image" | "question" => Ok(ImageSlot::Question),
            "description" | "answer-description" | "answer_description" => {
                Ok(ImageSlot::AnswerDescription)
            }
            other => Err(format!("unknown image slot '{}' (expected 'image' or 'description')", other)),
        }
    }
}
