// src/config.rs
use std::path::PathBuf;
use std::str::FromStr;

use clap::Parser;

use crate::questions::models::{ImageSlot, RecordTemplate};
use crate::session::AccessGate;
use crate::storage::DEFAULT_EXPORT_NAME;
use crate::utils::AppError;

/// Command Line Interface for building a question table from exam documents
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Document to upload (pdf, txt, csv, tsv, xlsx, xls, ods). Repeat to upload
    /// several in order; each replaces the records of the previous one.
    #[arg(short, long, required = true)]
    pub input: Vec<PathBuf>,

    /// Attach an image to a question: INDEX:SLOT:PATH with a 0-based index and
    /// SLOT `image` or `description`. Applied after all uploads.
    #[arg(short, long)]
    pub attach: Vec<AttachSpec>,

    /// Output directory for the export and its metadata
    #[arg(short, long, default_value = "./output")]
    pub output_dir: PathBuf,

    /// Export file name; `.csv` writes delimited text, anything else a workbook
    #[arg(long, default_value = DEFAULT_EXPORT_NAME)]
    pub output_name: String,

    /// Module column value for questions extracted from text
    #[arg(long, default_value = "AP®")]
    pub module: String,

    /// Lesson column value for questions extracted from text
    #[arg(long, default_value = "Maths")]
    pub lesson: String,

    /// Topic column value for questions extracted from text
    #[arg(long, default_value = "Limits")]
    pub topic: String,

    /// Print the preview as JSON instead of a table
    #[arg(long)]
    pub preview_json: bool,

    /// Debug mode - save the extracted text annotated with section boundaries
    #[arg(short, long)]
    pub debug: bool,

    /// Shared secret for the access gate
    #[arg(long, env = "QUESTION_TABLE_SECRET", hide_env_values = true)]
    pub secret: Option<String>,

    /// Hex sha256(salt || secret); enables the access gate when set
    #[arg(long, env = "QUESTION_TABLE_ACCESS_HASH", hide_env_values = true)]
    pub access_hash: Option<String>,

    /// Salt prepended to the secret before hashing
    #[arg(long, env = "QUESTION_TABLE_ACCESS_SALT", default_value = "", hide_env_values = true)]
    pub access_salt: String,
}

/// One `--attach` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachSpec {
    pub index: usize,
    pub slot: ImageSlot,
    pub path: PathBuf,
}

impl FromStr for AttachSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // The path is last so it may itself contain ':'
        let mut parts = s.splitn(3, ':');
        let (index, slot, path) = match (parts.next(), parts.next(), parts.next()) {
            (Some(index), Some(slot), Some(path)) if !path.is_empty() => (index, slot, path),
            _ => return Err(format!("expected INDEX:SLOT:PATH, got '{}'", s)),
        };

        let index = index
            .trim()
            .parse::<usize>()
            .map_err(|e| format!("invalid question index '{}': {}", index, e))?;

        Ok(Self {
            index,
            slot: slot.parse()?,
            path: PathBuf::from(path),
        })
    }
}

/// Validated runtime configuration.
#[derive(Debug)]
pub struct AppConfig {
    pub inputs: Vec<PathBuf>,
    pub attachments: Vec<AttachSpec>,
    pub output_dir: PathBuf,
    pub output_name: String,
    pub template: RecordTemplate,
    pub preview_json: bool,
    pub debug: bool,
    pub gate: Option<AccessGate>,
    pub secret: Option<String>,
}

impl AppConfig {
    pub fn from_args(args: Args) -> Result<Self, AppError> {
        if args.output_name.trim().is_empty() {
            return Err(AppError::Config("output name must not be empty".to_string()));
        }
        if args.output_name.contains(&['/', '\\'][..]) {
            return Err(AppError::Config(format!(
                "output name '{}' must be a file name, use --output-dir for the directory",
                args.output_name
            )));
        }

        let gate = match args.access_hash.as_deref().map(str::trim) {
            Some(hash) if !hash.is_empty() => {
                if hash.len() != 64 || !hash.chars().all(|c| c.is_ascii_hexdigit()) {
                    return Err(AppError::Config("access hash must be 64 hex characters".to_string()));
                }
                Some(AccessGate::new(args.access_salt, hash))
            }
            _ => None,
        };

        Ok(Self {
            inputs: args.input,
            attachments: args.attach,
            output_dir: args.output_dir,
            output_name: args.output_name,
            template: RecordTemplate {
                module: args.module,
                lesson: args.lesson,
                topic: args.topic,
            },
            preview_json: args.preview_json,
            debug: args.debug,
            gate,
            secret: args.secret,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra: &[&str]) -> Args {
        let mut argv = vec!["question_table", "--input", "limits.pdf"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_args(parse(&[])).unwrap();

        assert_eq!(config.inputs, vec![PathBuf::from("limits.pdf")]);
        assert_eq!(config.output_name, "soru_tablosu.xlsx");
        assert_eq!(config.template, RecordTemplate::default());
        assert!(config.attachments.is_empty());
    }

    #[test]
    fn test_attach_spec_parsing() {
        let spec: AttachSpec = "2:description:C:\\imgs\\q3.png".parse().unwrap();
        assert_eq!(spec.index, 2);
        assert_eq!(spec.slot, ImageSlot::AnswerDescription);
        assert_eq!(spec.path, PathBuf::from("C:\\imgs\\q3.png"));

        assert!("x:image:a.png".parse::<AttachSpec>().is_err());
        assert!("1:image".parse::<AttachSpec>().is_err());
        assert!("1:cover:a.png".parse::<AttachSpec>().is_err());
    }

    #[test]
    fn test_attach_flags_are_collected_in_order() {
        let config = AppConfig::from_args(parse(&["--attach", "0:image:a.png", "--attach", "1:description:b.png"])).unwrap();
        assert_eq!(config.attachments.len(), 2);
        assert_eq!(config.attachments[1].slot, ImageSlot::AnswerDescription);
    }

    #[test]
    fn test_gate_requires_well_formed_hash() {
        let hash = AccessGate::hash_secret("salt", "pw");
        let config = AppConfig::from_args(parse(&["--access-hash", &hash, "--access-salt", "salt"])).unwrap();
        assert!(config.gate.is_some_and(|gate| gate.verify("pw")));

        let err = AppConfig::from_args(parse(&["--access-hash", "abc"])).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_output_name_must_be_a_file_name() {
        let err = AppConfig::from_args(parse(&["--output-name", "out/table.xlsx"])).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }
}
