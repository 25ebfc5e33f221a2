// src/main.rs
mod config;
mod enrichment;
mod extractors;
mod questions;
mod session;
mod storage;
mod utils;

use clap::Parser;
use config::{AppConfig, Args};
use session::{RenderModel, Session};
use storage::StorageManager;
use utils::AppError;

fn main() -> Result<(), AppError> {
    // 1. Setup Logging (reads RUST_LOG env var)
    utils::logging::setup_logging();

    // 2. Parse CLI Arguments
    let args = Args::parse();
    let config = AppConfig::from_args(args)?;
    tracing::info!(
        "Starting with {} input(s), {} attachment(s), output {}/{}",
        config.inputs.len(),
        config.attachments.len(),
        config.output_dir.display(),
        config.output_name
    );

    // 3. Initialize storage
    let storage = StorageManager::new(&config.output_dir)?;

    // 4. Open the session, unlocking it first when a gate is configured
    let mut session = Session::new(config.template.clone(), config.gate.clone());
    if !session.is_authenticated() {
        session.login(config.secret.as_deref().unwrap_or(""))?;
    }

    // 5. Upload each input in order
    let mut sources = Vec::new();
    let mut failure_count = 0;

    for path in &config.inputs {
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();

        let content = match std::fs::read(path) {
            Ok(content) => content,
            Err(e) => {
                tracing::error!("Failed to read {}: {}", path.display(), e);
                failure_count += 1;
                continue;
            }
        };

        let model = match session.handle_upload(&filename, &content) {
            Ok(model) => model,
            Err(AppError::Extraction(e)) => {
                tracing::error!("Failed to ingest {}: {}", path.display(), e);
                failure_count += 1;
                continue;
            }
            Err(e) => return Err(e),
        };

        if config.debug {
            if let Some(text) = session.source_text() {
                let debug_path = storage.base_dir().join(format!("{}_spans.txt", filename));
                if let Err(e) = utils::span_debug::save_debug_spans(text, session.sections(), &debug_path) {
                    tracing::warn!("Failed to create span debug dump: {}", e);
                }
            }
        }

        tracing::info!("{}: {} questions", filename, model.rows.len());
        sources.push(filename);
    }

    if sources.is_empty() {
        return Err(AppError::Processing(format!(
            "None of the {} input(s) could be ingested",
            failure_count
        )));
    }

    // 6. Apply image attachments against the final sequence
    for attach in &config.attachments {
        let result = std::fs::read(&attach.path)
            .map_err(AppError::from)
            .and_then(|bitmap| session.handle_attach_image(attach.index, attach.slot, &bitmap));
        if let Err(e) = result {
            tracing::error!("Failed to attach {} to question {}: {}", attach.path.display(), attach.index + 1, e);
            failure_count += 1;
        }
    }

    // 7. Preview
    let model = session.render()?;
    if config.preview_json {
        let json = serde_json::to_string_pretty(&model)
            .map_err(|e| AppError::Processing(format!("Failed to render preview: {}", e)))?;
        println!("{}", json);
    } else {
        print_preview(&model);
    }

    // 8. Export
    let sink = storage::sink_for(&config.output_name);
    let blob = session.handle_export(sink.as_ref())?;
    let export_path = storage.save_export(&config.output_name, &blob)?;
    match storage.save_export_metadata(&config.output_name, session.records(), &sources, sink.mime_type()) {
        Ok(path) => tracing::info!("Saved export metadata to: {}", path.display()),
        Err(e) => tracing::error!("Failed to save export metadata: {}", e),
    }

    tracing::info!(
        "Processing finished. Exported {} questions to {}. Failures: {}",
        session.records().len(),
        export_path.display(),
        failure_count
    );

    Ok(())
}

/// Prints the preview table to stdout.
fn print_preview(model: &RenderModel) {
    if model.rows.is_empty() {
        println!("No questions found.");
        return;
    }

    let level_width = model
        .rows
        .iter()
        .filter_map(|r| r.level.as_deref().map(str::len))
        .max()
        .unwrap_or(0)
        .max("Level".len());
    let answer_width = model
        .rows
        .iter()
        .map(|r| r.answer.len())
        .max()
        .unwrap_or(0)
        .max("Answer".len());

    println!(
        "{:>4}  {:<answer_width$}  {:<level_width$}  {:<12}  {:<12}",
        "#", "Answer", "Level", "Image", "Description"
    );
    for row in &model.rows {
        let image = row
            .image
            .as_ref()
            .map(|p| format!("{}x{}", p.width, p.height))
            .unwrap_or_else(|| "-".to_string());
        let description = row
            .answer_description
            .as_ref()
            .map(|p| format!("{}x{}", p.width, p.height))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:>4}  {:<answer_width$}  {:<level_width$}  {:<12}  {:<12}",
            row.number,
            row.answer,
            row.level.as_deref().unwrap_or("-"),
            image,
            description
        );
    }
}
