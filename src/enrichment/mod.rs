// src/enrichment/mod.rs
use std::io::Cursor;

use base64::{engine::general_purpose, Engine as _};
use image::ImageFormat;
use serde::Serialize;

use crate::utils::error::ImageError;

/// Re-encodes an arbitrary bitmap (PNG, JPEG, GIF, BMP) as PNG and returns it base64 encoded.
pub fn encode_attachment(bitmap: &[u8]) -> Result<String, ImageError> {
    let img = image::load_from_memory(bitmap)?;

    let mut png = Vec::new();
    img.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;

    tracing::debug!(
        "Re-encoded {}x{} attachment to PNG ({} -> {} bytes)",
        img.width(),
        img.height(),
        bitmap.len(),
        png.len()
    );
    Ok(general_purpose::STANDARD.encode(png))
}

/// Decodes a stored payload back to image bytes. Accepts an optional data URL prefix
/// (e.g. "data:image/png;base64,iVBORw0KGgo...").
pub fn decode_payload(payload: &str) -> Result<Vec<u8>, ImageError> {
    let payload = payload.trim();
    let base64_data = if payload.starts_with("data:") {
        payload
            .find(',')
            .map(|pos| &payload[(pos + 1)..])
            .unwrap_or(payload)
    } else {
        payload
    };

    Ok(general_purpose::STANDARD.decode(base64_data)?)
}

/// What the preview shows for one stored image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImagePreview {
    pub width: u32,
    pub height: u32,
    pub png_bytes: usize,
}

/// Decodes a stored payload for display.
///
/// Malformed payloads are suppressed: the record simply shows no image.
pub fn preview(payload: Option<&str>) -> Option<ImagePreview> {
    let payload = payload?;
    match inspect(payload) {
        Ok(found) => Some(found),
        Err(e) => {
            tracing::warn!("Suppressing undecodable image payload ({} chars): {}", payload.len(), e);
            None
        }
    }
}

fn inspect(payload: &str) -> Result<ImagePreview, ImageError> {
    let bytes = decode_payload(payload)?;
    let img = image::load_from_memory(&bytes)?;
    Ok(ImagePreview {
        width: img.width(),
        height: img.height(),
        png_bytes: bytes.len(),
    })
}
