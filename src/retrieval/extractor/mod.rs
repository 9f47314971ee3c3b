
use anyhow::{Context, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tracing::{debug, warn};

pub const IMAGE_PLACEHOLDER: &str = "[image detected: OCR not implemented yet]";

/// Pulls text out of an attached image.
///
/// Implementations receive decoded image bytes; base64 handling and failure
/// placeholders live in [`describe_image`].
pub trait TextExtractor: Send + Sync {
    fn extract(&self, image: &[u8]) -> Result<String>;
}

/// Confirms the payload is a readable image and answers with a fixed marker instead of OCR output
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderExtractor;

impl TextExtractor for PlaceholderExtractor {
    #[inline]
    fn extract(&self, image: &[u8]) -> Result<String> {
        let decoded = image::load_from_memory(image).context("unrecognized image data")?;
        debug!(
            "Decoded {}x{} image attachment",
            decoded.width(),
            decoded.height()
        );
        Ok(IMAGE_PLACEHOLDER.to_string())
    }
}

/// Text standing in for an attached base64 image. Never fails: problems become a
/// `[image decode error: ...]` marker.
#[inline]
pub fn describe_image(extractor: &dyn TextExtractor, payload: &str) -> String {
    let result = decode_base64(payload).and_then(|bytes| extractor.extract(&bytes));
    match result {
        Ok(text) => text,
        Err(e) => {
            warn!("Could not read attached image: {:#}", e);
            format!("[image decode error: {:#}]", e)
        }
    }
}

/// Decode standard base64, accepting an optional `data:<mime>;base64,` prefix and
/// embedded whitespace
fn decode_base64(payload: &str) -> Result<Vec<u8>> {
    let trimmed = payload.trim();
    let encoded = match trimmed.split_once(";base64,") {
        Some((prefix, rest)) if prefix.starts_with("data:") => rest,
        _ => trimmed,
    };
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();

    STANDARD
        .decode(compact.as_bytes())
        .context("invalid base64 payload")
}
