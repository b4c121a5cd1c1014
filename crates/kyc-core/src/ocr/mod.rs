//! Text-extraction providers.
//!
//! Two interchangeable providers turn an image file into raw text:
//! - [`VisionClient`]: Google Cloud Vision over HTTPS (primary)
//! - [`LocalOcr`]: PaddleOCR models run in-process via `pure-onnx-ocr`
//!   (fallback, feature `local-ocr`)
//!
//! The provider is chosen once from configuration; nothing switches
//! providers automatically when one fails.

#[cfg(feature = "local-ocr")]
mod local;
mod vision;

#[cfg(feature = "local-ocr")]
pub use local::LocalOcr;
pub use vision::VisionClient;

use std::path::Path;

use async_trait::async_trait;

use crate::error::{ConfigError, OcrError};
use crate::models::config::{KycConfig, OcrProviderKind};

/// Model file names expected in the local OCR model directory.
pub const DETECTION_MODEL: &str = "det.onnx";
pub const RECOGNITION_MODEL: &str = "latin_rec.onnx";
pub const DICTIONARY: &str = "latin_dict.txt";

/// Turns an image file into the text printed on it.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Short provider name for logs.
    fn name(&self) -> &str;

    /// Extract all recognized text from the image at `image_path`.
    async fn extract(&self, image_path: &Path) -> Result<String, OcrError>;
}

/// Build the provider selected by `pipeline.ocr_provider`.
pub fn build_extractor(config: &KycConfig) -> Result<Box<dyn TextExtractor>, ConfigError> {
    match config.pipeline.ocr_provider {
        OcrProviderKind::Primary => Ok(Box::new(VisionClient::from_config(&config.vision)?)),
        OcrProviderKind::Fallback => build_local(config),
    }
}

#[cfg(feature = "local-ocr")]
fn build_local(config: &KycConfig) -> Result<Box<dyn TextExtractor>, ConfigError> {
    let model_dir = config.local_ocr.resolved_model_dir();
    let engine = LocalOcr::from_dir(&model_dir, config.local_ocr.keep_unk).map_err(|e| {
        ConfigError::Unsupported(format!(
            "local OCR unavailable ({}): {}",
            model_dir.display(),
            e
        ))
    })?;
    Ok(Box::new(engine))
}

#[cfg(not(feature = "local-ocr"))]
fn build_local(_config: &KycConfig) -> Result<Box<dyn TextExtractor>, ConfigError> {
    Err(ConfigError::Unsupported(
        "fallback OCR requires the `local-ocr` feature".to_string(),
    ))
}

/// Treat whitespace-only output as a failed extraction.
pub(crate) fn non_blank(text: String) -> Result<String, OcrError> {
    if text.trim().is_empty() {
        Err(OcrError::NoText)
    } else {
        Ok(text)
    }
}
