//! Configuration structures for the ingestion pipeline.
//!
//! API keys are never stored here; each service section names the
//! environment variable the key is read from.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Main configuration for the kyc pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KycConfig {
    /// Batch inputs and outputs.
    pub pipeline: PipelineConfig,

    /// Primary (network) OCR provider.
    pub vision: VisionConfig,

    /// Text-transformation service.
    pub llm: LlmConfig,

    /// Fallback (local) OCR provider.
    pub local_ocr: LocalOcrConfig,

    /// Record validation rules.
    pub record: RecordConfig,
}

/// Which text-extraction provider the batch uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OcrProviderKind {
    /// Google Cloud Vision.
    #[default]
    Primary,
    /// Local PaddleOCR models.
    Fallback,
}

impl std::fmt::Display for OcrProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OcrProviderKind::Primary => write!(f, "primary"),
            OcrProviderKind::Fallback => write!(f, "fallback"),
        }
    }
}

/// Batch configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Directory scanned for `.jpg`, `.jpeg` and `.png` images.
    pub input_dir: PathBuf,

    /// JSON file holding the record collection.
    pub output_file: PathBuf,

    /// Text-extraction provider.
    pub ocr_provider: OcrProviderKind,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("data/images"),
            output_file: PathBuf::from("data/output.json"),
            ocr_provider: OcrProviderKind::Primary,
        }
    }
}

/// Google Cloud Vision configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VisionConfig {
    /// `images:annotate` endpoint.
    pub endpoint: String,

    /// Environment variable holding the API key.
    pub api_key_env: String,

    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://vision.googleapis.com/v1/images:annotate".to_string(),
            api_key_env: "GOOGLE_VISION_API_KEY".to_string(),
            timeout_secs: 60,
        }
    }
}

/// OpenAI-compatible chat completion service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Base URL; `/chat/completions` is appended.
    pub base_url: String,

    /// Model identifier.
    pub model: String,

    /// Environment variable holding the API key.
    pub api_key_env: String,

    /// Sampling temperature, service default when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.fireworks.ai/inference/v1".to_string(),
            model: "accounts/fireworks/models/llama-v3p1-8b-instruct".to_string(),
            api_key_env: "FIREWORKS_API_KEY".to_string(),
            temperature: None,
            timeout_secs: 120,
        }
    }
}

/// Local OCR configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalOcrConfig {
    /// Directory with `det.onnx`, `latin_rec.onnx` and `latin_dict.txt`.
    /// Falls back to the per-user data directory when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_dir: Option<PathBuf>,

    /// Keep `[UNK]` tokens emitted by the recognizer.
    pub keep_unk: bool,

    /// Base URL the model files are downloaded from (`<url>/det.onnx`, ...).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_base_url: Option<String>,
}

impl LocalOcrConfig {
    /// Resolved model directory.
    pub fn resolved_model_dir(&self) -> PathBuf {
        self.model_dir.clone().unwrap_or_else(default_model_dir)
    }
}

/// Default location for downloaded local OCR models.
pub fn default_model_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("kyc")
        .join("models")
}

/// Record validation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordConfig {
    /// Longest accepted document number; longer values are rejected.
    pub document_number_max_len: usize,
}

impl Default for RecordConfig {
    fn default() -> Self {
        Self {
            document_number_max_len: 10,
        }
    }
}

impl KycConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Parse(format!("{}: {}", path.display(), e)))?;
        serde_json::from_str(&content)
            .map_err(|e| ConfigError::Parse(format!("{}: {}", path.display(), e)))
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }
}

/// Read a secret from the environment.
pub fn env_secret(var: &str) -> Result<String, ConfigError> {
    match std::env::var(var) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::MissingEnv(var.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let json = r#"{ "pipeline": { "ocr_provider": "fallback" }, "llm": { "model": "m" } }"#;
        let config: KycConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.pipeline.ocr_provider, OcrProviderKind::Fallback);
        assert_eq!(config.pipeline.output_file, PathBuf::from("data/output.json"));
        assert_eq!(config.llm.model, "m");
        assert_eq!(config.llm.api_key_env, "FIREWORKS_API_KEY");
        assert_eq!(config.record.document_number_max_len, 10);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = KycConfig::default();
        config.pipeline.input_dir = PathBuf::from("scans");
        config.save(&path).unwrap();

        let loaded = KycConfig::from_file(&path).unwrap();
        assert_eq!(loaded.pipeline.input_dir, PathBuf::from("scans"));
        assert_eq!(loaded.vision.api_key_env, "GOOGLE_VISION_API_KEY");
    }

    #[test]
    fn test_missing_secret() {
        let err = env_secret("KYC_TEST_SURELY_UNSET_VARIABLE").unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnv(ref v) if v == "KYC_TEST_SURELY_UNSET_VARIABLE"));
    }
}
