//! Google Cloud Vision text detection over the REST API.

use std::path::Path;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ConfigError, OcrError};
use crate::models::config::{VisionConfig, env_secret};

use super::{TextExtractor, non_blank};

/// Primary OCR provider backed by Cloud Vision `images:annotate`.
#[derive(Clone)]
pub struct VisionClient {
    http_client: Client,
    api_key: String,
    endpoint: String,
}

impl VisionClient {
    /// Create a client with an explicit API key.
    pub fn new(api_key: impl Into<String>, endpoint: impl Into<String>, timeout: Duration) -> Result<Self, ConfigError> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConfigError::Http(e.to_string()))?;

        Ok(Self {
            http_client,
            api_key: api_key.into(),
            endpoint: endpoint.into(),
        })
    }

    /// Create a client, reading the API key from the configured variable.
    pub fn from_config(config: &VisionConfig) -> Result<Self, ConfigError> {
        let api_key = env_secret(&config.api_key_env)?;
        Self::new(api_key, &config.endpoint, Duration::from_secs(config.timeout_secs))
    }

    /// Get the endpoint.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn annotate(&self, image_bytes: &[u8]) -> Result<String, OcrError> {
        let request = AnnotateRequest::text_detection(image_bytes);

        let response = self
            .http_client
            .post(&self.endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await
            .map_err(|e| OcrError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!(status = %status, "Vision API error");
            return Err(OcrError::Service(format!("HTTP {}: {}", status, error_text)));
        }

        let body: AnnotateResponse = response
            .json()
            .await
            .map_err(|e| OcrError::Parse(e.to_string()))?;

        full_text(body)
    }
}

#[async_trait]
impl TextExtractor for VisionClient {
    fn name(&self) -> &str {
        "google-vision"
    }

    async fn extract(&self, image_path: &Path) -> Result<String, OcrError> {
        let start = Instant::now();
        let image_bytes = std::fs::read(image_path)?;

        let text = self.annotate(&image_bytes).await?;

        debug!(
            bytes = image_bytes.len(),
            chars = text.len(),
            duration_ms = start.elapsed().as_millis(),
            "Vision text detection"
        );

        Ok(text)
    }
}

#[derive(Debug, Serialize)]
struct AnnotateRequest {
    requests: Vec<ImageRequest>,
}

#[derive(Debug, Serialize)]
struct ImageRequest {
    image: ImageContent,
    features: Vec<Feature>,
}

#[derive(Debug, Serialize)]
struct ImageContent {
    content: String,
}

#[derive(Debug, Serialize)]
struct Feature {
    #[serde(rename = "type")]
    kind: &'static str,
}

impl AnnotateRequest {
    fn text_detection(image_bytes: &[u8]) -> Self {
        Self {
            requests: vec![ImageRequest {
                image: ImageContent {
                    content: STANDARD.encode(image_bytes),
                },
                features: vec![Feature {
                    kind: "TEXT_DETECTION",
                }],
            }],
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AnnotateResponse {
    responses: Vec<ImageResponse>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ImageResponse {
    full_text_annotation: Option<TextAnnotation>,
    error: Option<Status>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TextAnnotation {
    text: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Status {
    message: String,
}

/// Pull the full-document text out of an annotate response.
fn full_text(body: AnnotateResponse) -> Result<String, OcrError> {
    let first = body
        .responses
        .into_iter()
        .next()
        .ok_or_else(|| OcrError::Parse("empty responses array".to_string()))?;

    if let Some(status) = first.error {
        if !status.message.is_empty() {
            return Err(OcrError::Service(status.message));
        }
    }

    let text = first
        .full_text_annotation
        .map(|a| a.text)
        .unwrap_or_default();

    non_blank(text)
}
