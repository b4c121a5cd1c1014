//! Error types for the kyc-core library.
//!
//! Each pipeline stage has its own error enum so a failed image can be
//! attributed to the stage that dropped it.

use thiserror::Error;

/// Main error type for the kyc library.
#[derive(Error, Debug)]
pub enum KycError {
    /// Text extraction error.
    #[error("OCR error: {0}")]
    Ocr(#[from] OcrError),

    /// Language-model service error.
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    /// Field normalization error.
    #[error("normalization error: {0}")]
    Normalization(#[from] NormalizationError),

    /// Record recovery error.
    #[error("coercion error: {0}")]
    Coercion(#[from] CoercionError),

    /// Record store error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by text-extraction providers.
#[derive(Error, Debug)]
pub enum OcrError {
    /// Could not read the image file.
    #[error("failed to read image: {0}")]
    Read(#[from] std::io::Error),

    /// The OCR service could not be reached.
    #[error("network error: {0}")]
    Network(String),

    /// The OCR service answered with an error.
    #[error("service error: {0}")]
    Service(String),

    /// The service response could not be decoded.
    #[error("unexpected response: {0}")]
    Parse(String),

    /// Failed to load local OCR models.
    #[error("failed to load model: {0}")]
    ModelLoad(String),

    /// Local recognition failed.
    #[error("recognition failed: {0}")]
    Recognition(String),

    /// The provider returned no text for the image.
    #[error("no text recognized")]
    NoText,
}

/// Errors raised by the text-transformation service client.
#[derive(Error, Debug)]
pub enum LlmError {
    /// Connection failed or timed out.
    #[error("network error: {0}")]
    Network(String),

    /// Non-2xx response or an empty completion.
    #[error("API error: {0}")]
    Api(String),

    /// Response body did not match the expected shape.
    #[error("parse error: {0}")]
    Parse(String),
}

/// Errors raised while asking for the six labelled fields.
#[derive(Error, Debug)]
pub enum NormalizationError {
    /// The completion call failed.
    #[error("completion failed: {0}")]
    Completion(#[from] LlmError),

    /// The service answered with nothing.
    #[error("empty completion")]
    Empty,
}

/// Errors raised while turning normalized text into a record.
#[derive(Error, Debug)]
pub enum CoercionError {
    /// The strict reformat call failed.
    #[error("reformat call failed: {0}")]
    Reformat(#[from] LlmError),

    /// No `{...}` span was found in the response.
    #[error("no JSON object found in response")]
    NoJsonObject,

    /// The recovered span is not valid JSON.
    #[error("invalid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),

    /// The JSON does not fit the record schema.
    #[error("schema mismatch: {0}")]
    Schema(String),

    /// The document number exceeds the allowed length.
    #[error("document number {value:?} exceeds {max} characters")]
    DocumentNumberTooLong { value: String, max: usize },
}

/// Errors raised by the record store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The store holds valid JSON that is not an array.
    #[error("store {0} does not contain a JSON array")]
    NotAnArray(String),

    /// Reading or writing the store failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serializing the collection failed.
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Errors raised while loading configuration or building clients.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A required environment variable is not set.
    #[error("environment variable {0} is not set")]
    MissingEnv(String),

    /// The config file could not be parsed.
    #[error("invalid config file: {0}")]
    Parse(String),

    /// A requested feature was not compiled in.
    #[error("{0}")]
    Unsupported(String),

    /// HTTP client construction failed.
    #[error("failed to build HTTP client: {0}")]
    Http(String),
}

/// Result type for the kyc library.
pub type Result<T> = std::result::Result<T, KycError>;
