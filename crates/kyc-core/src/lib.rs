//! Core library for identity-document ingestion.
//!
//! This crate provides:
//! - Text extraction from document images (Google Cloud Vision, local PaddleOCR)
//! - Two-pass field normalization through a chat completion service
//! - Best-effort recovery of a typed record from noisy model output
//! - A JSON record store deduplicated by document number
//! - A sequential batch pipeline tying the stages together

pub mod discovery;
pub mod error;
pub mod extraction;
pub mod llm;
pub mod models;
pub mod ocr;
pub mod pipeline;
pub mod store;

pub use discovery::discover_images;
pub use error::{
    CoercionError, ConfigError, KycError, LlmError, NormalizationError, OcrError, Result,
    StoreError,
};
pub use extraction::{FieldNormalizer, RecordCoercer};
pub use llm::{ChatClient, CompletionService};
pub use models::config::{KycConfig, OcrProviderKind};
pub use models::record::{DocumentRecord, DocumentType};
pub use ocr::{TextExtractor, VisionClient, build_extractor};
#[cfg(feature = "local-ocr")]
pub use ocr::LocalOcr;
pub use pipeline::{BatchReport, ImageOutcome, Pipeline, PipelineError, Stage};
pub use store::{RecordStore, UpsertOutcome};
