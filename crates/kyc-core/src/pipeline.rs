//! Per-image orchestration: OCR, normalization, coercion, store.
//!
//! Images are processed one at a time, each stage awaited before the next.
//! A failing stage drops that image only; the batch always runs to the end
//! and no stage is retried.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tracing::{info, warn};

use crate::error::{CoercionError, ConfigError, NormalizationError, OcrError, StoreError};
use crate::extraction::{FieldNormalizer, RecordCoercer};
use crate::llm::{ChatClient, CompletionService};
use crate::models::config::KycConfig;
use crate::models::record::DocumentRecord;
use crate::ocr::{TextExtractor, build_extractor};
use crate::store::{RecordStore, UpsertOutcome};

/// Pipeline stage, used to attribute failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Extraction,
    Normalization,
    Coercion,
    Store,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Extraction => "extraction",
            Stage::Normalization => "normalization",
            Stage::Coercion => "coercion",
            Stage::Store => "store",
        };
        f.write_str(name)
    }
}

/// Why an image was dropped.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("text extraction failed: {0}")]
    Extraction(#[from] OcrError),

    #[error("field normalization failed: {0}")]
    Normalization(#[from] NormalizationError),

    #[error("record coercion failed: {0}")]
    Coercion(#[from] CoercionError),

    #[error("record store failed: {0}")]
    Store(#[from] StoreError),
}

impl PipelineError {
    /// Stage that produced the failure.
    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::Extraction(_) => Stage::Extraction,
            PipelineError::Normalization(_) => Stage::Normalization,
            PipelineError::Coercion(_) => Stage::Coercion,
            PipelineError::Store(_) => Stage::Store,
        }
    }
}

/// Result of processing one image.
#[derive(Debug)]
pub struct ImageOutcome {
    pub path: PathBuf,
    pub result: Result<UpsertOutcome, PipelineError>,
    pub processing_time_ms: u64,
}

/// Outcome of a whole batch.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub outcomes: Vec<ImageOutcome>,
}

impl BatchReport {
    /// Number of images scanned.
    pub fn scanned(&self) -> usize {
        self.outcomes.len()
    }

    /// Number of records appended to the store.
    pub fn added(&self) -> usize {
        self.count(|r| matches!(r, Ok(UpsertOutcome::Added)))
    }

    /// Number of images whose document number was already stored.
    pub fn duplicates(&self) -> usize {
        self.count(|r| matches!(r, Ok(UpsertOutcome::DuplicateSkipped)))
    }

    /// Number of images dropped by a failing stage.
    pub fn failed(&self) -> usize {
        self.count(|r| r.is_err())
    }

    /// Number of images dropped at `stage`.
    pub fn failed_at(&self, stage: Stage) -> usize {
        self.count(|r| matches!(r, Err(e) if e.stage() == stage))
    }

    /// Failed images with their errors.
    pub fn failures(&self) -> impl Iterator<Item = (&Path, &PipelineError)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (o.path.as_path(), e)))
    }

    fn count(&self, pred: impl Fn(&Result<UpsertOutcome, PipelineError>) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(&o.result)).count()
    }
}

/// The ingestion pipeline with all collaborators injected.
pub struct Pipeline {
    extractor: Box<dyn TextExtractor>,
    normalizer: FieldNormalizer,
    coercer: RecordCoercer,
    store: RecordStore,
}

impl Pipeline {
    pub fn new(
        extractor: Box<dyn TextExtractor>,
        normalizer: FieldNormalizer,
        coercer: RecordCoercer,
        store: RecordStore,
    ) -> Self {
        Self {
            extractor,
            normalizer,
            coercer,
            store,
        }
    }

    /// Wire extractor and both model passes around one completion service.
    pub fn with_service(
        extractor: Box<dyn TextExtractor>,
        service: Arc<dyn CompletionService>,
        store: RecordStore,
        document_number_max_len: usize,
    ) -> Self {
        let normalizer = FieldNormalizer::new(service.clone());
        let coercer =
            RecordCoercer::new(service).with_document_number_max_len(document_number_max_len);
        Self::new(extractor, normalizer, coercer, store)
    }

    /// Build the production pipeline from configuration.
    ///
    /// Credentials are read from the environment here, so a missing key
    /// fails before any image is touched.
    pub fn from_config(config: &KycConfig) -> Result<Self, ConfigError> {
        let extractor = build_extractor(config)?;
        let service: Arc<dyn CompletionService> = Arc::new(ChatClient::from_config(&config.llm)?);
        let store = RecordStore::new(&config.pipeline.output_file);

        info!(
            "Pipeline ready: ocr={}, model={}, store={}",
            extractor.name(),
            config.llm.model,
            store.path().display()
        );

        Ok(Self::with_service(
            extractor,
            service,
            store,
            config.record.document_number_max_len,
        ))
    }

    /// Get the record store.
    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// Run OCR, normalization and coercion without touching the store.
    pub async fn extract_record(&self, image_path: &Path) -> Result<DocumentRecord, PipelineError> {
        let raw_text = self.extractor.extract(image_path).await?;
        info!("Extracted {} chars with {}", raw_text.len(), self.extractor.name());

        let normalized = self.normalizer.normalize(&raw_text).await?;
        let record = self.coercer.coerce(&normalized).await?;

        Ok(record)
    }

    /// Run all four stages on one image.
    pub async fn process_image(&self, image_path: &Path) -> Result<UpsertOutcome, PipelineError> {
        let record = self.extract_record(image_path).await?;
        Ok(self.store.upsert(&record)?)
    }

    /// Process `images` in order, logging and recording every failure.
    pub async fn run(&self, images: &[PathBuf]) -> BatchReport {
        self.run_with_progress(images, |_| {}).await
    }

    /// Like [`run`](Self::run), calling `on_done` after each image.
    pub async fn run_with_progress<F>(&self, images: &[PathBuf], mut on_done: F) -> BatchReport
    where
        F: FnMut(&ImageOutcome),
    {
        let mut report = BatchReport::default();

        for path in images {
            let start = Instant::now();
            info!("Processing file: {}", path.display());

            let result = self.process_image(path).await;
            if let Err(ref e) = result {
                warn!(stage = %e.stage(), "Dropped {}: {}", path.display(), e);
            }

            let outcome = ImageOutcome {
                path: path.clone(),
                result,
                processing_time_ms: start.elapsed().as_millis() as u64,
            };
            on_done(&outcome);
            report.outcomes.push(outcome);
        }

        info!(
            "Batch complete: {} scanned, {} added, {} duplicates, {} failed",
            report.scanned(),
            report.added(),
            report.duplicates(),
            report.failed()
        );

        report
    }
}
