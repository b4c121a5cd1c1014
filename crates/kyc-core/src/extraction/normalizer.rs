//! First model pass: ask for the six labelled fields in free text.

use std::sync::Arc;

use tracing::debug;

use crate::error::NormalizationError;
use crate::llm::CompletionService;

/// Canonical field labels, in prompt order.
pub const FIELD_LABELS: [&str; 6] = [
    "Name",
    "Date of Birth",
    "Document Number",
    "Expiration Date",
    "Address",
    "Document Type",
];

/// Asks the text-transformation service to pull labelled fields out of OCR text.
///
/// The output is unconstrained free text; structure is only requested here
/// and enforced later by [`RecordCoercer`](super::RecordCoercer).
#[derive(Clone)]
pub struct FieldNormalizer {
    service: Arc<dyn CompletionService>,
}

impl FieldNormalizer {
    pub fn new(service: Arc<dyn CompletionService>) -> Self {
        Self { service }
    }

    /// Build the extraction prompt for `raw_text`.
    pub fn prompt(raw_text: &str) -> String {
        format!(
            "Extract the following information from the text: {}.\n\
             Some documents split the name into FN (first name) and LN (last name); \
             if so, concatenate them into a single Name value.\n\
             Use exactly the labels listed above in your response. For example, the \
             label must be 'Name', not 'First Name' or 'Last Name'.\n\nText:\n{}",
            FIELD_LABELS.join(", "),
            raw_text
        )
    }

    /// Extract labelled fields from raw OCR text.
    pub async fn normalize(&self, raw_text: &str) -> Result<String, NormalizationError> {
        let response = self.service.complete(&Self::prompt(raw_text)).await?;

        if response.trim().is_empty() {
            return Err(NormalizationError::Empty);
        }

        debug!("Normalized {} chars of OCR text into {} chars", raw_text.len(), response.len());
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LlmError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct Recording {
        reply: Result<String, String>,
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl CompletionService for Recording {
        async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.reply.clone().map_err(LlmError::Network)
        }
    }

    fn setup(reply: Result<&str, &str>) -> (FieldNormalizer, Arc<Recording>) {
        let service = Arc::new(Recording {
            reply: reply.map(str::to_string).map_err(str::to_string),
            prompts: Mutex::new(Vec::new()),
        });
        (FieldNormalizer::new(service.clone()), service)
    }

    #[test]
    fn test_prompt_lists_labels_and_text() {
        let prompt = FieldNormalizer::prompt("FN: JOHN\nLN: SMITH");
        for label in FIELD_LABELS {
            assert!(prompt.contains(label), "missing {label}");
        }
        assert!(prompt.contains("concatenate"));
        assert!(prompt.ends_with("Text:\nFN: JOHN\nLN: SMITH"));
    }

    #[tokio::test]
    async fn test_normalize_passes_through() {
        let (normalizer, service) = setup(Ok("Name: JOHN SMITH"));
        let out = normalizer.normalize("FN: JOHN").await.unwrap();

        assert_eq!(out, "Name: JOHN SMITH");
        assert_eq!(service.prompts.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_normalize_failures() {
        let (normalizer, _) = setup(Err("connection reset"));
        assert!(matches!(
            normalizer.normalize("x").await,
            Err(NormalizationError::Completion(LlmError::Network(_)))
        ));

        let (normalizer, _) = setup(Ok("  \n"));
        assert!(matches!(normalizer.normalize("x").await, Err(NormalizationError::Empty)));
    }
}
