//! Second model pass plus structural recovery of a [`DocumentRecord`].

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::CoercionError;
use crate::llm::CompletionService;
use crate::models::record::{DocumentRecord, DocumentType};

use super::rules::{check_document_number, extract_json_object, normalize_date};

/// Reformats normalized text into JSON and recovers a record from the reply.
#[derive(Clone)]
pub struct RecordCoercer {
    service: Arc<dyn CompletionService>,
    document_number_max_len: usize,
}

impl RecordCoercer {
    pub fn new(service: Arc<dyn CompletionService>) -> Self {
        Self {
            service,
            document_number_max_len: 10,
        }
    }

    /// Set the longest accepted document number.
    pub fn with_document_number_max_len(mut self, max: usize) -> Self {
        self.document_number_max_len = max;
        self
    }

    /// Build the strict formatting prompt for `normalized_text`.
    pub fn prompt(&self, normalized_text: &str) -> String {
        format!(
            "I'm providing you a structured text. Format it as JSON; the output must be \
             JSON-ready data only. Date of Birth and Expiration Date must use the format \
             MM-DD-YYYY. Document Number must not exceed {} characters. Address must stay \
             a single string and not be split into city, state and similar parts. \
             Document Type must be exactly 'Passport' or 'Drivers License' (case-sensitive), \
             nothing else.\nText:\n{}",
            self.document_number_max_len, normalized_text
        )
    }

    /// Reformat `normalized_text` and recover a record from the response.
    pub async fn coerce(&self, normalized_text: &str) -> Result<DocumentRecord, CoercionError> {
        let response = self.service.complete(&self.prompt(normalized_text)).await?;
        debug!("Reformat response: {} chars", response.len());
        self.recover(&response)
    }

    /// Recover a record from a (possibly noisy) reformat response.
    pub fn recover(&self, response: &str) -> Result<DocumentRecord, CoercionError> {
        let value = extract_json_object(response)?;
        decode_record(value, self.document_number_max_len)
    }
}

/// Canonical field a JSON key maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Name,
    FirstName,
    LastName,
    DateOfBirth,
    DocumentNumber,
    ExpirationDate,
    Address,
    DocumentType,
}

/// Map a key to a field, ignoring case, spaces and punctuation so that
/// "Date of Birth", "date_of_birth" and "DateOfBirth" all match.
fn classify_key(key: &str) -> Option<Field> {
    let folded: String = key
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect();

    let field = match folded.as_str() {
        "name" | "fullname" => Field::Name,
        "firstname" | "fn" | "givenname" | "givennames" => Field::FirstName,
        "lastname" | "ln" | "surname" => Field::LastName,
        "dateofbirth" | "dob" | "birthdate" => Field::DateOfBirth,
        "documentnumber" | "docnumber" | "passportnumber" | "licensenumber" => Field::DocumentNumber,
        "expirationdate" | "expirydate" | "dateofexpiry" | "exp" => Field::ExpirationDate,
        "address" => Field::Address,
        "documenttype" | "type" => Field::DocumentType,
        _ => return None,
    };
    Some(field)
}

fn scalar_to_string(key: &str, value: &Value) -> Result<String, CoercionError> {
    match value {
        Value::String(s) => Ok(s.trim().to_string()),
        Value::Null => Ok(String::new()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Array(_) | Value::Object(_) => Err(CoercionError::Schema(format!(
            "field {:?} is not a single value",
            key
        ))),
    }
}

fn get(fields: &[(Field, String)], field: Field) -> Option<&str> {
    fields
        .iter()
        .find(|(f, _)| *f == field)
        .map(|(_, v)| v.as_str())
}

/// Decode a recovered JSON object into a validated record.
fn decode_record(value: Value, document_number_max_len: usize) -> Result<DocumentRecord, CoercionError> {
    let object: Map<String, Value> = match value {
        Value::Object(object) => object,
        other => {
            return Err(CoercionError::Schema(format!(
                "expected a JSON object, got {}",
                json_kind(&other)
            )));
        }
    };

    let mut fields: Vec<(Field, String)> = Vec::with_capacity(object.len());
    for (key, value) in &object {
        if let Some(field) = classify_key(key) {
            if get(&fields, field).is_none() {
                fields.push((field, scalar_to_string(key, value)?));
            }
        }
    }

    let name = match get(&fields, Field::Name) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => [get(&fields, Field::FirstName), get(&fields, Field::LastName)]
            .into_iter()
            .flatten()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" "),
    };

    let document_type = match get(&fields, Field::DocumentType).unwrap_or_default() {
        "" => DocumentType::Unspecified,
        literal => DocumentType::from_literal(literal).ok_or_else(|| {
            CoercionError::Schema(format!(
                "document type {:?} is neither \"Passport\" nor \"Drivers License\"",
                literal
            ))
        })?,
    };

    Ok(DocumentRecord {
        name,
        date_of_birth: normalize_date(
            "date_of_birth",
            get(&fields, Field::DateOfBirth).unwrap_or_default(),
        ),
        document_number: check_document_number(
            get(&fields, Field::DocumentNumber).unwrap_or_default(),
            document_number_max_len,
        )?,
        expiration_date: normalize_date(
            "expiration_date",
            get(&fields, Field::ExpirationDate).unwrap_or_default(),
        ),
        address: get(&fields, Field::Address).unwrap_or_default().to_string(),
        document_type,
    })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LlmError;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;

    struct Fixed(&'static str);

    #[async_trait]
    impl CompletionService for Fixed {
        async fn complete(&self, _prompt: &str) -> Result<String, LlmError> {
            Ok(self.0.to_string())
        }
    }

    fn coercer() -> RecordCoercer {
        RecordCoercer::new(Arc::new(Fixed("")))
    }

    #[test]
    fn test_recover_labelled_keys() {
        let response = r#"Here is the data:
{
  "Name": "JOHN SMITH",
  "Date of Birth": "01-02-1990",
  "Document Number": "X123456789",
  "Expiration Date": "01/02/2030",
  "Address": "1 MAIN ST",
  "Document Type": "Passport"
}"#;
        let record = coercer().recover(response).unwrap();

        assert_eq!(
            record,
            DocumentRecord {
                name: "JOHN SMITH".to_string(),
                date_of_birth: "01-02-1990".to_string(),
                document_number: "X123456789".to_string(),
                expiration_date: "01-02-2030".to_string(),
                address: "1 MAIN ST".to_string(),
                document_type: DocumentType::Passport,
            }
        );
    }

    #[test]
    fn test_split_name_and_missing_fields() {
        let response = r#"{"First Name": "JANE", "Last Name": "DOE", "document_number": 12345,
                           "document_type": "Drivers License", "address": null}"#;
        let record = coercer().recover(response).unwrap();

        assert_eq!(record.name, "JANE DOE");
        assert_eq!(record.document_number, "12345");
        assert_eq!(record.date_of_birth, "");
        assert_eq!(record.expiration_date, "");
        assert_eq!(record.address, "");
        assert_eq!(record.document_type, DocumentType::DriversLicense);
    }

    #[test]
    fn test_document_type_is_exact() {
        let err = coercer()
            .recover(r#"{"Name": "A", "Document Type": "passport"}"#)
            .unwrap_err();
        assert!(matches!(err, CoercionError::Schema(_)));

    }

    #[test]
    fn test_missing_document_type_is_placeholder() {
        let record = coercer()
            .recover(
                r#"{"Name": "JOHN SMITH", "Document Number": "A1", "Date of Birth": "01-02-1990",
                    "Expiration Date": "01-02-2030", "Address": "1 MAIN ST"}"#,
            )
            .unwrap();
        assert_eq!(record.document_type, DocumentType::Unspecified);
        assert_eq!(record.document_number, "A1");

        let record = coercer()
            .recover(r#"{"Name": "A", "Document Type": "  "}"#)
            .unwrap();
        assert_eq!(record.document_type, DocumentType::Unspecified);
    }

    #[test]
    fn test_unrecognized_date_keeps_record() {
        let record = coercer()
            .recover(
                r#"{"Name": "JOHN SMITH", "Date of Birth": "Jan 2 1990", "Document Number": "A1",
                    "Expiration Date": "2030-01-02", "Document Type": "Passport"}"#,
            )
            .unwrap();
        assert_eq!(record.date_of_birth, "Jan 2 1990");
        assert_eq!(record.expiration_date, "01-02-2030");
    }

    #[test]
    fn test_long_document_number_rejected() {
        let err = coercer()
            .recover(r#"{"Document Number": "AB1234567890", "Document Type": "Passport"}"#)
            .unwrap_err();
        assert!(matches!(err, CoercionError::DocumentNumberTooLong { max: 10, .. }));

        let record = coercer()
            .with_document_number_max_len(12)
            .recover(r#"{"Document Number": "AB1234567890", "Document Type": "Passport"}"#)
            .unwrap();
        assert_eq!(record.document_number, "AB1234567890");
    }

    #[test]
    fn test_nested_address_rejected() {
        let err = coercer()
            .recover(r#"{"Address": {"city": "X"}, "Document Type": "Passport"}"#)
            .unwrap_err();
        assert!(matches!(err, CoercionError::Schema(_)));
    }

    #[test]
    fn test_non_object_rejected() {
        assert!(matches!(
            decode_record(serde_json::json!([1, 2]), 10),
            Err(CoercionError::Schema(_))
        ));
    }

    #[test]
    fn test_prompt_carries_rules() {
        let prompt = coercer().prompt("Name: X");
        assert!(prompt.contains("MM-DD-YYYY"));
        assert!(prompt.contains("exceed 10 characters"));
        assert!(prompt.contains("'Passport' or 'Drivers License'"));
        assert!(prompt.ends_with("Text:\nName: X"));
    }

    #[tokio::test]
    async fn test_coerce_without_json() {
        let coercer = RecordCoercer::new(Arc::new(Fixed("I could not find any fields.")));
        assert!(matches!(
            coercer.coerce("Name: X").await,
            Err(CoercionError::NoJsonObject)
        ));
    }
}
