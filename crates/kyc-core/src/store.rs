//! JSON-file record store keyed by document number.
//!
//! Every upsert is a full read-modify-write of the file. The rewrite goes
//! through a temp file in the same directory followed by a rename, so a
//! crash never leaves a half-written store. There is no locking: concurrent
//! writers against one file can still lose updates.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::StoreError;
use crate::models::record::DocumentRecord;

const DOCUMENT_NUMBER_KEY: &str = "document_number";

/// Key under which older stores kept the document number.
const LEGACY_DOCUMENT_NUMBER_KEY: &str = "Document Number";

/// What an upsert did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// The record was appended and the file rewritten.
    Added,
    /// A record with the same document number exists; the file is untouched.
    DuplicateSkipped,
}

/// Append-only collection of records persisted as a pretty-printed JSON array.
#[derive(Debug, Clone)]
pub struct RecordStore {
    path: PathBuf,
}

impl RecordStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Get the store location.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load all entries.
    ///
    /// A missing file, an empty file or invalid JSON all read as an empty
    /// collection. Valid JSON that is not an array is an error.
    pub fn load(&self) -> Result<Vec<Value>, StoreError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Store {} not found, starting empty", self.path.display());
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Array(entries)) => Ok(entries),
            Ok(_) => Err(StoreError::NotAnArray(self.path.display().to_string())),
            Err(e) => {
                warn!("Store {} is not valid JSON ({}), starting empty", self.path.display(), e);
                Ok(Vec::new())
            }
        }
    }

    /// Append `record` unless its document number is already stored.
    pub fn upsert(&self, record: &DocumentRecord) -> Result<UpsertOutcome, StoreError> {
        let mut entries = self.load()?;

        if entries
            .iter()
            .any(|entry| entry_document_number(entry).as_deref() == Some(record.document_number.as_str()))
        {
            info!(
                "Duplicate document number {:?}, skipping",
                record.document_number
            );
            return Ok(UpsertOutcome::DuplicateSkipped);
        }

        entries.push(serde_json::to_value(record)?);
        self.write(&entries)?;

        info!(
            "Added document {:?} to {} ({} records)",
            record.document_number,
            self.path.display(),
            entries.len()
        );
        Ok(UpsertOutcome::Added)
    }

    fn write(&self, entries: &[Value]) -> Result<(), StoreError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        let content = serde_json::to_string_pretty(entries)?;

        let mut temp = tempfile::NamedTempFile::new_in(&dir)?;
        temp.write_all(content.as_bytes())?;
        temp.write_all(b"\n")?;
        temp.flush()?;
        temp.persist(&self.path).map_err(|e| StoreError::Io(e.error))?;

        Ok(())
    }
}

/// Document number of a stored entry, numbers in their string form.
///
/// Falls back to the legacy key when `document_number` is absent or null.
fn entry_document_number(entry: &Value) -> Option<String> {
    [DOCUMENT_NUMBER_KEY, LEGACY_DOCUMENT_NUMBER_KEY]
        .into_iter()
        .filter_map(|key| entry.get(key))
        .find_map(|value| match value {
            Value::String(s) => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::record::DocumentType;
    use pretty_assertions::assert_eq;

    fn record(number: &str) -> DocumentRecord {
        DocumentRecord {
            name: "JOHN SMITH".to_string(),
            date_of_birth: "01-02-1990".to_string(),
            document_number: number.to_string(),
            expiration_date: "01-02-2030".to_string(),
            address: "1 MAIN ST".to_string(),
            document_type: DocumentType::Passport,
        }
    }

    #[test]
    fn test_bootstrap_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordStore::new(dir.path().join("nested/output.json"));

        assert_eq!(store.upsert(&record("A1")).unwrap(), UpsertOutcome::Added);

        let entries = store.load().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0]["document_number"], "A1");
        assert_eq!(entries[0]["document_type"], "Passport");
    }

    #[test]
    fn test_bootstrap_empty_and_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        for content in ["", "not json at all", "[{\"broken\": "] {
            let path = dir.path().join("output.json");
            fs::write(&path, content).unwrap();
            let store = RecordStore::new(&path);

            assert_eq!(store.upsert(&record("A1")).unwrap(), UpsertOutcome::Added);
            assert_eq!(store.load().unwrap().len(), 1);
        }
    }

    #[test]
    fn test_non_array_store_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("output.json");
        let original = "{\"document_number\": \"A1\"}";
        fs::write(&path, original).unwrap();

        let store = RecordStore::new(&path);
        assert!(matches!(
            store.upsert(&record("A2")),
            Err(StoreError::NotAnArray(_))
        ));
        assert_eq!(fs::read_to_string(&path).unwrap(), original);
    }

    #[test]
    fn test_duplicate_leaves_file_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("output.json");
        let store = RecordStore::new(&path);

        store.upsert(&record("A1")).unwrap();
        let before = fs::read_to_string(&path).unwrap();

        let mut other = record("A1");
        other.name = "SOMEONE ELSE".to_string();
        assert_eq!(store.upsert(&other).unwrap(), UpsertOutcome::DuplicateSkipped);
        assert_eq!(fs::read_to_string(&path).unwrap(), before);
    }

    #[test]
    fn test_legacy_key_counts_as_duplicate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("output.json");
        fs::write(&path, r#"[{"Name": "OLD", "Document Number": "A1", "extra": 1}]"#).unwrap();

        let store = RecordStore::new(&path);
        assert_eq!(store.upsert(&record("A1")).unwrap(), UpsertOutcome::DuplicateSkipped);

        assert_eq!(store.upsert(&record("B2")).unwrap(), UpsertOutcome::Added);
        let entries = store.load().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0]["extra"], 1);
    }

    #[test]
    fn test_numeric_and_null_document_numbers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("output.json");
        fs::write(
            &path,
            r#"[{"Document Number": 12345}, {"document_number": null, "Document Number": "L7"}]"#,
        )
        .unwrap();

        let store = RecordStore::new(&path);
        assert_eq!(store.upsert(&record("12345")).unwrap(), UpsertOutcome::DuplicateSkipped);
        assert_eq!(store.upsert(&record("L7")).unwrap(), UpsertOutcome::DuplicateSkipped);
        assert_eq!(store.upsert(&record("A1")).unwrap(), UpsertOutcome::Added);
        assert_eq!(store.load().unwrap().len(), 3);
    }

    #[test]
    fn test_entry_document_number() {
        assert_eq!(
            entry_document_number(&serde_json::json!({"document_number": " A1 "})),
            Some("A1".to_string())
        );
        assert_eq!(
            entry_document_number(&serde_json::json!({"document_number": 42})),
            Some("42".to_string())
        );
        assert_eq!(entry_document_number(&serde_json::json!({"name": "X"})), None);
    }

    #[test]
    fn test_pretty_printed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("output.json");
        RecordStore::new(&path).upsert(&record("A1")).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("[\n  {\n"));
        assert!(content.contains("\"document_number\": \"A1\""));
    }
}
