//! Identity-document record as persisted in the record store.

use serde::{Deserialize, Serialize};

/// One scanned identity document, normalized to the fixed schema.
///
/// Fields the model could not find are kept as empty strings so a stored
/// record always carries all six fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRecord {
    /// Full name, first and last name joined when the source splits them.
    pub name: String,

    /// Date of birth as `MM-DD-YYYY`.
    pub date_of_birth: String,

    /// Document number, the natural key of the store.
    pub document_number: String,

    /// Expiration date as `MM-DD-YYYY`.
    pub expiration_date: String,

    /// Address as a single unsplit string.
    pub address: String,

    /// Kind of document, [`DocumentType::Unspecified`] when not found.
    pub document_type: DocumentType,
}

/// Kind of identity document.
///
/// Serialized with the exact, case-sensitive literals the store uses. A
/// type the model could not find is stored as the empty string.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentType {
    /// Passport.
    Passport,
    /// Driver's license.
    #[serde(rename = "Drivers License")]
    DriversLicense,
    /// Placeholder for a missing type.
    #[default]
    #[serde(rename = "")]
    Unspecified,
}

impl DocumentType {
    /// Exact literal used in the store.
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::Passport => "Passport",
            DocumentType::DriversLicense => "Drivers License",
            DocumentType::Unspecified => "",
        }
    }

    /// Parse a non-empty literal exactly; no case folding.
    pub fn from_literal(value: &str) -> Option<Self> {
        match value {
            "Passport" => Some(DocumentType::Passport),
            "Drivers License" => Some(DocumentType::DriversLicense),
            _ => None,
        }
    }
}

impl std::fmt::Display for DocumentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
