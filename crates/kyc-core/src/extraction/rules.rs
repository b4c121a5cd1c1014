//! Structural recovery and field rules applied to model output.

use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::warn;

use crate::error::CoercionError;

lazy_static! {
    /// Leftmost `{` through rightmost `}`, across lines.
    pub static ref JSON_SPAN: Regex = Regex::new(r"(?s)\{.*\}").unwrap();

    /// Month first: 01-02-1990, 1/2/1990, 01.02.1990
    pub static ref DATE_MDY: Regex = Regex::new(
        r"^(\d{1,2})[./\-](\d{1,2})[./\-](\d{4})$"
    ).unwrap();

    /// ISO order: 1990-01-02, 1990/01/02
    pub static ref DATE_YMD: Regex = Regex::new(
        r"^(\d{4})[./\-](\d{1,2})[./\-](\d{1,2})$"
    ).unwrap();
}

/// Locate the first-`{`-to-last-`}` span and parse it as JSON.
///
/// This is a heuristic, not a parser: text between two separate objects is
/// included in the span and makes the parse fail.
pub fn extract_json_object(text: &str) -> Result<serde_json::Value, CoercionError> {
    let span = JSON_SPAN
        .find(text)
        .ok_or(CoercionError::NoJsonObject)?;

    serde_json::from_str(span.as_str()).map_err(CoercionError::InvalidJson)
}

/// Rewrite a date into `MM-DD-YYYY`.
///
/// Empty input stays empty (placeholder for a field the model did not find).
/// A value that is not a recognizable calendar date is kept as the model
/// wrote it, trimmed.
pub fn normalize_date(field: &str, value: &str) -> String {
    let value = value.trim();
    if value.is_empty() {
        return String::new();
    }

    match parse_date(value) {
        Some(date) => date.format("%m-%d-%Y").to_string(),
        None => {
            warn!("Keeping unrecognized {} {:?} as-is", field, value);
            value.to_string()
        }
    }
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    let (year, month, day) = if let Some(caps) = DATE_MDY.captures(value) {
        (caps[3].parse().ok()?, caps[1].parse().ok()?, caps[2].parse().ok()?)
    } else {
        let caps = DATE_YMD.captures(value)?;
        (caps[1].parse().ok()?, caps[2].parse().ok()?, caps[3].parse().ok()?)
    };
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Reject document numbers longer than `max` characters.
pub fn check_document_number(value: &str, max: usize) -> Result<String, CoercionError> {
    let value = value.trim();
    if value.chars().count() > max {
        return Err(CoercionError::DocumentNumberTooLong {
            value: value.to_string(),
            max,
        });
    }
    Ok(value.to_string())
}
