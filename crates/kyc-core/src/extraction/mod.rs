//! Free text to [`DocumentRecord`](crate::DocumentRecord) in two model passes.
//!
//! The first pass ([`FieldNormalizer`]) asks for the six labelled fields, the
//! second ([`RecordCoercer`]) asks for strict JSON and then recovers an object
//! from whatever comes back. A single combined prompt was not reliable enough,
//! so both passes are kept.

mod coercer;
mod normalizer;
pub mod rules;

pub use coercer::RecordCoercer;
pub use normalizer::{FIELD_LABELS, FieldNormalizer};
