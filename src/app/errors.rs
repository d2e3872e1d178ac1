//! Error types for record interpretation and region collection.

use thiserror::Error;

/// Failure while interpreting a single activity record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error("Unrecognized identity kind: {kind}")]
    UnrecognizedIdentityKind { kind: String },

    #[error("Malformed record field: {field}")]
    MalformedField { field: String },
}

impl RecordError {
    pub fn malformed(field: impl Into<String>) -> Self {
        RecordError::MalformedField {
            field: field.into(),
        }
    }
}

/// Failure of one region's collection. The orchestrator records these in
/// the per-region failure map instead of aborting the run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Region {region} failed: {reason}")]
pub struct CollectionError {
    pub region: String,
    pub reason: String,
}

impl CollectionError {
    pub fn new(region: impl Into<String>, reason: impl Into<String>) -> Self {
        CollectionError {
            region: region.into(),
            reason: reason.into(),
        }
    }
}

pub type RecordResult<T> = Result<T, RecordError>;
