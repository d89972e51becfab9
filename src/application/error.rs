use thiserror::Error;

use crate::domain::{PeriodError, RecordId, RecordKind};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid record id: {0:?}")]
    InvalidRecordId(String),

    /// Covers both "never existed" and "already deleted".
    #[error("No {kind} with id {id}")]
    RecordNotFound { kind: RecordKind, id: RecordId },

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("A {kind} needs a {field}")]
    MissingKey {
        kind: RecordKind,
        field: &'static str,
    },

    #[error("Unsupported period type: {0}")]
    UnsupportedPeriod(String),

    #[error("Unsupported record kind: {0}")]
    UnsupportedRecordKind(String),

    #[error("Record kind mismatch: expected {expected}, got {actual}")]
    RecordKindMismatch {
        expected: RecordKind,
        actual: RecordKind,
    },

    #[error(transparent)]
    Period(#[from] PeriodError),

    #[error("Period discovery gave up after {steps} steps")]
    DiscoveryLimitExceeded { steps: usize },

    #[error("Database error: {0}")]
    Database(#[from] anyhow::Error),
}
