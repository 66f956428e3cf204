//! Error types for Chessahoochee Core

use thiserror::Error;

/// A value failed the runtime type guard.
///
/// Raised for usage errors (a non-numeric option default, a malformed id
/// list) and for corrupted values read back from storage.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Expected a number for {context}, found {found}")]
    NotNumeric { context: String, found: String },

    #[error("Expected a finite number for {context}, found {value}")]
    NotFinite { context: String, value: f64 },

    #[error("Expected a list for {context}, found {found}")]
    NotList { context: String, found: String },

    #[error("Expected an integer id at index {index}, found {found}")]
    InvalidId { index: usize, found: String },

    #[error("No default configured for option {0}")]
    MissingDefault(String),

    #[error("Invalid record: {0}")]
    InvalidRecord(String),
}

pub type ValidationResult<T> = std::result::Result<T, ValidationError>;
