//! Error types for the bindings

use chessahoochee_core::ValidationError;
use chessahoochee_storage::StorageError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BindingError {
    #[error("Type validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Effect task failed: {0}")]
    Task(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, BindingError>;

/// What a binding does when its partition fails a read or write.
///
/// Either way the failure is logged and in-memory state keeps its
/// last-known value. Validation failures are not affected by this policy;
/// they are always returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IoErrorPolicy {
    /// Log and carry on
    #[default]
    LogAndContinue,
    /// Log, then also return the error from the next `settle()`
    Propagate,
}

impl std::str::FromStr for IoErrorPolicy {
    type Err = BindingError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "log_and_continue" | "log" => Ok(IoErrorPolicy::LogAndContinue),
            "propagate" => Ok(IoErrorPolicy::Propagate),
            other => Err(BindingError::Config(format!(
                "Invalid I/O error policy '{}'. Use 'log_and_continue' or 'propagate'",
                other
            ))),
        }
    }
}
