//! Storage trait definitions

use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Backend unavailable: {0}")]
    Backend(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Partition names used by the application
pub mod partition {
    pub const PLAYERS: &str = "Players";
    pub const OPTIONS: &str = "Options";
    pub const TOURNAMENTS: &str = "Tournaments";
}

/// A named, isolated key-value partition.
///
/// Values are structured JSON. Every operation may fail at the I/O level;
/// callers decide whether that is fatal.
#[async_trait::async_trait]
pub trait PartitionStore: Send + Sync {
    /// Partition name
    fn name(&self) -> &str;

    /// Get a value, `None` when the key was never written
    async fn get(&self, key: &str) -> StorageResult<Option<Value>>;

    /// Insert or overwrite a value
    async fn set(&self, key: &str, value: Value) -> StorageResult<()>;

    /// Get several values at once.
    ///
    /// `keys` must be non-empty. The result has one entry per requested key,
    /// in request order.
    async fn get_many(&self, keys: &[String]) -> StorageResult<Vec<Option<Value>>>;

    /// Insert or overwrite several values at once
    async fn set_many(&self, items: Vec<(String, Value)>) -> StorageResult<()>;

    /// List all keys in the partition
    async fn keys(&self) -> StorageResult<Vec<String>>;

    /// Flush pending writes to durable storage
    async fn persist(&self) -> StorageResult<()> {
        Ok(())
    }
}

/// Opens partitions within a named database.
///
/// Opening the same `(database, partition)` pair twice yields handles over
/// the same data; different pairs never share keys.
#[async_trait::async_trait]
pub trait StoreBackend: Send + Sync {
    async fn open_partition(
        &self,
        database: &str,
        partition: &str,
    ) -> StorageResult<Arc<dyn PartitionStore>>;
}

pub(crate) fn require_keys(keys: &[String]) -> StorageResult<()> {
    if keys.is_empty() {
        return Err(StorageError::InvalidData(
            "get_many requires at least one key".to_string(),
        ));
    }
    Ok(())
}
