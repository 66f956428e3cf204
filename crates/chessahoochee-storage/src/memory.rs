//! In-memory partitions
//!
//! Nothing survives the process. Used as the test fake and for ephemeral
//! runs (`backend: memory`).

use crate::traits::{PartitionStore, StorageResult, StoreBackend, require_keys};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// A single in-memory partition
pub struct MemoryPartition {
    name: String,
    state: RwLock<HashMap<String, Value>>,
}

impl MemoryPartition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: RwLock::new(HashMap::new()),
        }
    }

    /// Copy of the partition contents
    pub async fn snapshot(&self) -> HashMap<String, Value> {
        self.state.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.read().await.is_empty()
    }
}

#[async_trait::async_trait]
impl PartitionStore for MemoryPartition {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get(&self, key: &str) -> StorageResult<Option<Value>> {
        let state = self.state.read().await;
        Ok(state.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> StorageResult<()> {
        let mut state = self.state.write().await;
        state.insert(key.to_string(), value);
        Ok(())
    }

    async fn get_many(&self, keys: &[String]) -> StorageResult<Vec<Option<Value>>> {
        require_keys(keys)?;
        let state = self.state.read().await;
        Ok(keys.iter().map(|k| state.get(k).cloned()).collect())
    }

    async fn set_many(&self, items: Vec<(String, Value)>) -> StorageResult<()> {
        let mut state = self.state.write().await;
        for (key, value) in items {
            state.insert(key, value);
        }
        Ok(())
    }

    async fn keys(&self) -> StorageResult<Vec<String>> {
        let state = self.state.read().await;
        let mut keys: Vec<String> = state.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}

/// Backend handing out shared in-memory partitions
#[derive(Default)]
pub struct MemoryBackend {
    partitions: Mutex<HashMap<(String, String), Arc<MemoryPartition>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Concrete handle to a partition, for inspection in tests
    pub async fn partition(&self, database: &str, partition: &str) -> Arc<MemoryPartition> {
        let mut partitions = self.partitions.lock().await;
        partitions
            .entry((database.to_string(), partition.to_string()))
            .or_insert_with(|| Arc::new(MemoryPartition::new(partition)))
            .clone()
    }
}

#[async_trait::async_trait]
impl StoreBackend for MemoryBackend {
    async fn open_partition(
        &self,
        database: &str,
        partition: &str,
    ) -> StorageResult<Arc<dyn PartitionStore>> {
        Ok(self.partition(database, partition).await)
    }
}
