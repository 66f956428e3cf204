//! File-backed partitions with write-through or periodic persistence
//!
//! Each partition is held in memory and mirrored to
//! `<root>/<database>/<partition>.json`.

use crate::atomic_writer;
use crate::traits::{PartitionStore, StorageResult, StoreBackend, require_keys};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{Duration, interval};

/// When partition contents reach disk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistMode {
    /// Every write is flushed before it returns
    WriteThrough,
    /// Dirty partitions are flushed by a background task
    Interval(Duration),
}

impl Default for PersistMode {
    fn default() -> Self {
        PersistMode::WriteThrough
    }
}

/// A partition mirrored to one JSON document
pub struct FilePartition {
    name: String,
    path: PathBuf,
    mode: PersistMode,
    state: RwLock<HashMap<String, Value>>,
    dirty: AtomicBool,
    // Serializes document writes so an older snapshot never lands last
    write_lock: Mutex<()>,
}

impl FilePartition {
    /// Open the partition document at `path`, loading existing contents
    pub async fn open<P: AsRef<Path>>(
        name: impl Into<String>,
        path: P,
        mode: PersistMode,
    ) -> StorageResult<Self> {
        let path = path.as_ref().to_path_buf();
        let loaded: HashMap<String, Value> = atomic_writer::read_json(&path)?.unwrap_or_default();
        let name = name.into();
        tracing::debug!(partition = %name, path = %path.display(), keys = loaded.len(), "Opened partition");

        Ok(Self {
            name,
            path,
            mode,
            state: RwLock::new(loaded),
            dirty: AtomicBool::new(false),
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Start the background flush task for `PersistMode::Interval`.
    ///
    /// Returns `None` in write-through mode.
    pub fn start_auto_persist(self: Arc<Self>) -> Option<JoinHandle<()>> {
        let PersistMode::Interval(period) = self.mode else {
            return None;
        };

        Some(tokio::spawn(async move {
            let mut ticker = interval(period);
            loop {
                ticker.tick().await;
                if !self.dirty.load(Ordering::Acquire) {
                    continue;
                }
                if let Err(e) = self.persist().await {
                    tracing::error!(partition = %self.name, "Failed to persist partition: {}", e);
                }
            }
        }))
    }

    /// Write pending changes without awaiting, for use during teardown.
    ///
    /// Skipped when a writer currently holds the partition.
    fn flush_if_dirty(&self) {
        if !self.dirty.load(Ordering::Acquire) {
            return;
        }
        let Ok(state) = self.state.try_read() else {
            tracing::warn!(partition = %self.name, "Partition busy at shutdown, pending changes not flushed");
            return;
        };
        let snapshot: BTreeMap<&String, &Value> = state.iter().collect();
        match atomic_writer::write_json(&self.path, &snapshot) {
            Ok(()) => self.dirty.store(false, Ordering::Release),
            Err(e) => tracing::error!(partition = %self.name, "Failed to persist partition: {}", e),
        }
    }

    async fn after_write(&self) -> StorageResult<()> {
        self.dirty.store(true, Ordering::Release);
        match self.mode {
            PersistMode::WriteThrough => self.persist().await,
            PersistMode::Interval(_) => Ok(()),
        }
    }
}

#[async_trait::async_trait]
impl PartitionStore for FilePartition {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get(&self, key: &str) -> StorageResult<Option<Value>> {
        let state = self.state.read().await;
        Ok(state.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> StorageResult<()> {
        {
            let mut state = self.state.write().await;
            state.insert(key.to_string(), value);
        }
        self.after_write().await
    }

    async fn get_many(&self, keys: &[String]) -> StorageResult<Vec<Option<Value>>> {
        require_keys(keys)?;
        let state = self.state.read().await;
        Ok(keys.iter().map(|k| state.get(k).cloned()).collect())
    }

    async fn set_many(&self, items: Vec<(String, Value)>) -> StorageResult<()> {
        {
            let mut state = self.state.write().await;
            for (key, value) in items {
                state.insert(key, value);
            }
        }
        self.after_write().await
    }

    async fn keys(&self) -> StorageResult<Vec<String>> {
        let state = self.state.read().await;
        let mut keys: Vec<String> = state.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }

    async fn persist(&self) -> StorageResult<()> {
        let _guard = self.write_lock.lock().await;
        self.dirty.store(false, Ordering::Release);

        // Sorted keys keep the document diffable
        let snapshot: BTreeMap<String, Value> = {
            let state = self.state.read().await;
            state.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
        };

        if let Err(e) = atomic_writer::write_json(&self.path, &snapshot) {
            self.dirty.store(true, Ordering::Release);
            return Err(e);
        }
        tracing::trace!(partition = %self.name, keys = snapshot.len(), "Persisted partition");
        Ok(())
    }
}

/// Backend storing each database as a directory of partition documents
pub struct FileBackend {
    root: PathBuf,
    mode: PersistMode,
    partitions: Mutex<HashMap<(String, String), Arc<FilePartition>>>,
    flushers: std::sync::Mutex<Vec<JoinHandle<()>>>,
}

impl FileBackend {
    pub fn new<P: AsRef<Path>>(root: P, mode: PersistMode) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            mode,
            partitions: Mutex::new(HashMap::new()),
            flushers: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Location of a partition document
    pub fn partition_path(&self, database: &str, partition: &str) -> PathBuf {
        self.root.join(database).join(format!("{}.json", partition))
    }

    /// Flush every open partition
    pub async fn persist_all(&self) -> StorageResult<()> {
        let open: Vec<Arc<FilePartition>> = self.partitions.lock().await.values().cloned().collect();
        for partition in open {
            partition.persist().await?;
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl StoreBackend for FileBackend {
    async fn open_partition(
        &self,
        database: &str,
        partition: &str,
    ) -> StorageResult<Arc<dyn PartitionStore>> {
        let mut partitions = self.partitions.lock().await;
        let key = (database.to_string(), partition.to_string());
        if let Some(existing) = partitions.get(&key) {
            return Ok(existing.clone());
        }

        let path = self.partition_path(database, partition);
        let opened = Arc::new(FilePartition::open(partition, path, self.mode).await?);
        if let Some(handle) = opened.clone().start_auto_persist() {
            self.flushers
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push(handle);
        }
        partitions.insert(key, opened.clone());
        Ok(opened)
    }
}

impl Drop for FileBackend {
    fn drop(&mut self) {
        let flushers = self.flushers.get_mut().unwrap_or_else(|e| e.into_inner());
        for handle in flushers.drain(..) {
            handle.abort();
        }
        for partition in self.partitions.get_mut().values() {
            partition.flush_if_dirty();
        }
    }
}
