//! Test stores for driving bindings through races and failures

#![allow(dead_code)]

use async_trait::async_trait;
use chessahoochee_storage::{MemoryPartition, PartitionStore, StorageError, StorageResult};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// Memory partition whose reads of gated keys wait for `release`
pub struct GatedStore {
    inner: MemoryPartition,
    gates: Mutex<HashMap<String, Arc<Notify>>>,
    late_gates: Mutex<HashMap<String, Arc<Notify>>>,
    pub reads: AtomicUsize,
    pub writes: AtomicUsize,
}

impl GatedStore {
    pub fn new(name: &str) -> Arc<Self> {
        Arc::new(Self {
            inner: MemoryPartition::new(name),
            gates: Mutex::new(HashMap::new()),
            late_gates: Mutex::new(HashMap::new()),
            reads: AtomicUsize::new(0),
            writes: AtomicUsize::new(0),
        })
    }

    /// Make reads of `key` block until released
    pub fn gate(&self, key: &str) {
        self.gates
            .lock()
            .unwrap()
            .insert(key.to_string(), Arc::new(Notify::new()));
    }

    /// Make reads of `key` take their value, then block until released
    pub fn gate_after_read(&self, key: &str) {
        self.late_gates
            .lock()
            .unwrap()
            .insert(key.to_string(), Arc::new(Notify::new()));
    }

    /// Let the blocked read of `key` through and stop gating it
    pub fn release(&self, key: &str) {
        let gates = [
            self.gates.lock().unwrap().remove(key),
            self.late_gates.lock().unwrap().remove(key),
        ];
        for gate in gates.into_iter().flatten() {
            gate.notify_one();
        }
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    async fn wait(gates: &Mutex<HashMap<String, Arc<Notify>>>, key: &str) {
        let gate = gates.lock().unwrap().get(key).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }
    }
}

#[async_trait]
impl PartitionStore for GatedStore {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn get(&self, key: &str) -> StorageResult<Option<Value>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Self::wait(&self.gates, key).await;
        let value = self.inner.get(key).await;
        Self::wait(&self.late_gates, key).await;
        value
    }

    async fn set(&self, key: &str, value: Value) -> StorageResult<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.set(key, value).await
    }

    async fn get_many(&self, keys: &[String]) -> StorageResult<Vec<Option<Value>>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Self::wait(&self.gates, &keys.join(",")).await;
        self.inner.get_many(keys).await
    }

    async fn set_many(&self, items: Vec<(String, Value)>) -> StorageResult<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.set_many(items).await
    }

    async fn keys(&self) -> StorageResult<Vec<String>> {
        self.inner.keys().await
    }
}

/// Memory partition that can be switched into failing every call
pub struct FlakyStore {
    inner: MemoryPartition,
    failing: AtomicBool,
}

impl FlakyStore {
    pub fn new(name: &str) -> Arc<Self> {
        Arc::new(Self {
            inner: MemoryPartition::new(name),
            failing: AtomicBool::new(false),
        })
    }

    pub fn fail(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> StorageResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            Err(StorageError::Backend("storage quota exceeded".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl PartitionStore for FlakyStore {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn get(&self, key: &str) -> StorageResult<Option<Value>> {
        self.check()?;
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: Value) -> StorageResult<()> {
        self.check()?;
        self.inner.set(key, value).await
    }

    async fn get_many(&self, keys: &[String]) -> StorageResult<Vec<Option<Value>>> {
        self.check()?;
        self.inner.get_many(keys).await
    }

    async fn set_many(&self, items: Vec<(String, Value)>) -> StorageResult<()> {
        self.check()?;
        self.inner.set_many(items).await
    }

    async fn keys(&self) -> StorageResult<Vec<String>> {
        self.check()?;
        self.inner.keys().await
    }
}
