//! Shared load/save machinery behind every binding
//!
//! ## State machine
//!
//! A binding is `Uninitialized` until its first load finishes or the user
//! edits it. While any load is in flight it is `Loading`; while any write is
//! in flight (and no load) it is `Saving`; otherwise `Ready`.
//!
//! Every state update is tagged with its [`Source`]. Only `Edit` updates
//! schedule a write, so applying a loaded value never echoes it back to the
//! store and an initial placeholder is never persisted over real data.
//!
//! ## Ordering
//!
//! Loads are not cancelled. When a key changes twice before the first load
//! resolves, whichever load completes last decides the state.

use crate::error::{BindingError, IoErrorPolicy, Result};
use chessahoochee_storage::{PartitionStore, StorageResult};
use serde_json::Value;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Observable lifecycle of a binding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Uninitialized,
    Loading,
    Ready,
    Saving,
}

/// Origin of a state update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// Applied from a completed load
    Load,
    /// Set by the user
    Edit,
}

/// Common surface of the player, option and tournament bindings
#[async_trait::async_trait]
pub trait Binding: Send + Sync {
    type State: Clone + Send + Sync + 'static;

    /// Current state
    fn state(&self) -> Self::State;

    fn phase(&self) -> Phase;

    /// Receiver that observes every state update
    fn subscribe(&self) -> watch::Receiver<Self::State>;

    /// Wait for in-flight loads and saves, then report what went wrong.
    ///
    /// Validation failures are always returned. Store failures are returned
    /// only under [`IoErrorPolicy::Propagate`]. Errors come back one per
    /// call, oldest first.
    async fn settle(&self) -> Result<()>;
}

/// Result of a load's fetch step
pub(crate) enum Loaded<T> {
    /// Replace state with a value read from the store
    Found(T),
    /// Replace state and write `Value` under the load's key, unless the
    /// user edited the binding while the fetch was in flight
    Materialize(T, Value),
}

struct Shared<T> {
    value: watch::Sender<T>,
    track: Mutex<Track>,
}

#[derive(Default)]
struct Track {
    loads: usize,
    saves: usize,
    ready: bool,
    last_source: Option<Source>,
    // Bumped on every edit
    edits: u64,
    errors: Vec<BindingError>,
}

/// Marks a load finished when dropped, including when the fetch panics
struct LoadDone<T>(Arc<Shared<T>>);

impl<T> Drop for LoadDone<T> {
    fn drop(&mut self) {
        let mut track = self.0.track();
        track.loads -= 1;
        track.ready = true;
    }
}

/// Marks a save finished when dropped, including when the write panics
struct SaveDone<T>(Arc<Shared<T>>);

impl<T> SaveDone<T> {
    fn start(shared: Arc<Shared<T>>) -> Self {
        shared.track().saves += 1;
        Self(shared)
    }
}

impl<T> Drop for SaveDone<T> {
    fn drop(&mut self) {
        self.0.track().saves -= 1;
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<T> Shared<T> {
    fn track(&self) -> MutexGuard<'_, Track> {
        lock(&self.track)
    }

    fn apply(&self, value: T, source: Source) {
        self.value.send_replace(value);
        let mut track = self.track();
        track.last_source = Some(source);
        if source == Source::Edit {
            track.edits += 1;
            track.ready = true;
        }
    }

    fn edits(&self) -> u64 {
        self.track().edits
    }

    fn finish_save(&self, result: StorageResult<()>, policy: IoErrorPolicy, partition: &str, key: &str) {
        match result {
            Ok(()) => tracing::debug!(partition, key, "Saved"),
            Err(e) => self.report(e.into(), policy, partition, key),
        }
    }

    fn report(&self, error: BindingError, policy: IoErrorPolicy, partition: &str, key: &str) {
        let keep = match &error {
            BindingError::Storage(_) => {
                tracing::warn!(partition, key, "Store operation failed: {}", error);
                policy == IoErrorPolicy::Propagate
            }
            _ => {
                tracing::warn!(partition, key, "Rejected value: {}", error);
                true
            }
        };
        if keep {
            self.track().errors.push(error);
        }
    }
}

/// State slot plus the effects that keep it in sync with one partition
pub(crate) struct Core<T> {
    shared: Arc<Shared<T>>,
    store: Arc<dyn PartitionStore>,
    policy: IoErrorPolicy,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl<T> Core<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub(crate) fn new(store: Arc<dyn PartitionStore>, policy: IoErrorPolicy, initial: T) -> Self {
        let (value, _) = watch::channel(initial);
        Self {
            shared: Arc::new(Shared {
                value,
                track: Mutex::new(Track::default()),
            }),
            store,
            policy,
            tasks: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn get(&self) -> T {
        self.shared.value.borrow().clone()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<T> {
        self.shared.value.subscribe()
    }

    pub(crate) fn phase(&self) -> Phase {
        let track = self.shared.track();
        if track.loads > 0 {
            Phase::Loading
        } else if track.saves > 0 {
            Phase::Saving
        } else if track.ready {
            Phase::Ready
        } else {
            Phase::Uninitialized
        }
    }

    pub(crate) fn last_source(&self) -> Option<Source> {
        self.shared.track().last_source
    }

    pub(crate) fn store(&self) -> Arc<dyn PartitionStore> {
        self.store.clone()
    }

    /// Run `fetch` in the background and apply what it finds
    pub(crate) fn spawn_load<F>(&self, key: String, fetch: F)
    where
        F: Future<Output = Result<Loaded<T>>> + Send + 'static,
    {
        let shared = self.shared.clone();
        let store = self.store.clone();
        let policy = self.policy;
        let edits_at_start = {
            let mut track = shared.track();
            track.loads += 1;
            track.edits
        };
        tracing::debug!(partition = store.name(), key = %key, "Loading");

        let handle = tokio::spawn(async move {
            let _done = LoadDone(shared.clone());
            match fetch.await {
                Ok(Loaded::Found(value)) => shared.apply(value, Source::Load),
                Ok(Loaded::Materialize(_, _)) if shared.edits() != edits_at_start => {
                    tracing::debug!(partition = store.name(), key = %key, "Edited during load, default not stored");
                }
                Ok(Loaded::Materialize(value, raw)) => {
                    shared.apply(value, Source::Load);
                    let _saving = SaveDone::start(shared.clone());
                    let result = store.set(&key, raw).await;
                    shared.finish_save(result, policy, store.name(), &key);
                }
                Err(e) => shared.report(e, policy, store.name(), &key),
            }
        });
        self.push_task(handle);
    }

    /// Apply a user edit and write it back under `key`
    pub(crate) fn edit(&self, value: T, key: String, raw: Value) {
        self.shared.apply(value, Source::Edit);

        let shared = self.shared.clone();
        let store = self.store.clone();
        let policy = self.policy;
        let saving = SaveDone::start(shared.clone());

        let handle = tokio::spawn(async move {
            let _saving = saving;
            let result = store.set(&key, raw).await;
            shared.finish_save(result, policy, store.name(), &key);
        });
        self.push_task(handle);
    }

    fn push_task(&self, handle: JoinHandle<()>) {
        let mut tasks = lock(&self.tasks);
        tasks.retain(|task| !task.is_finished());
        tasks.push(handle);
    }

    pub(crate) async fn settle(&self) -> Result<()> {
        loop {
            let pending = std::mem::take(&mut *lock(&self.tasks));
            if pending.is_empty() {
                break;
            }
            for handle in pending {
                if let Err(e) = handle.await {
                    if e.is_panic() {
                        self.shared.track().errors.push(BindingError::Task(e.to_string()));
                    }
                }
            }
        }

        // Oldest first; the rest wait for the next call
        let mut track = self.shared.track();
        if track.errors.is_empty() {
            Ok(())
        } else {
            Err(track.errors.remove(0))
        }
    }
}
