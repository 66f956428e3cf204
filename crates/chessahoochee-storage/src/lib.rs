//! Chessahoochee Storage Abstraction
//!
//! This crate provides partitioned key-value storage:
//! - Partition handle and backend traits
//! - In-memory backend (tests and ephemeral runs)
//! - File backend (one JSON document per partition, atomic writes)
//! - Seeder for bulk-loading static datasets

pub mod atomic_writer;
pub mod file;
pub mod memory;
pub mod seed;
pub mod traits;

pub use file::{FileBackend, FilePartition, PersistMode};
pub use memory::{MemoryBackend, MemoryPartition};
pub use seed::{PlayerSeed, TournamentSeedRecord, seed, spawn_seed};
pub use traits::{PartitionStore, StorageError, StorageResult, StoreBackend, partition};
