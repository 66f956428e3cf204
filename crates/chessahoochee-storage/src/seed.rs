//! Bulk-loading static datasets into partitions
//!
//! Seeding is an upsert of every record under the string form of its id, so
//! running it again with the same data rewrites identical values and
//! nothing else.

use crate::traits::{PartitionStore, StorageError, StorageResult};
use chessahoochee_core::{Id, Player, Tournament};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Player dataset: `{ "playerList": [ { "id": 1, ... }, ... ] }`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSeed {
    pub player_list: Vec<Player>,
}

impl PlayerSeed {
    pub fn from_file<P: AsRef<Path>>(path: P) -> StorageResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> StorageResult<Self> {
        serde_json::from_str(content)
            .map_err(|e| StorageError::InvalidData(format!("Invalid player seed: {}", e)))
    }
}

/// One entry of the tournament dataset, which is a plain JSON list.
///
/// Only `id` is required; the rest of the record is kept as is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TournamentSeedRecord {
    pub id: Id,

    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl TournamentSeedRecord {
    pub fn from_file<P: AsRef<Path>>(path: P) -> StorageResult<Vec<Self>> {
        let content = std::fs::read_to_string(path)?;
        Self::parse_list(&content)
    }

    pub fn parse_list(content: &str) -> StorageResult<Vec<Self>> {
        serde_json::from_str(content)
            .map_err(|e| StorageError::InvalidData(format!("Invalid tournament seed: {}", e)))
    }

    pub fn into_tournament(self) -> Tournament {
        let mut record = self.fields;
        record.insert("id".to_string(), Value::from(self.id.0));
        Tournament::from_value(Value::Object(record))
    }
}

/// Upsert every record under `id_of(record)`, returning how many were written
pub async fn seed<R, F>(store: &dyn PartitionStore, records: &[R], id_of: F) -> StorageResult<usize>
where
    R: Serialize,
    F: Fn(&R) -> Id,
{
    if records.is_empty() {
        return Ok(0);
    }

    let items = records
        .iter()
        .map(|record| {
            let value = serde_json::to_value(record)
                .map_err(|e| StorageError::Serialization(format!("Failed to encode seed record: {}", e)))?;
            Ok((id_of(record).key(), value))
        })
        .collect::<StorageResult<Vec<(String, Value)>>>()?;

    let count = items.len();
    store.set_many(items).await?;
    tracing::info!(partition = store.name(), count, "Seeded partition");
    Ok(count)
}

/// Fire-and-forget [`seed`]: failures are logged, never returned
pub fn spawn_seed<R, F>(store: Arc<dyn PartitionStore>, records: Vec<R>, id_of: F) -> JoinHandle<()>
where
    R: Serialize + Send + Sync + 'static,
    F: Fn(&R) -> Id + Send + 'static,
{
    tokio::spawn(async move {
        if let Err(e) = seed(store.as_ref(), &records, id_of).await {
            tracing::warn!(partition = store.name(), "Seeding failed: {}", e);
        }
    })
}
