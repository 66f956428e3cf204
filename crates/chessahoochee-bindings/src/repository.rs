//! Partition handles and binding factory
//!
//! `Repositories` is constructed once at startup and handed to whoever
//! needs bindings. Tests build one over a `MemoryBackend`.

use crate::config::DbConfig;
use crate::error::{BindingError, IoErrorPolicy, Result};
use crate::options::OptionBinding;
use crate::players::PlayersBinding;
use crate::tournament::TournamentBinding;
use chessahoochee_core::{Id, OptionValue, ValidationError, ValidationResult};
use chessahoochee_storage::{
    PartitionStore, PlayerSeed, StoreBackend, TournamentSeedRecord, partition, spawn_seed,
};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::task::JoinHandle;

pub struct Repositories {
    players: Arc<dyn PartitionStore>,
    options: Arc<dyn PartitionStore>,
    tournaments: Arc<dyn PartitionStore>,
    policy: IoErrorPolicy,
    option_defaults: BTreeMap<String, Value>,
    seeding: Vec<JoinHandle<()>>,
}

impl Repositories {
    /// Open the three partitions without seeding
    pub async fn open(backend: &dyn StoreBackend, config: &DbConfig) -> Result<Self> {
        let database = config.database.as_str();
        Ok(Self {
            players: backend.open_partition(database, partition::PLAYERS).await?,
            options: backend.open_partition(database, partition::OPTIONS).await?,
            tournaments: backend.open_partition(database, partition::TOURNAMENTS).await?,
            policy: config.io_error_policy,
            option_defaults: config.options.clone(),
            seeding: Vec::new(),
        })
    }

    /// Open the partitions and start seeding from the configured datasets.
    ///
    /// Seeding runs in the background; unreadable seed files are logged and
    /// skipped. Use [`Repositories::seeded`] to wait for it.
    pub async fn init(backend: &dyn StoreBackend, config: &DbConfig) -> Result<Self> {
        let mut repos = Self::open(backend, config).await?;

        if let Some(path) = &config.seed.players {
            match PlayerSeed::from_file(path) {
                Ok(seed) => repos.seed_players(seed),
                Err(e) => tracing::warn!(path = %path.display(), "Skipping player seed: {}", e),
            }
        }

        if let Some(path) = &config.seed.tournaments {
            match TournamentSeedRecord::from_file(path) {
                Ok(records) => repos.seed_tournaments(records),
                Err(e) => tracing::warn!(path = %path.display(), "Skipping tournament seed: {}", e),
            }
        }

        Ok(repos)
    }

    /// Upsert a player dataset in the background
    pub fn seed_players(&mut self, seed: PlayerSeed) {
        let handle = spawn_seed(self.players.clone(), seed.player_list, |p| p.id);
        self.seeding.push(handle);
    }

    /// Upsert a tournament dataset in the background
    pub fn seed_tournaments(&mut self, records: Vec<TournamentSeedRecord>) {
        let handle = spawn_seed(self.tournaments.clone(), records, |t| t.id);
        self.seeding.push(handle);
    }

    /// Wait for background seeding to finish
    pub async fn seeded(&mut self) -> Result<()> {
        for handle in self.seeding.drain(..) {
            handle.await.map_err(|e| BindingError::Task(e.to_string()))?;
        }
        Ok(())
    }

    /// Flush all three partitions to their backing storage
    pub async fn persist_all(&self) -> Result<()> {
        for store in [&self.players, &self.options, &self.tournaments] {
            store.persist().await?;
        }
        Ok(())
    }

    pub fn policy(&self) -> IoErrorPolicy {
        self.policy
    }

    pub fn players_store(&self) -> Arc<dyn PartitionStore> {
        self.players.clone()
    }

    pub fn options_store(&self) -> Arc<dyn PartitionStore> {
        self.options.clone()
    }

    pub fn tournaments_store(&self) -> Arc<dyn PartitionStore> {
        self.tournaments.clone()
    }

    /// Bind to a list of player ids
    pub fn players(&self, ids: Vec<Id>) -> PlayersBinding {
        PlayersBinding::new(self.players.clone(), ids, self.policy)
    }

    /// Bind to an option whose default comes from configuration
    pub fn option(&self, key: &str) -> ValidationResult<OptionBinding> {
        let default = self
            .option_defaults
            .get(key)
            .ok_or_else(|| ValidationError::MissingDefault(key.to_string()))?;
        OptionBinding::with_raw_default(self.options.clone(), key, default, self.policy)
    }

    /// Bind to an option with an explicit default
    pub fn option_with_default(&self, key: &str, default: OptionValue) -> ValidationResult<OptionBinding> {
        OptionBinding::new(self.options.clone(), key, default, self.policy)
    }

    /// Bind to one tournament
    pub fn tournament(&self, id: Id) -> TournamentBinding {
        TournamentBinding::new(self.tournaments.clone(), id, self.policy)
    }
}
