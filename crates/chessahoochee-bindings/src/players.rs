//! Players binding: many player records by id
//!
//! Read only. Changing the id list (by value) loads every listed record in
//! one `get_many` and replaces the loaded set wholesale. An empty id list
//! performs no I/O and keeps whatever was loaded before.

use crate::binding::{Binding, Core, Loaded, Phase};
use crate::error::{IoErrorPolicy, Result};
use crate::lookup::{PlayerList, PlayerLookup, get_player_by_id};
use chessahoochee_core::{Id, Player, ValidationResult, guard};
use chessahoochee_storage::PartitionStore;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::watch;

pub struct PlayersBinding {
    core: Core<PlayerList>,
    ids: Vec<Id>,
}

impl PlayersBinding {
    /// Bind to `ids`, loading them if the list is non-empty
    pub fn new(store: Arc<dyn PartitionStore>, ids: Vec<Id>, policy: IoErrorPolicy) -> Self {
        let mut binding = Self {
            core: Core::new(store, policy, Arc::new(Vec::new())),
            ids: Vec::new(),
        };
        binding.set_ids(ids);
        binding
    }

    pub fn ids(&self) -> &[Id] {
        &self.ids
    }

    /// Rebind to a new id list.
    ///
    /// Returns whether a load was started: `false` when the list equals the
    /// current one or is empty.
    pub fn set_ids(&mut self, ids: Vec<Id>) -> bool {
        if ids == self.ids {
            return false;
        }
        self.ids = ids;
        if self.ids.is_empty() {
            return false;
        }

        let store = self.core.store();
        let keys: Vec<String> = self.ids.iter().map(|id| id.key()).collect();
        let label = keys.join(",");
        self.core.spawn_load(label, fetch_players(store, keys));
        true
    }

    /// Rebind to an id list given as raw JSON, e.g. read out of a
    /// tournament record. Fails before any I/O if it is not a list of
    /// integers.
    pub fn set_ids_from_value(&mut self, ids: &Value) -> ValidationResult<bool> {
        let ids = guard::id_list(ids, "player ids")?;
        Ok(self.set_ids(ids))
    }

    /// Loaded records, one per requested id
    pub fn players(&self) -> PlayerList {
        self.core.get()
    }

    /// Accessor over the currently loaded set
    pub fn lookup(&self) -> PlayerLookup {
        PlayerLookup::new(self.players())
    }

    pub fn get_player(&self, id: Id) -> Option<Player> {
        get_player_by_id(&self.players(), id).cloned()
    }
}

async fn fetch_players(store: Arc<dyn PartitionStore>, keys: Vec<String>) -> Result<Loaded<PlayerList>> {
    let values = store.get_many(&keys).await?;
    let players = values
        .into_iter()
        .map(|value| value.map(Player::from_value).transpose())
        .collect::<ValidationResult<Vec<Option<Player>>>>()?;
    tracing::debug!(partition = store.name(), count = players.len(), "Player list was updated");
    Ok(Loaded::Found(Arc::new(players)))
}

#[async_trait::async_trait]
impl Binding for PlayersBinding {
    type State = PlayerList;

    fn state(&self) -> PlayerList {
        self.players()
    }

    fn phase(&self) -> Phase {
        self.core.phase()
    }

    fn subscribe(&self) -> watch::Receiver<PlayerList> {
        self.core.subscribe()
    }

    async fn settle(&self) -> Result<()> {
        self.core.settle().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BindingError;
    use chessahoochee_core::ValidationError;
    use chessahoochee_storage::MemoryPartition;
    use serde_json::json;

    async fn store() -> Arc<MemoryPartition> {
        let store = Arc::new(MemoryPartition::new("Players"));
        for (id, name) in [(1, "Judit"), (2, "Hikaru"), (3, "Magnus")] {
            store
                .set(&id.to_string(), json!({"id": id, "name": name}))
                .await
                .unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_loads_in_request_order() {
        let store = store().await;
        let binding = PlayersBinding::new(store, vec![Id(3), Id(1)], IoErrorPolicy::default());
        binding.settle().await.unwrap();

        let players = binding.players();
        assert_eq!(players.len(), 2);
        assert_eq!(players[0].as_ref().unwrap().id, Id(3));
        assert_eq!(players[1].as_ref().unwrap().id, Id(1));

        let judit = binding.get_player(Id(1)).unwrap();
        assert_eq!(judit.attribute("name"), Some(&json!("Judit")));
        assert!(binding.get_player(Id(2)).is_none());
    }

    #[tokio::test]
    async fn test_missing_record_keeps_position() {
        let store = store().await;
        let binding = PlayersBinding::new(store, vec![Id(1), Id(99)], IoErrorPolicy::default());
        binding.settle().await.unwrap();

        let players = binding.players();
        assert_eq!(players.len(), 2);
        assert!(players[1].is_none());
    }

    #[tokio::test]
    async fn test_empty_list_starts_uninitialized() {
        let store = store().await;
        let binding = PlayersBinding::new(store, Vec::new(), IoErrorPolicy::default());
        binding.settle().await.unwrap();

        assert!(binding.players().is_empty());
        assert_eq!(binding.phase(), Phase::Uninitialized);
    }

    #[tokio::test]
    async fn test_same_ids_do_not_reload() {
        let store = store().await;
        let mut binding = PlayersBinding::new(store, vec![Id(1), Id(2)], IoErrorPolicy::default());
        binding.settle().await.unwrap();

        assert!(!binding.set_ids(vec![Id(1), Id(2)]));
        assert!(binding.set_ids(vec![Id(2), Id(1)]));
        binding.settle().await.unwrap();
        assert_eq!(binding.players()[0].as_ref().unwrap().id, Id(2));
    }

    #[tokio::test]
    async fn test_reload_replaces_wholesale() {
        let store = store().await;
        let mut binding = PlayersBinding::new(store, vec![Id(1), Id(2)], IoErrorPolicy::default());
        binding.settle().await.unwrap();

        binding.set_ids(vec![Id(3)]);
        binding.settle().await.unwrap();

        assert_eq!(binding.players().len(), 1);
        assert!(binding.get_player(Id(1)).is_none());
        assert!(binding.get_player(Id(3)).is_some());
    }

    #[tokio::test]
    async fn test_ids_from_value() {
        let store = store().await;
        let mut binding = PlayersBinding::new(store, Vec::new(), IoErrorPolicy::default());

        assert!(binding.set_ids_from_value(&json!([2])).unwrap());
        binding.settle().await.unwrap();
        assert!(binding.get_player(Id(2)).is_some());

        let err = binding.set_ids_from_value(&json!([1, "two"])).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidId { index: 1, .. }));
        assert_eq!(binding.ids(), &[Id(2)]);
    }

    #[tokio::test]
    async fn test_corrupt_record_is_surfaced() {
        let store = store().await;
        store.set("5", json!("not a player")).await.unwrap();
        let binding = PlayersBinding::new(store, vec![Id(1), Id(5)], IoErrorPolicy::default());

        let err = binding.settle().await.unwrap_err();
        assert!(matches!(err, BindingError::Validation(_)));
        assert!(binding.players().is_empty());
    }

    #[tokio::test]
    async fn test_lookup_is_a_snapshot() {
        let store = store().await;
        let mut binding = PlayersBinding::new(store, vec![Id(1)], IoErrorPolicy::default());
        binding.settle().await.unwrap();
        let before = binding.lookup();

        binding.set_ids(vec![Id(2)]);
        binding.settle().await.unwrap();

        assert!(before.get(Id(1)).is_some());
        assert!(binding.lookup().get(Id(2)).is_some());
        assert!(binding.lookup().get(Id(1)).is_none());
    }
}
