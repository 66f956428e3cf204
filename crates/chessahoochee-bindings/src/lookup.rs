//! Lookup of loaded players by id

use chessahoochee_core::{Id, Player};
use std::sync::Arc;

/// Loaded player set, in request order; `None` where an id had no record
pub type PlayerList = Arc<Vec<Option<Player>>>;

/// Find a player in a loaded set
pub fn get_player_by_id(players: &[Option<Player>], id: Id) -> Option<&Player> {
    players.iter().flatten().find(|player| player.id == id)
}

/// Accessor over one snapshot of a players binding.
///
/// Built from the set loaded at the time of the call; take a fresh one
/// after the binding changes.
#[derive(Debug, Clone, Default)]
pub struct PlayerLookup {
    players: PlayerList,
}

impl PlayerLookup {
    pub fn new(players: PlayerList) -> Self {
        Self { players }
    }

    pub fn get(&self, id: Id) -> Option<&Player> {
        get_player_by_id(&self.players, id)
    }

    pub fn players(&self) -> &[Option<Player>] {
        &self.players
    }

    /// Single-argument closure form, for callers that want `getPlayer(id)`
    pub fn into_fn(self) -> impl Fn(Id) -> Option<Player> + Send + Sync + 'static {
        move |id| self.get(id).cloned()
    }
}
