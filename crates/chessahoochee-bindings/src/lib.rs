//! Chessahoochee Reactive Bindings
//!
//! A binding ties a key (or a list of keys) to a piece of local state:
//! changing the key loads the backing value from its partition, and user
//! edits are written back. Three bindings are provided:
//! - [`PlayersBinding`]: many player records by id, read only
//! - [`OptionBinding`]: one numeric option with a default
//! - [`TournamentBinding`]: one tournament record
//!
//! Bindings are created from a [`Repositories`] object, which owns the
//! partition handles and seeds them at startup. All bindings must be created
//! and driven from within a Tokio runtime.

pub mod binding;
pub mod config;
pub mod error;
pub mod lookup;
pub mod options;
pub mod players;
pub mod repository;
pub mod tournament;

pub use binding::{Binding, Phase, Source};
pub use config::DbConfig;
pub use error::{BindingError, IoErrorPolicy, Result};
pub use lookup::PlayerLookup;
pub use options::OptionBinding;
pub use players::PlayersBinding;
pub use repository::Repositories;
pub use tournament::TournamentBinding;
