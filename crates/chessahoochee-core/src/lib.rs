//! Chessahoochee Core Types
//!
//! This crate provides the types shared by the persistence layer:
//! - Entity identifiers and their store-key form
//! - Player and tournament records
//! - The runtime type guard for values crossing the storage boundary

pub mod error;
pub mod guard;
pub mod types;

pub use error::{ValidationError, ValidationResult};
pub use types::{Id, OptionValue, Player, Tournament};
