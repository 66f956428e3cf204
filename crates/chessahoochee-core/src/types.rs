//! Domain records persisted by the bindings

use crate::error::{ValidationError, ValidationResult};
use crate::guard;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Numeric identifier of a player or tournament.
///
/// Stores address records by the decimal string form of the id; use
/// [`Id::key`] at the store boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id(pub i64);

impl Id {
    /// Store key for this id
    pub fn key(self) -> String {
        self.0.to_string()
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Id {
    fn from(value: i64) -> Self {
        Id(value)
    }
}

/// Value of a scalar configuration option
pub type OptionValue = f64;

/// A player record.
///
/// Only the id is interpreted here; everything else (name, rating, ...)
/// travels untouched in `attributes`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: Id,

    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl Player {
    pub fn new(id: impl Into<Id>) -> Self {
        Self {
            id: id.into(),
            attributes: Map::new(),
        }
    }

    /// Builder-style attribute setter
    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.to_string(), value.into());
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// Decode a player read back from storage
    pub fn from_value(value: Value) -> ValidationResult<Self> {
        guard::record_id(&value, "player")?;
        serde_json::from_value(value).map_err(|e| ValidationError::InvalidRecord(e.to_string()))
    }

    pub fn to_value(&self) -> Value {
        // A map of JSON values with an integer id always serializes
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// An opaque tournament record (rounds, pairings, metadata).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tournament(Value);

impl Tournament {
    /// The empty record a tournament binding starts from
    pub fn placeholder() -> Self {
        Tournament(Value::Object(Map::new()))
    }

    pub fn from_value(value: Value) -> Self {
        Tournament(value)
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(&self.0, Value::Object(map) if map.is_empty())
    }

    /// The record's `id` field, when present and numeric
    pub fn id(&self) -> Option<Id> {
        guard::record_id(&self.0, "tournament").ok()
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }
}

impl Default for Tournament {
    fn default() -> Self {
        Self::placeholder()
    }
}

impl From<Value> for Tournament {
    fn from(value: Value) -> Self {
        Tournament(value)
    }
}
