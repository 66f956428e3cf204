//! Option binding: one numeric configuration value with a default
//!
//! Loading a key that was never written falls back to the default and
//! stores it. A stored value that is not a finite number is reported as a
//! validation error and the current value is kept.

use crate::binding::{Binding, Core, Loaded, Phase, Source};
use crate::error::{IoErrorPolicy, Result};
use chessahoochee_core::{OptionValue, ValidationResult, guard};
use chessahoochee_storage::PartitionStore;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::watch;

pub struct OptionBinding {
    core: Core<OptionValue>,
    key: String,
    default: OptionValue,
}

impl OptionBinding {
    /// Bind to `key` and start loading it.
    ///
    /// Fails before any I/O if `default` is not a finite number.
    pub fn new(
        store: Arc<dyn PartitionStore>,
        key: impl Into<String>,
        default: OptionValue,
        policy: IoErrorPolicy,
    ) -> ValidationResult<Self> {
        let key = key.into();
        let default = guard::number(default, &format!("default of option {}", key))?;
        let binding = Self {
            core: Core::new(store, policy, default),
            key,
            default,
        };
        binding.load();
        Ok(binding)
    }

    /// Like [`OptionBinding::new`] with the default given as raw JSON, as it
    /// arrives from configuration
    pub fn with_raw_default(
        store: Arc<dyn PartitionStore>,
        key: impl Into<String>,
        default: &Value,
        policy: IoErrorPolicy,
    ) -> ValidationResult<Self> {
        let key = key.into();
        let default = guard::number_value(default, &format!("default of option {}", key))?;
        Self::new(store, key, default, policy)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn default_value(&self) -> OptionValue {
        self.default
    }

    pub fn value(&self) -> OptionValue {
        self.core.get()
    }

    /// Set the value and write it back
    pub fn set(&self, value: OptionValue) -> ValidationResult<()> {
        let value = guard::number(value, &format!("option {}", self.key))?;
        self.core.edit(value, self.key.clone(), encode(value));
        Ok(())
    }

    /// Rebind to another key; reloads when it differs
    pub fn set_key(&mut self, key: impl Into<String>) -> bool {
        let key = key.into();
        if key == self.key {
            return false;
        }
        self.key = key;
        self.load();
        true
    }

    /// Change the fallback; reloads when it differs
    pub fn set_default(&mut self, default: OptionValue) -> ValidationResult<bool> {
        let default = guard::number(default, &format!("default of option {}", self.key))?;
        if default == self.default {
            return Ok(false);
        }
        self.default = default;
        self.load();
        Ok(true)
    }

    pub fn last_source(&self) -> Option<Source> {
        self.core.last_source()
    }

    fn load(&self) {
        let fetch = fetch_option(self.core.store(), self.key.clone(), self.default);
        self.core.spawn_load(self.key.clone(), fetch);
    }
}

async fn fetch_option(
    store: Arc<dyn PartitionStore>,
    key: String,
    default: OptionValue,
) -> Result<Loaded<OptionValue>> {
    match store.get(&key).await? {
        None => {
            tracing::debug!(partition = store.name(), key = %key, default, "Option unset, storing default");
            Ok(Loaded::Materialize(default, encode(default)))
        }
        Some(raw) => {
            let value = guard::number_value(&raw, &format!("stored option {}", key))?;
            Ok(Loaded::Found(value))
        }
    }
}

/// Whole numbers are stored as JSON integers
fn encode(value: OptionValue) -> Value {
    if value.fract() == 0.0 && value.abs() < 9_007_199_254_740_992.0 {
        Value::from(value as i64)
    } else {
        Value::from(value)
    }
}

#[async_trait::async_trait]
impl Binding for OptionBinding {
    type State = OptionValue;

    fn state(&self) -> OptionValue {
        self.value()
    }

    fn phase(&self) -> Phase {
        self.core.phase()
    }

    fn subscribe(&self) -> watch::Receiver<OptionValue> {
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

    fn store() -> Arc<MemoryPartition> {
        Arc::new(MemoryPartition::new("Options"))
    }

    #[tokio::test]
    async fn test_initial_value_is_default() {
        let binding = OptionBinding::new(store(), "roundCount", 5.0, IoErrorPolicy::default()).unwrap();
        assert_eq!(binding.value(), 5.0);
        assert_eq!(binding.phase(), Phase::Loading);
        binding.settle().await.unwrap();
    }

    #[tokio::test]
    async fn test_unset_key_stores_default() {
        let store = store();
        let binding = OptionBinding::new(store.clone(), "roundCount", 5.0, IoErrorPolicy::default()).unwrap();
        binding.settle().await.unwrap();

        assert_eq!(binding.value(), 5.0);
        assert_eq!(binding.phase(), Phase::Ready);
        assert_eq!(store.get("roundCount").await.unwrap(), Some(json!(5)));
    }

    #[tokio::test]
    async fn test_stored_value_wins_over_default() {
        let store = store();
        store.set("roundCount", json!(7)).await.unwrap();

        let binding = OptionBinding::new(store.clone(), "roundCount", 5.0, IoErrorPolicy::default()).unwrap();
        binding.settle().await.unwrap();

        assert_eq!(binding.value(), 7.0);
        assert_eq!(binding.last_source(), Some(Source::Load));
        // The default never overwrote the stored value
        assert_eq!(store.get("roundCount").await.unwrap(), Some(json!(7)));
    }

    #[tokio::test]
    async fn test_set_persists() {
        let store = store();
        let binding = OptionBinding::new(store.clone(), "roundCount", 5.0, IoErrorPolicy::default()).unwrap();
        binding.settle().await.unwrap();

        binding.set(7.0).unwrap();
        binding.settle().await.unwrap();

        assert_eq!(binding.value(), 7.0);
        assert_eq!(store.get("roundCount").await.unwrap(), Some(json!(7)));
    }

    #[tokio::test]
    async fn test_fractional_values_round_trip() {
        let store = store();
        let binding = OptionBinding::new(store.clone(), "winValue", 1.0, IoErrorPolicy::default()).unwrap();
        binding.set(0.5).unwrap();
        binding.settle().await.unwrap();

        let fresh = OptionBinding::new(store, "winValue", 1.0, IoErrorPolicy::default()).unwrap();
        fresh.settle().await.unwrap();
        assert_eq!(fresh.value(), 0.5);
    }

    #[tokio::test]
    async fn test_non_finite_default_rejected() {
        let result = OptionBinding::new(store(), "x", f64::NAN, IoErrorPolicy::default());
        assert!(matches!(result, Err(ValidationError::NotFinite { .. })));
    }

    #[tokio::test]
    async fn test_string_default_rejected_before_io() {
        let store = store();
        let result = OptionBinding::with_raw_default(store.clone(), "x", &json!("5"), IoErrorPolicy::default());

        assert!(matches!(result, Err(ValidationError::NotNumeric { .. })));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_set_rejects_non_finite() {
        let binding = OptionBinding::new(store(), "x", 1.0, IoErrorPolicy::default()).unwrap();
        assert!(binding.set(f64::INFINITY).is_err());
        binding.settle().await.unwrap();
        assert_eq!(binding.value(), 1.0);
    }

    #[tokio::test]
    async fn test_corrupt_stored_value_is_surfaced() {
        let store = store();
        store.set("x", json!("seven")).await.unwrap();

        let binding = OptionBinding::new(store.clone(), "x", 1.0, IoErrorPolicy::default()).unwrap();
        let err = binding.settle().await.unwrap_err();

        assert!(matches!(err, BindingError::Validation(ValidationError::NotNumeric { .. })));
        assert_eq!(binding.value(), 1.0);
        // Corruption is reported, not papered over
        assert_eq!(store.get("x").await.unwrap(), Some(json!("seven")));
    }

    #[tokio::test]
    async fn test_set_key_reloads() {
        let store = store();
        store.set("a", json!(1)).await.unwrap();
        store.set("b", json!(2)).await.unwrap();

        let mut binding = OptionBinding::new(store, "a", 0.0, IoErrorPolicy::default()).unwrap();
        binding.settle().await.unwrap();
        assert_eq!(binding.value(), 1.0);

        assert!(!binding.set_key("a"));
        assert!(binding.set_key("b"));
        binding.settle().await.unwrap();
        assert_eq!(binding.value(), 2.0);
        assert_eq!(binding.key(), "b");
    }

    #[tokio::test]
    async fn test_set_default_reloads() {
        let store = store();
        let mut binding = OptionBinding::new(store.clone(), "x", 1.0, IoErrorPolicy::default()).unwrap();
        binding.settle().await.unwrap();

        assert!(!binding.set_default(1.0).unwrap());
        assert!(binding.set_default(2.0).unwrap());
        binding.settle().await.unwrap();

        // Already stored, so the new default does not apply
        assert_eq!(binding.value(), 1.0);
        assert_eq!(binding.default_value(), 2.0);
    }

    #[test]
    fn test_encode() {
        assert_eq!(encode(5.0), json!(5));
        assert_eq!(encode(-3.0), json!(-3));
        assert_eq!(encode(0.5), json!(0.5));
    }
}
