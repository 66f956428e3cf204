//! Database configuration
//!
//! Loaded from YAML or TOML, then overridden by `CHESSAHOOCHEE_*`
//! environment variables.

use crate::error::{BindingError, IoErrorPolicy, Result};
use chessahoochee_storage::{FileBackend, MemoryBackend, PersistMode, StoreBackend};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Memory,
    File,
}

impl Default for BackendKind {
    fn default() -> Self {
        BackendKind::File
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersistPolicy {
    WriteThrough,
    Interval,
}

impl Default for PersistPolicy {
    fn default() -> Self {
        PersistPolicy::WriteThrough
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DbConfig {
    #[serde(default = "default_database")]
    pub database: String,

    #[serde(default)]
    pub backend: BackendKind,

    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default)]
    pub persist: PersistPolicy,

    #[serde(default = "default_persist_interval_secs")]
    pub persist_interval_secs: u64,

    #[serde(default)]
    pub io_error_policy: IoErrorPolicy,

    #[serde(default)]
    pub seed: SeedConfig,

    /// Option key -> default value, checked when an option is bound
    #[serde(default)]
    pub options: BTreeMap<String, Value>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeedConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub players: Option<PathBuf>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tournaments: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            database: default_database(),
            backend: BackendKind::default(),
            data_dir: default_data_dir(),
            persist: PersistPolicy::default(),
            persist_interval_secs: default_persist_interval_secs(),
            io_error_policy: IoErrorPolicy::default(),
            seed: SeedConfig::default(),
            options: BTreeMap::new(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl DbConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            BindingError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;

        if path.extension().and_then(|s| s.to_str()) == Some("toml") {
            toml::from_str(&contents)
                .map_err(|e| BindingError::Config(format!("TOML parse error: {}", e)))
        } else {
            // Default to YAML
            serde_yaml::from_str(&contents)
                .map_err(|e| BindingError::Config(format!("YAML parse error: {}", e)))
        }
    }

    /// Merge environment variables into config (env vars take precedence)
    pub fn merge_env(&mut self) -> Result<()> {
        if let Ok(val) = std::env::var("CHESSAHOOCHEE_DATABASE") {
            self.database = val;
        }

        if let Ok(val) = std::env::var("CHESSAHOOCHEE_BACKEND") {
            self.backend = match val.to_lowercase().as_str() {
                "memory" => BackendKind::Memory,
                "file" => BackendKind::File,
                _ => {
                    return Err(BindingError::Config(format!(
                        "Invalid CHESSAHOOCHEE_BACKEND '{}'. Use 'memory' or 'file'",
                        val
                    )));
                }
            };
        }

        if let Ok(val) = std::env::var("CHESSAHOOCHEE_DATA_DIR") {
            self.data_dir = PathBuf::from(val);
        }

        if let Ok(val) = std::env::var("CHESSAHOOCHEE_IO_ERROR_POLICY") {
            self.io_error_policy = val.parse()?;
        }

        if let Ok(val) = std::env::var("CHESSAHOOCHEE_LOG_LEVEL") {
            self.logging.level = val;
        }

        if let Ok(val) = std::env::var("CHESSAHOOCHEE_PLAYERS_SEED") {
            self.seed.players = Some(PathBuf::from(val));
        }

        if let Ok(val) = std::env::var("CHESSAHOOCHEE_TOURNAMENTS_SEED") {
            self.seed.tournaments = Some(PathBuf::from(val));
        }

        Ok(())
    }

    pub fn persist_mode(&self) -> PersistMode {
        match self.persist {
            PersistPolicy::WriteThrough => PersistMode::WriteThrough,
            PersistPolicy::Interval => {
                PersistMode::Interval(Duration::from_secs(self.persist_interval_secs.max(1)))
            }
        }
    }

    /// Build the storage backend this config describes
    pub fn build_backend(&self) -> Arc<dyn StoreBackend> {
        match self.backend {
            BackendKind::Memory => Arc::new(MemoryBackend::new()),
            BackendKind::File => Arc::new(FileBackend::new(&self.data_dir, self.persist_mode())),
        }
    }
}

fn default_database() -> String {
    "Chessahoochee".to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./chessahoochee-data")
}

fn default_persist_interval_secs() -> u64 {
    5
}

fn default_log_level() -> String {
    "info".to_string()
}
