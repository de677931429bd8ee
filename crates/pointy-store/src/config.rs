//! # Store Configuration
//!
//! ## Configuration Sources
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                        │
//! │                                                                  │
//! │  1. Environment Variables (highest priority)                     │
//! │     POINTY_BACKEND=memory|file                                   │
//! │     POINTY_DATA_DIR=/path/to/data                                │
//! │                                                                  │
//! │  2. TOML Config File                                             │
//! │     ~/.config/pointypos/store.toml (Linux)                       │
//! │     ~/Library/Application Support/com.pointy.pos/store.toml      │
//! │                                                                  │
//! │  3. Default Values (lowest priority)                             │
//! │     Backend::File, platform data dir, pointy.json                │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # store.toml
//! backend = "file"          # file | memory
//! data_dir = "/var/pointy"  # optional, platform data dir by default
//! file_name = "pointy.json"
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{StoreError, StoreResult};

// =============================================================================
// Backend Selection
// =============================================================================

/// Which local backend to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    /// Persist the document tree to a JSON file.
    #[default]
    File,
    /// Keep everything in memory (tests, demos).
    Memory,
}

impl std::str::FromStr for Backend {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "file" => Ok(Backend::File),
            "memory" | "mem" => Ok(Backend::Memory),
            other => Err(StoreError::Config(format!(
                "Unknown backend: '{other}'. Valid options: file, memory"
            ))),
        }
    }
}

// =============================================================================
// Store Configuration
// =============================================================================

/// Complete store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: Backend,

    /// Directory holding the data file. Platform data dir when unset.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    #[serde(default = "default_file_name")]
    pub file_name: String,
}

fn default_file_name() -> String {
    "pointy.json".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            backend: Backend::default(),
            data_dir: None,
            file_name: default_file_name(),
        }
    }
}

impl StoreConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (store.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> StoreResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading store config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)
                    .map_err(|e| StoreError::Config(e.to_string()))?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Loads config or returns defaults if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load store config: {e}. Using defaults.");
            Self::default()
        })
    }

    pub fn validate(&self) -> StoreResult<()> {
        if self.file_name.is_empty() {
            return Err(StoreError::Config("file_name must not be empty".into()));
        }
        if self.file_name.contains('/') {
            return Err(StoreError::Config(
                "file_name must be a bare name, not a path".into(),
            ));
        }
        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(backend) = std::env::var("POINTY_BACKEND") {
            match backend.parse() {
                Ok(parsed) => {
                    debug!(backend = %backend, "Overriding backend from environment");
                    self.backend = parsed;
                }
                Err(e) => warn!("Ignoring POINTY_BACKEND: {e}"),
            }
        }
        if let Ok(dir) = std::env::var("POINTY_DATA_DIR") {
            debug!(dir = %dir, "Overriding data dir from environment");
            self.data_dir = Some(PathBuf::from(dir));
        }
    }

    /// Full path of the data file for the file backend.
    pub fn data_path(&self) -> StoreResult<PathBuf> {
        let dir = match &self.data_dir {
            Some(dir) => dir.clone(),
            None => directories::ProjectDirs::from("com", "pointy", "pos")
                .map(|dirs| dirs.data_dir().to_path_buf())
                .ok_or_else(|| {
                    StoreError::Config("No platform data directory available".into())
                })?,
        };
        Ok(dir.join(&self.file_name))
    }

    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "pointy", "pos")
            .map(|dirs| dirs.config_dir().join("store.toml"))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
