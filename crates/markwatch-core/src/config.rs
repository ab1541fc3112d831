//! Configuration module for Markwatch.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, validation, defaults, and a builder pattern for programmatic use.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::storage::DEFAULT_SYNC_INTERVAL_MINUTES;

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for Markwatch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub sync: SyncConfig,
    pub history: HistoryConfig,
    pub storage: StorageConfig,
    pub provider: ProviderConfig,
    pub logging: LoggingConfig,
}

/// Refresh scheduling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Minutes between periodic refreshes when none is stored yet (`0` disables).
    pub interval_minutes: u32,
    /// Milliseconds of quiet after a tree mutation before refreshing.
    pub debounce_ms: u64,
}

/// Change history settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Maximum number of change records retained, newest first.
    pub max_entries: usize,
}

/// Persistence locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite database backing the structured store.
    pub database_path: PathBuf,
    /// Directory of JSON documents backing the key-value store.
    pub kv_dir: PathBuf,
}

/// Bookmark source settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Chromium-format `Bookmarks` file to read and watch.
    pub bookmarks_file: PathBuf,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
}

// ---------------------------------------------------------------------------
// Config::load()
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/markwatch/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("markwatch")
            .join("config.yaml")
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

fn data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("~/.local/share"))
        .join("markwatch")
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval_minutes: DEFAULT_SYNC_INTERVAL_MINUTES,
            debounce_ms: 500,
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { max_entries: 100 }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let data_dir = data_dir();
        Self {
            database_path: data_dir.join("markwatch.db"),
            kv_dir: data_dir.join("kv"),
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            bookmarks_file: dirs::config_dir()
                .unwrap_or_else(|| PathBuf::from("~/.config"))
                .join("chromium")
                .join("Default")
                .join("Bookmarks"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config::validate()
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"history.max_entries"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- sync ---
        if self.sync.debounce_ms == 0 {
            errors.push(ValidationError {
                field: "sync.debounce_ms".into(),
                message: "must be greater than 0".into(),
            });
        }

        // --- history ---
        if self.history.max_entries == 0 {
            errors.push(ValidationError {
                field: "history.max_entries".into(),
                message: "must be greater than 0".into(),
            });
        }

        // --- storage ---
        if self.storage.database_path.as_os_str().is_empty() {
            errors.push(ValidationError {
                field: "storage.database_path".into(),
                message: "must not be empty".into(),
            });
        }
        if self.storage.kv_dir.as_os_str().is_empty() {
            errors.push(ValidationError {
                field: "storage.kv_dir".into(),
                message: "must not be empty".into(),
            });
        }

        // --- provider ---
        if self.provider.bookmarks_file.as_os_str().is_empty() {
            errors.push(ValidationError {
                field: "provider.bookmarks_file".into(),
                message: "must not be empty".into(),
            });
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "invalid level '{}'; valid options: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Builder for constructing a [`Config`] programmatically.
///
/// Starts from [`Config::default`] and allows selective overrides.
///
/// # Example
///
/// ```rust,no_run
/// use markwatch_core::config::ConfigBuilder;
/// use std::path::PathBuf;
///
/// let config = ConfigBuilder::new()
///     .sync_interval_minutes(15)
///     .history_max_entries(50)
///     .provider_bookmarks_file(PathBuf::from("/tmp/Bookmarks"))
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder pre-populated with default values.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    // --- sync ---

    pub fn sync_interval_minutes(mut self, minutes: u32) -> Self {
        self.config.sync.interval_minutes = minutes;
        self
    }

    pub fn sync_debounce_ms(mut self, ms: u64) -> Self {
        self.config.sync.debounce_ms = ms;
        self
    }

    // --- history ---

    pub fn history_max_entries(mut self, n: usize) -> Self {
        self.config.history.max_entries = n;
        self
    }

    // --- storage ---

    pub fn storage_database_path(mut self, path: PathBuf) -> Self {
        self.config.storage.database_path = path;
        self
    }

    pub fn storage_kv_dir(mut self, dir: PathBuf) -> Self {
        self.config.storage.kv_dir = dir;
        self
    }

    // --- provider ---

    pub fn provider_bookmarks_file(mut self, file: PathBuf) -> Self {
        self.config.provider.bookmarks_file = file;
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    // --- build ---

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }

    /// Build and validate in one step. Returns `Err` with the list of
    /// validation errors if the configuration is invalid.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
