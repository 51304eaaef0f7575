use serde::{Deserialize, Serialize};

/// Configuration from config.toml in the data directory
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub alarm: AlarmConfig,
    #[serde(default)]
    pub ui: UiConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Key-value file, relative to the data directory
    #[serde(default = "default_storage_file")]
    pub file: String,
    /// Entry holding the serialized task tree
    #[serde(default = "default_storage_key")]
    pub key: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            file: default_storage_file(),
            key: default_storage_key(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Number of beeps per expiry
    #[serde(default = "default_beeps")]
    pub beeps: u32,
    /// Pause between beeps, in milliseconds
    #[serde(default = "default_gap_ms")]
    pub gap_ms: u64,
}

impl Default for AlarmConfig {
    fn default() -> Self {
        AlarmConfig {
            enabled: true,
            beeps: default_beeps(),
            gap_ms: default_gap_ms(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiConfig {
    #[serde(default = "default_true")]
    pub show_key_hints: bool,
    /// Color overrides keyed by theme slot, e.g. `highlight = "#FB4196"`
    #[serde(default)]
    pub colors: std::collections::BTreeMap<String, String>,
}

impl Default for UiConfig {
    fn default() -> Self {
        UiConfig {
            show_key_hints: true,
            colors: Default::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    /// Default filter directive when TASKTREE_LOG is unset
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            level: default_log_level(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_storage_file() -> String {
    "storage.json".to_string()
}

fn default_storage_key() -> String {
    "tasks".to_string()
}

fn default_beeps() -> u32 {
    3
}

fn default_gap_ms() -> u64 {
    600
}

fn default_log_level() -> String {
    "warn".to_string()
}
