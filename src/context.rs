use std::path::{Path, PathBuf};

use crate::alarm;
use crate::io::config_io::{self, ConfigError};
use crate::io::kv::FileKv;
use crate::model::config::AppConfig;
use crate::store::{StoreError, TaskStore};

/// Resolved data directory plus the config read from it
#[derive(Debug, Clone)]
pub struct Context {
    pub data_dir: PathBuf,
    pub config: AppConfig,
}

impl Context {
    /// Resolve the data directory (`-C` override or the platform default)
    /// and read its config.toml.
    pub fn load(data_dir: Option<&Path>) -> Result<Self, ConfigError> {
        let data_dir = config_io::resolve_data_dir(data_dir)?;
        let config = config_io::read_config(&data_dir)?;
        Ok(Context { data_dir, config })
    }

    /// Path of the key-value storage file
    pub fn storage_path(&self) -> PathBuf {
        self.data_dir.join(&self.config.storage.file)
    }

    /// Open the task store backed by the storage file, with the configured alarm
    pub fn open_store(&self) -> Result<TaskStore<FileKv>, StoreError> {
        TaskStore::load(
            FileKv::new(self.storage_path()),
            self.config.storage.key.clone(),
            alarm::from_config(&self.config.alarm),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn storage_path_follows_config() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join("config.toml"),
            "[storage]\nfile = \"kv.json\"\nkey = \"tree\"\n",
        )
        .unwrap();
        let ctx = Context::load(Some(tmp.path())).unwrap();
        assert_eq!(ctx.storage_path(), tmp.path().join("kv.json"));

        let mut store = ctx.open_store().unwrap();
        store.create_task(None).unwrap();
        let text = fs::read_to_string(tmp.path().join("kv.json")).unwrap();
        assert!(text.contains("\"tree\""));
    }
}
