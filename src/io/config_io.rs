use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::io::kv::atomic_write;
use crate::model::config::AppConfig;

/// Name of the config file inside the data directory
pub const CONFIG_FILE: &str = "config.toml";

/// Error type for configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("no data directory: pass -C <dir> or set HOME")]
    NoDataDir,
    #[error("could not read {path}: {source}")]
    ReadError { path: PathBuf, source: io::Error },
    #[error("could not write {path}: {source}")]
    WriteError { path: PathBuf, source: io::Error },
    #[error("could not parse {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("could not serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),
}

/// Pick the data directory: an explicit override, else `<platform data dir>/tasktree`.
pub fn resolve_data_dir(override_dir: Option<&Path>) -> Result<PathBuf, ConfigError> {
    match override_dir {
        Some(dir) => Ok(dir.to_path_buf()),
        None => dirs::data_dir()
            .map(|d| d.join("tasktree"))
            .ok_or(ConfigError::NoDataDir),
    }
}

/// Read config.toml from the data directory. A missing file yields defaults.
pub fn read_config(data_dir: &Path) -> Result<AppConfig, ConfigError> {
    let path = data_dir.join(CONFIG_FILE);
    let text = match fs::read_to_string(&path) {
        Ok(t) => t,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(AppConfig::default()),
        Err(e) => return Err(ConfigError::ReadError { path, source: e }),
    };
    toml::from_str(&text).map_err(|e| ConfigError::ParseError { path, source: e })
}

/// Render a config as TOML text
pub fn config_to_toml(config: &AppConfig) -> Result<String, ConfigError> {
    Ok(toml::to_string_pretty(config)?)
}

/// Write `config` to config.toml unless one already exists.
/// Returns true if a file was written.
pub fn write_config_if_missing(data_dir: &Path, config: &AppConfig) -> Result<bool, ConfigError> {
    let path = data_dir.join(CONFIG_FILE);
    if path.exists() {
        return Ok(false);
    }
    let text = config_to_toml(config)?;
    fs::create_dir_all(data_dir).map_err(|e| ConfigError::WriteError {
        path: path.clone(),
        source: e,
    })?;
    atomic_write(&path, text.as_bytes())
        .map_err(|e| ConfigError::WriteError { path, source: e })?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_gives_defaults() {
        let tmp = TempDir::new().unwrap();
        let config = read_config(tmp.path()).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.storage.key, "tasks");
        assert_eq!(config.storage.file, "storage.json");
        assert_eq!(config.alarm.beeps, 3);
        assert_eq!(config.alarm.gap_ms, 600);
        assert!(config.alarm.enabled);
        assert_eq!(config.log.level, "warn");
    }

    #[test]
    fn partial_file_fills_defaults() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(CONFIG_FILE),
            "[alarm]\nenabled = false\n\n[ui.colors]\nhighlight = \"#112233\"\n",
        )
        .unwrap();
        let config = read_config(tmp.path()).unwrap();
        assert!(!config.alarm.enabled);
        assert_eq!(config.alarm.beeps, 3);
        assert_eq!(config.storage.key, "tasks");
        assert_eq!(
            config.ui.colors.get("highlight").map(String::as_str),
            Some("#112233")
        );
    }

    #[test]
    fn malformed_file_is_an_error() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILE), "[alarm\nenabled = ").unwrap();
        assert!(matches!(
            read_config(tmp.path()),
            Err(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn written_defaults_read_back() {
        let tmp = TempDir::new().unwrap();
        assert!(write_config_if_missing(tmp.path(), &AppConfig::default()).unwrap());
        assert!(!write_config_if_missing(tmp.path(), &AppConfig::default()).unwrap());
        assert_eq!(read_config(tmp.path()).unwrap(), AppConfig::default());
    }

    #[test]
    fn override_dir_wins() {
        let dir = resolve_data_dir(Some(Path::new("/tmp/somewhere"))).unwrap();
        assert_eq!(dir, PathBuf::from("/tmp/somewhere"));
    }
}
