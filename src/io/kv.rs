use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use tempfile::NamedTempFile;

use crate::io::lock::{FileLock, LockError};

/// Error type for key-value persistence
#[derive(Debug, thiserror::Error)]
pub enum KvError {
    #[error("could not read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("could not write {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
    #[error("{path} is not a key-value object: {source}")]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error(transparent)]
    Lock(#[from] LockError),
}

/// String-keyed, string-valued persistence in the shape of browser local storage.
/// Every `set` replaces the stored value wholesale.
pub trait KvStore {
    fn get(&self, key: &str) -> Result<Option<String>, KvError>;
    fn set(&mut self, key: &str, value: String) -> Result<(), KvError>;
    fn remove(&mut self, key: &str) -> Result<(), KvError>;
}

// ---------------------------------------------------------------------------
// In-memory
// ---------------------------------------------------------------------------

/// A `KvStore` that lives only as long as the process
#[derive(Debug, Clone, Default)]
pub struct MemoryKv {
    entries: IndexMap<String, String>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(key: &str, value: impl Into<String>) -> Self {
        let mut entries = IndexMap::new();
        entries.insert(key.to_string(), value.into());
        MemoryKv { entries }
    }
}

impl KvStore for MemoryKv {
    fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), KvError> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), KvError> {
        self.entries.shift_remove(key);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// File-backed
// ---------------------------------------------------------------------------

/// A JSON object file of string entries.
///
/// Reads go to disk every time so that writes from other processes are seen.
/// Writes take the advisory lock in the file's directory, re-read the current
/// entries, replace one key, and swap the file in atomically.
#[derive(Debug, Clone)]
pub struct FileKv {
    path: PathBuf,
}

impl FileKv {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileKv { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn dir(&self) -> &Path {
        self.path.parent().unwrap_or(Path::new("."))
    }

    fn read_entries(&self) -> Result<IndexMap<String, String>, KvError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(t) => t,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(IndexMap::new()),
            Err(e) => {
                return Err(KvError::Read {
                    path: self.path.clone(),
                    source: e,
                });
            }
        };
        if text.trim().is_empty() {
            return Ok(IndexMap::new());
        }
        serde_json::from_str(&text).map_err(|e| KvError::Corrupt {
            path: self.path.clone(),
            source: e,
        })
    }

    /// Entries to build the next write on. A corrupt file is replaced rather
    /// than blocking every future write.
    fn entries_for_write(&self) -> Result<IndexMap<String, String>, KvError> {
        match self.read_entries() {
            Err(KvError::Corrupt { path, source }) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %source,
                    "overwriting corrupt storage file"
                );
                Ok(IndexMap::new())
            }
            other => other,
        }
    }

    fn write_entries(&self, entries: &IndexMap<String, String>) -> Result<(), KvError> {
        let write_err = |e: io::Error| KvError::Write {
            path: self.path.clone(),
            source: e,
        };
        let content = serde_json::to_string_pretty(entries)
            .map_err(|e| write_err(io::Error::other(e)))?;
        atomic_write(&self.path, content.as_bytes()).map_err(write_err)
    }

    fn modify(&mut self, f: impl FnOnce(&mut IndexMap<String, String>)) -> Result<(), KvError> {
        fs::create_dir_all(self.dir()).map_err(|e| KvError::Write {
            path: self.path.clone(),
            source: e,
        })?;
        let _lock = FileLock::acquire_default(self.dir())?;
        let mut entries = self.entries_for_write()?;
        f(&mut entries);
        self.write_entries(&entries)
    }
}

impl KvStore for FileKv {
    fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        Ok(self.read_entries()?.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), KvError> {
        self.modify(|entries| {
            entries.insert(key.to_string(), value);
        })
    }

    fn remove(&mut self, key: &str) -> Result<(), KvError> {
        self.modify(|entries| {
            entries.shift_remove(key);
        })
    }
}

/// Write `content` to `path` atomically using a temp file + rename.
pub fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    let dir = path.parent().unwrap_or(Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
