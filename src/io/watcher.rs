use std::path::{Path, PathBuf};
use std::sync::mpsc;

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

/// Events sent from the storage watcher to the TUI event loop.
#[derive(Debug, PartialEq, Eq)]
pub enum StorageEvent {
    /// The storage file was written by someone.
    Changed,
}

/// Watches the data directory for writes to the storage file.
///
/// Our own writes trigger events too; the caller compares the reloaded tree
/// with what it holds and only redraws on a real difference.
pub struct StorageWatcher {
    _watcher: RecommendedWatcher,
    rx: mpsc::Receiver<StorageEvent>,
}

impl StorageWatcher {
    /// Start watching `storage_path`. Its parent directory must exist.
    /// Call `poll()` each loop iteration.
    pub fn start(storage_path: &Path) -> Result<Self, notify::Error> {
        let (tx, rx) = mpsc::channel();
        let dir = storage_path
            .parent()
            .unwrap_or(Path::new("."))
            .to_path_buf();
        let target = storage_path.to_path_buf();

        let mut watcher = RecommendedWatcher::new(
            move |result: Result<Event, notify::Error>| {
                let event = match result {
                    Ok(e) => e,
                    Err(e) => {
                        tracing::debug!(error = %e, "watcher error");
                        return;
                    }
                };
                if !is_write_kind(&event.kind) {
                    return;
                }
                if event.paths.iter().any(|p| is_storage_path(p, &target)) {
                    let _ = tx.send(StorageEvent::Changed);
                }
            },
            Config::default(),
        )?;

        // Non-recursive: the storage file sits directly in the data dir, and
        // atomic writes replace it via rename within that directory.
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;
        Ok(StorageWatcher {
            _watcher: watcher,
            rx,
        })
    }

    /// Drain pending events. Returns true if the storage file changed at
    /// least once since the last poll.
    pub fn poll(&self) -> bool {
        let mut changed = false;
        while let Ok(StorageEvent::Changed) = self.rx.try_recv() {
            changed = true;
        }
        changed
    }
}

fn is_write_kind(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    )
}

/// Matches the storage file itself, ignoring the lock file and temp files.
fn is_storage_path(path: &Path, target: &Path) -> bool {
    if path == target {
        return true;
    }
    // Some backends report a canonicalized path
    match (path.file_name(), target.file_name()) {
        (Some(a), Some(b)) if a == b => match (path.parent(), target.parent()) {
            (Some(pa), Some(pb)) => canonical(pa) == canonical(pb),
            _ => false,
        },
        _ => false,
    }
}

fn canonical(p: &Path) -> PathBuf {
    p.canonicalize().unwrap_or_else(|_| p.to_path_buf())
}
