use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::io::kv::atomic_write;

const STATE_FILE: &str = ".state.json";

/// Persisted TUI state (written to .state.json in the data directory)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct UiState {
    /// Task under the cursor when the TUI last quit
    #[serde(default)]
    pub cursor: Option<String>,
    /// Ids of expanded tasks
    #[serde(default)]
    pub expanded: BTreeSet<String>,
    /// Last search text
    #[serde(default)]
    pub last_search: Option<String>,
    /// Search history (most recent first, capped at `MAX_HISTORY`)
    #[serde(default)]
    pub search_history: Vec<String>,
}

pub const MAX_HISTORY: usize = 50;

impl UiState {
    /// Record a search, moving it to the front of the history.
    pub fn push_search(&mut self, text: &str) {
        push_search(&mut self.search_history, text);
    }
}

/// Move `text` to the front of `history`, dropping blanks and duplicates.
pub fn push_search(history: &mut Vec<String>, text: &str) {
    let text = text.trim();
    if text.is_empty() {
        return;
    }
    history.retain(|s| s != text);
    history.insert(0, text.to_string());
    history.truncate(MAX_HISTORY);
}

/// Read .state.json. Missing or unreadable state is treated as absent.
pub fn read_ui_state(data_dir: &Path) -> Option<UiState> {
    let path = data_dir.join(STATE_FILE);
    let content = fs::read_to_string(&path).ok()?;
    match serde_json::from_str(&content) {
        Ok(state) => Some(state),
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "ignoring unreadable ui state");
            None
        }
    }
}

/// Write .state.json to the data directory
pub fn write_ui_state(data_dir: &Path, state: &UiState) -> Result<(), std::io::Error> {
    fs::create_dir_all(data_dir)?;
    let content = serde_json::to_string_pretty(state)?;
    atomic_write(&data_dir.join(STATE_FILE), content.as_bytes())
}
