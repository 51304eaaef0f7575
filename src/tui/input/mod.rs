mod edit;
mod navigate;
mod popups;
mod search;

use crossterm::event::{KeyCode, KeyEvent};

use crate::io::kv::KvStore;

use super::app::{App, Mode};

use edit::handle_edit;
use navigate::handle_navigate;
use popups::{handle_confirm, handle_presets};
use search::handle_search;

/// Handle a key event in the current mode
pub fn handle_key<K: KvStore>(app: &mut App<K>, key: KeyEvent) {
    // Ignore bare modifier key presses (Shift, Ctrl, Alt, etc.)
    if matches!(key.code, KeyCode::Modifier(_)) {
        return;
    }
    app.message = None;

    // Help overlay swallows one key
    if app.show_help {
        app.show_help = false;
        return;
    }

    match app.mode {
        Mode::Navigate => handle_navigate(app, key),
        Mode::Search => handle_search(app, key),
        Mode::Edit => handle_edit(app, key),
        Mode::Presets => handle_presets(app, key),
        Mode::Confirm => handle_confirm(app, key),
    }
}
