use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::io::kv::KvStore;
use crate::io::state::push_search;
use crate::tui::app::{App, Mode};

pub(super) fn handle_search<K: KvStore>(app: &mut App<K>, key: KeyEvent) {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        if key.code == KeyCode::Char('u') {
            set_query(app, String::new());
        }
        return;
    }

    match key.code {
        KeyCode::Esc => {
            set_query(app, String::new());
            app.search_history_idx = None;
            app.mode = Mode::Navigate;
        }
        KeyCode::Enter => {
            push_search(&mut app.search_history, &app.search_input);
            app.search_history_idx = None;
            app.mode = Mode::Navigate;
        }
        KeyCode::Backspace => {
            let mut query = app.search_input.clone();
            query.pop();
            set_query(app, query);
        }
        KeyCode::Up => browse_history(app, 1),
        KeyCode::Down => browse_history(app, -1),
        KeyCode::Char(c) => {
            let mut query = app.search_input.clone();
            query.push(c);
            set_query(app, query);
        }
        _ => {}
    }
}

/// Replace the query; the filtered list restarts at the top.
fn set_query<K: KvStore>(app: &mut App<K>, query: String) {
    app.search_input = query;
    app.cursor = 0;
    app.scroll_offset = 0;
}

/// Step through history, newest first. `delta` 1 goes older, -1 newer.
fn browse_history<K: KvStore>(app: &mut App<K>, delta: isize) {
    let len = app.search_history.len();
    if len == 0 {
        return;
    }
    let next = match (app.search_history_idx, delta) {
        (None, d) if d > 0 => Some(0),
        (None, _) => None,
        (Some(i), d) if d > 0 => Some((i + 1).min(len - 1)),
        (Some(0), _) => None,
        (Some(i), _) => Some(i - 1),
    };
    app.search_history_idx = next;
    let query = match next {
        Some(i) => app.search_history[i].clone(),
        None => String::new(),
    };
    set_query(app, query);
}
