use crossterm::event::{KeyCode, KeyEvent};

use crate::io::kv::KvStore;
use crate::ops::timer::{PRESETS, format_time};
use crate::tui::app::{App, EditTarget, Mode};

use super::navigate::begin_edit;

/// Rows in the preset popup: every preset plus a trailing "Custom…" entry
pub const PRESET_ROWS: usize = PRESETS.len() + 1;

pub(super) fn handle_presets<K: KvStore>(app: &mut App<K>, key: KeyEvent) {
    match key.code {
        KeyCode::Esc | KeyCode::Char('q') => app.mode = Mode::Navigate,
        KeyCode::Up | KeyCode::Char('k') => {
            app.preset_cursor = app.preset_cursor.saturating_sub(1);
        }
        KeyCode::Down | KeyCode::Char('j') => {
            app.preset_cursor = (app.preset_cursor + 1).min(PRESET_ROWS - 1);
        }
        KeyCode::Char(c @ '1'..='8') => {
            app.preset_cursor = (c as usize) - ('1' as usize);
            choose(app);
        }
        KeyCode::Char('c') => {
            app.preset_cursor = PRESET_ROWS - 1;
            choose(app);
        }
        KeyCode::Enter => choose(app),
        _ => {}
    }
}

fn choose<K: KvStore>(app: &mut App<K>) {
    app.mode = Mode::Navigate;
    let Some(id) = app.cursor_task_id() else {
        return;
    };

    match PRESETS.get(app.preset_cursor) {
        Some(&(label, secs)) => {
            let applied = app.store_mut().set_timer_duration(&id, secs);
            if app.report(applied) {
                app.set_message(format!("timer set to {}", label));
            }
        }
        None => {
            let current = app.store().find(&id).map_or(0, |t| t.timer_duration);
            begin_edit(app, EditTarget::Duration { task_id: id }, format_time(current));
        }
    }
}

pub(super) fn handle_confirm<K: KvStore>(app: &mut App<K>, key: KeyEvent) {
    let Some(id) = app.pending_delete.take() else {
        app.mode = Mode::Navigate;
        return;
    };
    app.mode = Mode::Navigate;
    if !matches!(key.code, KeyCode::Char('y') | KeyCode::Char('Y')) {
        return;
    }

    match app.store_mut().delete_task(&id) {
        Ok(Some(removed)) => {
            let n = removed.subtree_len();
            app.expanded.remove(&id);
            app.clamp_cursor();
            if n == 1 {
                app.set_message(format!("deleted \"{}\"", removed.title));
            } else {
                app.set_message(format!("deleted \"{}\" and {} subtasks", removed.title, n - 1));
            }
        }
        Ok(None) => app.set_error(format!("task {} no longer exists", id)),
        Err(e) => {
            tracing::error!(error = %e, "could not delete task");
            app.set_error(format!("error: {}", e));
        }
    }
}
