use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::io::kv::KvStore;
use crate::model::task::{TaskId, TaskPatch};
use crate::ops::timer::{format_time, parse_timer_input};
use crate::tui::app::{App, EditTarget, Mode};
use crate::util::dates::normalize_due;
use crate::util::unicode::{next_grapheme_boundary, prev_grapheme_boundary};

pub(super) fn handle_edit<K: KvStore>(app: &mut App<K>, key: KeyEvent) {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        if key.code == KeyCode::Char('u') {
            app.edit_buffer.clear();
            app.edit_cursor = 0;
        }
        return;
    }

    match key.code {
        KeyCode::Esc => cancel(app),
        KeyCode::Enter => commit(app),
        KeyCode::Char(c) => {
            app.edit_buffer.insert(app.edit_cursor, c);
            app.edit_cursor += c.len_utf8();
        }
        KeyCode::Backspace => {
            if let Some(prev) = prev_grapheme_boundary(&app.edit_buffer, app.edit_cursor) {
                app.edit_buffer.replace_range(prev..app.edit_cursor, "");
                app.edit_cursor = prev;
            }
        }
        KeyCode::Delete => {
            if let Some(next) = next_grapheme_boundary(&app.edit_buffer, app.edit_cursor) {
                app.edit_buffer.replace_range(app.edit_cursor..next, "");
            }
        }
        KeyCode::Left => {
            if let Some(prev) = prev_grapheme_boundary(&app.edit_buffer, app.edit_cursor) {
                app.edit_cursor = prev;
            }
        }
        KeyCode::Right => {
            if let Some(next) = next_grapheme_boundary(&app.edit_buffer, app.edit_cursor) {
                app.edit_cursor = next;
            }
        }
        KeyCode::Home => app.edit_cursor = 0,
        KeyCode::End => app.edit_cursor = app.edit_buffer.len(),
        _ => {}
    }
}

fn finish<K: KvStore>(app: &mut App<K>) {
    app.edit_target = None;
    app.edit_buffer.clear();
    app.edit_cursor = 0;
    app.mode = Mode::Navigate;
}

fn cancel<K: KvStore>(app: &mut App<K>) {
    if let Some(EditTarget::Title { is_new: true, .. }) = app.edit_target {
        app.set_message("created with the default title");
    }
    finish(app);
}

fn commit<K: KvStore>(app: &mut App<K>) {
    let Some(target) = app.edit_target.clone() else {
        finish(app);
        return;
    };
    let input = app.edit_buffer.trim().to_string();

    match target {
        EditTarget::Title { task_id, .. } => {
            // A blank title keeps whatever the task had
            if !input.is_empty() {
                let patch = TaskPatch {
                    title: Some(input),
                    ..Default::default()
                };
                apply_patch(app, &task_id, &patch);
            }
        }
        EditTarget::Description { task_id } => {
            let patch = TaskPatch {
                description: Some(app.edit_buffer.clone()),
                ..Default::default()
            };
            apply_patch(app, &task_id, &patch);
        }
        EditTarget::Due { task_id } => {
            let Some(due) = normalize_due(&input) else {
                app.set_error(format!("invalid date '{}': try today, in 3d or YYYY-MM-DD", input));
                return;
            };
            let patch = TaskPatch {
                due_date: Some(due),
                ..Default::default()
            };
            apply_patch(app, &task_id, &patch);
        }
        EditTarget::Duration { task_id } => match parse_timer_input(&input) {
            Ok(secs) => {
                let applied = app.store_mut().set_timer_duration(&task_id, secs);
                if app.report(applied) {
                    app.set_message(format!("timer set to {}", format_time(secs)));
                }
            }
            Err(e) => {
                app.set_error(e.to_string());
                return;
            }
        },
    }
    finish(app);
}

fn apply_patch<K: KvStore>(app: &mut App<K>, id: &TaskId, patch: &TaskPatch) {
    let applied = app.store_mut().update_task(id, patch);
    if !app.report(applied) && app.message.is_none() {
        app.set_error(format!("task {} no longer exists", id));
    }
}
