use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::io::kv::KvStore;
use crate::model::task::{TaskId, TaskStatus};
use crate::ops::timer::format_time;
use crate::tui::app::{App, EditTarget, Mode};

pub(super) fn handle_navigate<K: KvStore>(app: &mut App<K>, key: KeyEvent) {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        if key.code == KeyCode::Char('c') {
            app.should_quit = true;
        }
        return;
    }

    match key.code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Char('?') => app.show_help = true,

        // Movement
        KeyCode::Up | KeyCode::Char('k') => move_cursor(app, -1),
        KeyCode::Down | KeyCode::Char('j') => move_cursor(app, 1),
        KeyCode::Home | KeyCode::Char('g') => app.cursor = 0,
        KeyCode::End | KeyCode::Char('G') => {
            app.cursor = app.build_flat_items().len().saturating_sub(1);
        }
        KeyCode::Right | KeyCode::Char('l') => expand_or_descend(app),
        KeyCode::Left | KeyCode::Char('h') => collapse_or_ascend(app),
        KeyCode::Enter => toggle_expand(app),

        // Timer
        KeyCode::Char(' ') | KeyCode::Char('t') => with_cursor_task(app, |app, id| {
            let applied = app.store_mut().toggle_timer(&id);
            app.report(applied);
        }),
        KeyCode::Char('r') => with_cursor_task(app, |app, id| {
            let applied = app.store_mut().reset_timer(&id);
            app.report(applied);
        }),
        KeyCode::Char('d') => with_cursor_task(app, |app, _| {
            app.preset_cursor = 0;
            app.mode = Mode::Presets;
        }),

        // Status
        KeyCode::Char('s') => with_cursor_task(app, |app, id| {
            let next = app
                .store()
                .find(&id)
                .map_or(TaskStatus::NotStarted, |t| t.status.next());
            set_status(app, &id, next);
        }),
        KeyCode::Char(c @ '1'..='4') => with_cursor_task(app, |app, id| {
            let idx = (c as usize) - ('1' as usize);
            set_status(app, &id, TaskStatus::ALL[idx]);
        }),

        // Structure
        KeyCode::Char('n') => create(app, None),
        KeyCode::Char('a') => {
            if let Some(parent) = app.cursor_task_id() {
                create(app, Some(parent));
            }
        }
        KeyCode::Char('x') | KeyCode::Delete => with_cursor_task(app, |app, id| {
            app.pending_delete = Some(id);
            app.mode = Mode::Confirm;
        }),

        // Editing
        KeyCode::Char('e') => with_cursor_task(app, |app, id| {
            let title = app.store().find(&id).map(|t| t.title.clone());
            begin_edit(
                app,
                EditTarget::Title {
                    task_id: id,
                    is_new: false,
                },
                title.unwrap_or_default(),
            );
        }),
        KeyCode::Char('E') | KeyCode::Char('i') => with_cursor_task(app, |app, id| {
            let desc = app.store().find(&id).map(|t| t.description.clone());
            begin_edit(app, EditTarget::Description { task_id: id }, desc.unwrap_or_default());
        }),
        KeyCode::Char('u') => with_cursor_task(app, |app, id| {
            let due = app.store().find(&id).map(|t| t.due_date.clone());
            begin_edit(app, EditTarget::Due { task_id: id }, due.unwrap_or_default());
        }),
        KeyCode::Char('T') => with_cursor_task(app, |app, id| {
            let secs = app.store().find(&id).map_or(0, |t| t.timer_duration);
            begin_edit(app, EditTarget::Duration { task_id: id }, format_time(secs));
        }),

        // Search
        KeyCode::Char('/') => {
            app.search_history_idx = None;
            app.mode = Mode::Search;
        }
        KeyCode::Esc => {
            if !app.search_input.is_empty() {
                let keep = app.cursor_task_id();
                app.search_input.clear();
                if let Some(id) = keep {
                    app.select_task(&id);
                }
            }
        }
        _ => {}
    }
}

fn move_cursor<K: KvStore>(app: &mut App<K>, delta: isize) {
    let len = app.build_flat_items().len();
    if len == 0 {
        app.cursor = 0;
        return;
    }
    let cur = app.cursor.min(len - 1);
    app.cursor = cur.saturating_add_signed(delta).min(len - 1);
}

fn expand_or_descend<K: KvStore>(app: &mut App<K>) {
    let Some(item) = app.cursor_item() else {
        return;
    };
    if !item.has_children {
        return;
    }
    if item.is_expanded {
        move_cursor(app, 1);
    } else {
        app.expanded.insert(item.id);
    }
}

fn collapse_or_ascend<K: KvStore>(app: &mut App<K>) {
    let Some(item) = app.cursor_item() else {
        return;
    };
    if item.is_expanded && app.search_query().is_none() {
        app.expanded.remove(&item.id);
        return;
    }
    if item.depth == 0 {
        return;
    }
    let items = app.build_flat_items();
    let parent_path = &item.path[..item.path.len() - 1];
    if let Some(pos) = items.iter().position(|i| i.path == parent_path) {
        app.cursor = pos;
    }
}

fn toggle_expand<K: KvStore>(app: &mut App<K>) {
    let Some(item) = app.cursor_item() else {
        return;
    };
    if !item.has_children {
        return;
    }
    if !app.expanded.remove(&item.id) {
        app.expanded.insert(item.id);
    }
}

/// Run `f` with the id under the cursor; no-op on an empty list
fn with_cursor_task<K: KvStore>(app: &mut App<K>, f: impl FnOnce(&mut App<K>, TaskId)) {
    if let Some(id) = app.cursor_task_id() {
        f(app, id);
    }
}

fn set_status<K: KvStore>(app: &mut App<K>, id: &TaskId, status: TaskStatus) {
    let applied = app.store_mut().change_status(id, status);
    if app.report(applied) {
        app.set_message(format!("status: {}", status.label()));
    }
}

/// Create a task (root or child of `parent`) and start editing its title
fn create<K: KvStore>(app: &mut App<K>, parent: Option<TaskId>) {
    let created = match app.store_mut().create_task(parent.as_ref()) {
        Ok(Some(task)) => task,
        Ok(None) => return,
        Err(e) => {
            tracing::error!(error = %e, "could not create task");
            app.set_error(format!("error: {}", e));
            return;
        }
    };
    // A default-titled task would be hidden by most filters
    app.search_input.clear();
    if let Some(pid) = parent {
        app.expanded.insert(pid);
    }
    app.select_task(&created.id);
    begin_edit(
        app,
        EditTarget::Title {
            task_id: created.id,
            is_new: true,
        },
        String::new(),
    );
}

pub(super) fn begin_edit<K: KvStore>(app: &mut App<K>, target: EditTarget, initial: String) {
    app.edit_cursor = initial.len();
    app.edit_buffer = initial;
    app.edit_target = Some(target);
    app.mode = Mode::Edit;
}
