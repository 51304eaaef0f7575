use std::borrow::Cow;
use std::collections::HashSet;
use std::io;
use std::path::Path;
use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;

use crate::context::Context;
use crate::io::kv::{FileKv, KvStore};
use crate::io::state::{UiState, read_ui_state, write_ui_state};
use crate::io::watcher::StorageWatcher;
use crate::model::config::UiConfig;
use crate::model::task::{Task, TaskId};
use crate::ops::filter::{SearchQuery, filter_tasks};
use crate::ops::tree;
use crate::scheduler::Scheduler;
use crate::store::{StoreError, TaskStore};

use super::input;
use super::render;
use super::theme::Theme;

/// Longest the event loop waits for input before re-checking timers and the
/// storage watcher
const MAX_POLL: Duration = Duration::from_millis(250);

/// Current interaction mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Navigate,
    /// Typing in the search box; the tree filters live
    Search,
    /// Single-line editor in the status row
    Edit,
    /// Duration preset popup
    Presets,
    /// Waiting for y/n on a delete
    Confirm,
}

/// What the edit buffer will be written to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditTarget {
    /// `is_new`: the task was just created; cancelling keeps the default title
    Title { task_id: TaskId, is_new: bool },
    Description { task_id: TaskId },
    Due { task_id: TaskId },
    /// Custom timer length
    Duration { task_id: TaskId },
}

impl EditTarget {
    pub fn task_id(&self) -> &TaskId {
        match self {
            EditTarget::Title { task_id, .. }
            | EditTarget::Description { task_id }
            | EditTarget::Due { task_id }
            | EditTarget::Duration { task_id } => task_id,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            EditTarget::Title { .. } => "title",
            EditTarget::Description { .. } => "description",
            EditTarget::Due { .. } => "due",
            EditTarget::Duration { .. } => "timer (h:m:s)",
        }
    }
}

/// One-line feedback shown in the status row until the next key press
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub text: String,
    pub is_error: bool,
}

/// A row of the tree view
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatItem {
    pub id: TaskId,
    /// Indices at each nesting level into the visible tree
    pub path: Vec<usize>,
    pub depth: usize,
    pub has_children: bool,
    pub is_expanded: bool,
    pub is_last_sibling: bool,
    /// For tree continuation lines: whether each ancestor is the last sibling
    pub ancestor_last: Vec<bool>,
}

/// Main application state
pub struct App<K: KvStore = FileKv> {
    pub scheduler: Scheduler<K>,
    pub mode: Mode,
    pub should_quit: bool,
    pub theme: Theme,
    pub show_key_hints: bool,
    pub show_help: bool,
    /// Cursor index into the flat visible items list
    pub cursor: usize,
    /// Scroll offset (first visible row)
    pub scroll_offset: usize,
    /// Expanded task IDs (ignored while a search is active: matches show fully)
    pub expanded: HashSet<TaskId>,
    /// Search box contents; non-blank filters the tree
    pub search_input: String,
    pub search_history: Vec<String>,
    /// Position while browsing history with Up/Down in search mode
    pub search_history_idx: Option<usize>,
    pub edit_target: Option<EditTarget>,
    pub edit_buffer: String,
    /// Byte offset into `edit_buffer`
    pub edit_cursor: usize,
    /// Highlighted row of the preset popup
    pub preset_cursor: usize,
    pub pending_delete: Option<TaskId>,
    pub message: Option<Message>,
}

impl<K: KvStore> App<K> {
    pub fn new(scheduler: Scheduler<K>, ui: &UiConfig) -> Self {
        App {
            scheduler,
            mode: Mode::Navigate,
            should_quit: false,
            theme: Theme::from_config(ui),
            show_key_hints: ui.show_key_hints,
            show_help: false,
            cursor: 0,
            scroll_offset: 0,
            expanded: HashSet::new(),
            search_input: String::new(),
            search_history: Vec::new(),
            search_history_idx: None,
            edit_target: None,
            edit_buffer: String::new(),
            edit_cursor: 0,
            preset_cursor: 0,
            pending_delete: None,
            message: None,
        }
    }

    pub fn store(&self) -> &TaskStore<K> {
        self.scheduler.store()
    }

    pub fn store_mut(&mut self) -> &mut TaskStore<K> {
        self.scheduler.store_mut()
    }

    /// Active search, if the box holds anything but whitespace
    pub fn search_query(&self) -> Option<SearchQuery> {
        SearchQuery::new(&self.search_input)
    }

    /// The tree as displayed: the whole tree, or the pruned search result
    pub fn visible_tasks(&self) -> Cow<'_, [Task]> {
        filter_tasks(self.store().tasks(), &self.search_input)
    }

    /// Build the flat list of visible rows
    pub fn build_flat_items(&self) -> Vec<FlatItem> {
        let visible = self.visible_tasks();
        let expand_all = self.search_query().is_some();
        let mut items = Vec::new();
        flatten_tasks(&visible, &self.expanded, expand_all, 0, &[], &[], &mut items);
        items
    }

    pub fn cursor_item(&self) -> Option<FlatItem> {
        let items = self.build_flat_items();
        let idx = self.cursor.min(items.len().saturating_sub(1));
        items.into_iter().nth(idx)
    }

    pub fn cursor_task_id(&self) -> Option<TaskId> {
        self.cursor_item().map(|item| item.id)
    }

    /// The task under the cursor, from the full tree
    pub fn cursor_task(&self) -> Option<&Task> {
        let id = self.cursor_task_id()?;
        self.store().find(&id)
    }

    /// Keep the cursor inside the list
    pub fn clamp_cursor(&mut self) {
        let len = self.build_flat_items().len();
        self.cursor = self.cursor.min(len.saturating_sub(1));
    }

    /// Move the cursor onto `id`, expanding its ancestors so it is visible.
    /// Returns false if the task is not in the visible tree.
    pub fn select_task(&mut self, id: &TaskId) -> bool {
        if let Some(ancestors) = tree::ancestors_of(self.store().tasks(), id) {
            self.expanded.extend(ancestors);
        }
        match self.build_flat_items().iter().position(|item| &item.id == id) {
            Some(pos) => {
                self.cursor = pos;
                true
            }
            None => false,
        }
    }

    pub fn set_message(&mut self, text: impl Into<String>) {
        self.message = Some(Message {
            text: text.into(),
            is_error: false,
        });
    }

    pub fn set_error(&mut self, text: impl Into<String>) {
        self.message = Some(Message {
            text: text.into(),
            is_error: true,
        });
    }

    /// Surface a store failure in the status row; the UI keeps running.
    pub fn report(&mut self, result: Result<bool, StoreError>) -> bool {
        match result {
            Ok(applied) => applied,
            Err(e) => {
                tracing::error!(error = %e, "store operation failed");
                self.set_error(format!("error: {}", e));
                false
            }
        }
    }

    /// Run due timer ticks. A tree written by another process since the
    /// last tick is adopted first.
    pub fn on_tick(&mut self, now: Instant) {
        let keep = self.cursor_task_id();
        match self.scheduler.run_due(now) {
            Ok(report) => {
                if report.reloaded {
                    self.follow_task(keep);
                    self.set_message("reloaded changes from disk");
                }
                let titles: Vec<String> = report
                    .outcome
                    .expired
                    .iter()
                    .filter_map(|id| self.store().find(id))
                    .map(|t| t.title.clone())
                    .collect();
                if !titles.is_empty() {
                    self.set_message(format!("timer finished: {}", titles.join(", ")));
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "could not persist timer tick");
                self.set_error(format!("error: {}", e));
            }
        }
    }

    /// Adopt a tree written by another process, keeping the cursor on the
    /// same task when it still exists.
    pub fn on_external_change(&mut self) {
        let keep = self.cursor_task_id();
        match self.store_mut().reload() {
            Ok(true) => {
                self.follow_task(keep);
                self.set_message("reloaded changes from disk");
            }
            Ok(false) => {}
            Err(e) => {
                tracing::warn!(error = %e, "could not reload storage");
                self.set_error(format!("error: {}", e));
            }
        }
    }

    /// Put the cursor back on `id` after the tree changed underneath it
    fn follow_task(&mut self, id: Option<TaskId>) {
        if let Some(id) = id
            && !self.select_task(&id)
        {
            self.clamp_cursor();
        }
    }

    /// Snapshot of the view state for .state.json
    pub fn ui_state(&self) -> UiState {
        UiState {
            cursor: self.cursor_task_id().map(|id| id.to_string()),
            expanded: self.expanded.iter().map(|id| id.to_string()).collect(),
            last_search: Some(self.search_input.clone()).filter(|s| !s.trim().is_empty()),
            search_history: self.search_history.clone(),
        }
    }

    /// Restore a saved view state, dropping ids that no longer exist
    pub fn restore_ui_state(&mut self, state: UiState) {
        let ids = tree::collect_ids(self.store().tasks());
        self.expanded = state
            .expanded
            .into_iter()
            .map(TaskId::from)
            .filter(|id| ids.contains(id))
            .collect();
        self.search_input = state.last_search.unwrap_or_default();
        self.search_history = state.search_history;
        if let Some(id) = state.cursor.map(TaskId::from) {
            self.select_task(&id);
        }
    }
}

/// Resolve a task from a path through the (visible) tree
pub fn resolve_task<'a>(tasks: &'a [Task], path: &[usize]) -> Option<&'a Task> {
    let (first, rest) = path.split_first()?;
    let mut current = tasks.get(*first)?;
    for &idx in rest {
        current = current.subtasks.get(idx)?;
    }
    Some(current)
}

fn flatten_tasks(
    tasks: &[Task],
    expanded: &HashSet<TaskId>,
    expand_all: bool,
    depth: usize,
    ancestor_last: &[bool],
    parent_path: &[usize],
    items: &mut Vec<FlatItem>,
) {
    let count = tasks.len();
    for (i, task) in tasks.iter().enumerate() {
        let is_last = i + 1 == count;
        let has_children = !task.subtasks.is_empty();
        let is_expanded = has_children && (expand_all || expanded.contains(&task.id));

        let mut path = parent_path.to_vec();
        path.push(i);

        items.push(FlatItem {
            id: task.id.clone(),
            path: path.clone(),
            depth,
            has_children,
            is_expanded,
            is_last_sibling: is_last,
            ancestor_last: ancestor_last.to_vec(),
        });

        if is_expanded {
            let mut child_last = ancestor_last.to_vec();
            child_last.push(is_last);
            flatten_tasks(
                &task.subtasks,
                expanded,
                expand_all,
                depth + 1,
                &child_last,
                &path,
                items,
            );
        }
    }
}

/// Run the TUI application
pub fn run(ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    let store = ctx.open_store()?;
    let mut scheduler = Scheduler::new(store);
    scheduler.start(Instant::now());
    let mut app = App::new(scheduler, &ctx.config.ui);

    if let Some(state) = read_ui_state(&ctx.data_dir) {
        app.restore_ui_state(state);
    }

    std::fs::create_dir_all(&ctx.data_dir)?;
    let watcher = match StorageWatcher::start(app.store().kv().path()) {
        Ok(w) => Some(w),
        Err(e) => {
            tracing::warn!(error = %e, "file watcher unavailable, external changes need a restart");
            None
        }
    };

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    // Install panic hook to restore terminal on panic
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(panic_info);
    }));

    let result = run_event_loop(&mut terminal, &mut app, watcher.as_ref());

    app.scheduler.stop();
    save_ui_state(&app, &ctx.data_dir);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    app.store().finish_alarms();

    result
}

fn save_ui_state<K: KvStore>(app: &App<K>, data_dir: &Path) {
    if let Err(e) = write_ui_state(data_dir, &app.ui_state()) {
        tracing::warn!(error = %e, "could not save ui state");
    }
}

fn run_event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App<FileKv>,
    watcher: Option<&StorageWatcher>,
) -> Result<(), Box<dyn std::error::Error>> {
    loop {
        terminal.draw(|frame| render::render(frame, app))?;

        let timeout = app
            .scheduler
            .time_until_next(Instant::now())
            .map_or(MAX_POLL, |d| d.min(MAX_POLL));

        let key = if event::poll(timeout)? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => Some(key),
                _ => None,
            }
        } else {
            None
        };

        // Adopt writes from other processes before anything here persists
        if watcher.is_some_and(StorageWatcher::poll) {
            app.on_external_change();
        }
        if let Some(key) = key {
            input::handle_key(app, key);
        }
        app.on_tick(Instant::now());

        if app.should_quit {
            break;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tui::render::test_helpers::app_with_sample_tree;

    fn ids(items: &[FlatItem]) -> Vec<&str> {
        items.iter().map(|i| i.id.as_str()).collect()
    }

    #[test]
    fn collapsed_tree_shows_roots() {
        let app = app_with_sample_tree();
        assert_eq!(ids(&app.build_flat_items()), vec!["a", "b", "c"]);
    }

    #[test]
    fn expanded_task_shows_children() {
        let mut app = app_with_sample_tree();
        app.expanded.insert(TaskId::from("b"));
        let items = app.build_flat_items();
        assert_eq!(ids(&items), vec!["a", "b", "b1", "b2", "c"]);
        assert_eq!(items[3].path, vec![1, 1]);
        assert!(items[3].is_last_sibling);
        assert!(items[3].has_children);
        assert!(!items[3].is_expanded);
    }

    #[test]
    fn search_expands_matches() {
        let mut app = app_with_sample_tree();
        app.search_input = "glass".into();
        assert_eq!(ids(&app.build_flat_items()), vec!["b", "b2", "b2x"]);
    }

    #[test]
    fn select_task_expands_ancestors() {
        let mut app = app_with_sample_tree();
        assert!(app.select_task(&TaskId::from("b2x")));
        assert_eq!(app.cursor_task_id(), Some(TaskId::from("b2x")));
        assert!(app.expanded.contains(&TaskId::from("b2")));
    }

    #[test]
    fn tick_keeps_edits_written_by_another_process() {
        use crate::alarm::SilentAlarm;
        use crate::model::task::TaskPatch;

        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("storage.json");
        let mut seed = TaskStore::load(FileKv::new(&path), "tasks", Box::new(SilentAlarm)).unwrap();
        let id = seed.create_task(None).unwrap().unwrap().id;
        let original = TaskPatch {
            title: Some("Original".into()),
            ..Default::default()
        };
        seed.update_task(&id, &original).unwrap();
        seed.toggle_timer(&id).unwrap();

        let store = TaskStore::load(FileKv::new(&path), "tasks", Box::new(SilentAlarm)).unwrap();
        let mut scheduler = Scheduler::new(store);
        let t0 = Instant::now();
        scheduler.start(t0);
        let mut app = App::new(scheduler, &UiConfig::default());
        let watcher = StorageWatcher::start(&path).ok();

        // A CLI edit lands between two ticks
        let mut cli = TaskStore::load(FileKv::new(&path), "tasks", Box::new(SilentAlarm)).unwrap();
        let edit = TaskPatch {
            title: Some("Edited by CLI".into()),
            ..Default::default()
        };
        cli.update_task(&id, &edit).unwrap();

        // Same order as the event loop, whether or not the watcher fired yet
        if watcher.as_ref().is_some_and(StorageWatcher::poll) {
            app.on_external_change();
        }
        app.on_tick(t0 + Duration::from_secs(1));

        let task = app.store().find(&id).unwrap();
        assert_eq!(task.title, "Edited by CLI");
        assert_eq!(task.timer_remaining, task.timer_duration - 1);
        assert_eq!(app.cursor_task_id(), Some(id.clone()));

        let on_disk = TaskStore::load(FileKv::new(&path), "tasks", Box::new(SilentAlarm)).unwrap();
        let stored = on_disk.find(&id).unwrap();
        assert_eq!(stored.title, "Edited by CLI");
        assert_eq!(stored.timer_remaining, task.timer_remaining);
    }

    #[test]
    fn ui_state_round_trip_drops_stale_ids() {
        let mut app = app_with_sample_tree();
        app.select_task(&TaskId::from("b1"));
        app.search_input = "room".into();
        let mut state = app.ui_state();
        assert_eq!(state.cursor.as_deref(), Some("b1"));
        assert_eq!(state.last_search.as_deref(), Some("room"));
        state.expanded.insert("gone".into());

        let mut fresh = app_with_sample_tree();
        fresh.restore_ui_state(state);
        assert_eq!(fresh.cursor_task_id(), Some(TaskId::from("b1")));
        assert!(!fresh.expanded.contains(&TaskId::from("gone")));
        assert_eq!(fresh.search_input, "room");
    }
}
