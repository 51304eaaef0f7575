use std::fmt;

use chrono::{DateTime, Local, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Title given to every freshly created task
pub const DEFAULT_TITLE: &str = "Nuovo Task";

/// Countdown length of a freshly created task, in seconds
pub const DEFAULT_TIMER_SECS: u64 = 300;

/// Workflow stage of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    #[default]
    NotStarted,
    Preparing,
    InProgress,
    Completed,
}

impl TaskStatus {
    /// All statuses in workflow order
    pub const ALL: [TaskStatus; 4] = [
        TaskStatus::NotStarted,
        TaskStatus::Preparing,
        TaskStatus::InProgress,
        TaskStatus::Completed,
    ];

    /// The stable kebab-case name used on disk and on the command line
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::NotStarted => "not-started",
            TaskStatus::Preparing => "preparing",
            TaskStatus::InProgress => "in-progress",
            TaskStatus::Completed => "completed",
        }
    }

    /// Human-readable label
    pub fn label(self) -> &'static str {
        match self {
            TaskStatus::NotStarted => "Not started",
            TaskStatus::Preparing => "Preparing",
            TaskStatus::InProgress => "In progress",
            TaskStatus::Completed => "Completed",
        }
    }

    /// The character shown inside the status box `[ ]`
    pub fn marker(self) -> char {
        match self {
            TaskStatus::NotStarted => ' ',
            TaskStatus::Preparing => '~',
            TaskStatus::InProgress => '>',
            TaskStatus::Completed => 'x',
        }
    }

    /// Next status in workflow order, wrapping back to not-started
    pub fn next(self) -> TaskStatus {
        match self {
            TaskStatus::NotStarted => TaskStatus::Preparing,
            TaskStatus::Preparing => TaskStatus::InProgress,
            TaskStatus::InProgress => TaskStatus::Completed,
            TaskStatus::Completed => TaskStatus::NotStarted,
        }
    }

    /// Parse a status name. Accepts the kebab-case names plus a few short forms.
    pub fn parse(s: &str) -> Option<TaskStatus> {
        match s.trim().to_lowercase().as_str() {
            "not-started" | "notstarted" | "todo" | "new" => Some(TaskStatus::NotStarted),
            "preparing" | "prep" => Some(TaskStatus::Preparing),
            "in-progress" | "inprogress" | "active" | "doing" => Some(TaskStatus::InProgress),
            "completed" | "complete" | "done" => Some(TaskStatus::Completed),
            _ => None,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque task identifier, unique across the whole tree
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// Mint an id whose time component is `created_at_ms`
    pub fn generate(created_at_ms: i64) -> TaskId {
        let ts = u64::try_from(created_at_ms).unwrap_or(0);
        let ulid = ulid::Ulid::from_parts(ts, rand_bits());
        TaskId(format!("task_{}", ulid.to_string().to_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Random component for [`TaskId::generate`]
fn rand_bits() -> u128 {
    ulid::Ulid::new().random()
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        TaskId(s.to_string())
    }
}

impl From<String> for TaskId {
    fn from(s: String) -> Self {
        TaskId(s)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A node of the task tree.
///
/// Field names follow the persisted camelCase layout. Every field except `id`
/// has a serde default so that older or hand-edited blobs still load; callers
/// run [`Task::normalize`] afterwards to restore the timer invariants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: TaskStatus,
    /// Calendar date, `YYYY-MM-DD`
    #[serde(default = "today_str")]
    pub due_date: String,
    /// Configured countdown length in seconds
    #[serde(default = "default_timer_secs")]
    pub timer_duration: u64,
    /// Seconds left, never above `timer_duration`
    #[serde(default = "default_timer_secs")]
    pub timer_remaining: u64,
    #[serde(default)]
    pub is_timer_running: bool,
    #[serde(default)]
    pub subtasks: Vec<Task>,
    /// Creation time, Unix milliseconds
    #[serde(default)]
    pub created_at: i64,
}

impl Task {
    /// Create a task with default fields, stamped with the current time
    pub fn new() -> Self {
        Self::new_at(Utc::now())
    }

    /// Create a task with default fields as of `now`
    pub fn new_at(now: DateTime<Utc>) -> Self {
        let created_at = now.timestamp_millis();
        Task {
            id: TaskId::generate(created_at),
            title: DEFAULT_TITLE.to_string(),
            description: String::new(),
            status: TaskStatus::NotStarted,
            due_date: now.with_timezone(&Local).format("%Y-%m-%d").to_string(),
            timer_duration: DEFAULT_TIMER_SECS,
            timer_remaining: DEFAULT_TIMER_SECS,
            is_timer_running: false,
            subtasks: Vec::new(),
            created_at,
        }
    }

    /// Creation time as a UTC timestamp, if representable
    pub fn created(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.created_at).single()
    }

    /// Clamp the timer fields back into their invariants:
    /// `timer_remaining <= timer_duration`, and a spent timer is never running.
    pub fn normalize(&mut self) {
        if self.timer_remaining > self.timer_duration {
            self.timer_remaining = self.timer_duration;
        }
        if self.timer_remaining == 0 {
            self.is_timer_running = false;
        }
    }

    /// Number of nodes in this subtree, including `self`
    pub fn subtree_len(&self) -> usize {
        1 + self.subtasks.iter().map(Task::subtree_len).sum::<usize>()
    }
}

impl Default for Task {
    fn default() -> Self {
        Task::new()
    }
}

/// Partial update merged into a task by `update_task`.
///
/// `id`, `subtasks` and `created_at` are deliberately absent: they never change
/// after creation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timer_duration: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timer_remaining: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_timer_running: Option<bool>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        *self == TaskPatch::default()
    }

    /// Merge the set fields into `task`, then restore the timer invariants
    pub fn apply(&self, task: &mut Task) {
        if let Some(title) = &self.title {
            task.title = title.clone();
        }
        if let Some(description) = &self.description {
            task.description = description.clone();
        }
        if let Some(status) = self.status {
            task.status = status;
        }
        if let Some(due) = &self.due_date {
            task.due_date = due.clone();
        }
        if let Some(d) = self.timer_duration {
            task.timer_duration = d;
        }
        if let Some(r) = self.timer_remaining {
            task.timer_remaining = r;
        }
        if let Some(running) = self.is_timer_running {
            task.is_timer_running = running;
        }
        task.normalize();
    }
}

fn default_title() -> String {
    DEFAULT_TITLE.to_string()
}

fn default_timer_secs() -> u64 {
    DEFAULT_TIMER_SECS
}

fn today_str() -> String {
    Local::now().format("%Y-%m-%d").to_string()
}
