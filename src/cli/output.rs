use chrono::NaiveDate;
use serde::Serialize;

use crate::model::task::{Task, TaskStatus};
use crate::ops::timer::{PRESETS, format_time};
use crate::ops::tree::TreeStats;
use crate::util::dates::format_due_relative;

// ---------------------------------------------------------------------------
// JSON output structs
// ---------------------------------------------------------------------------

/// `tt show --json`: the task (with subtasks, persisted layout) plus its
/// ancestor chain, outermost first.
#[derive(Serialize)]
pub struct ShowJson<'a> {
    #[serde(flatten)]
    pub task: &'a Task,
    pub ancestors: Vec<AncestorJson>,
}

#[derive(Serialize)]
pub struct AncestorJson {
    pub id: String,
    pub title: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsJson {
    pub total: usize,
    pub not_started: usize,
    pub preparing: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub running_timers: usize,
    pub elapsed_seconds: u64,
}

#[derive(Serialize)]
pub struct ListJson<'a> {
    pub tasks: &'a [Task],
    pub stats: StatsJson,
}

#[derive(Serialize)]
pub struct PresetJson {
    pub label: &'static str,
    pub seconds: u64,
}

pub fn stats_to_json(stats: &TreeStats) -> StatsJson {
    StatsJson {
        total: stats.total(),
        not_started: stats.not_started,
        preparing: stats.preparing,
        in_progress: stats.in_progress,
        completed: stats.completed,
        running_timers: stats.running_timers,
        elapsed_seconds: stats.elapsed_secs,
    }
}

pub fn presets_to_json() -> Vec<PresetJson> {
    PRESETS
        .iter()
        .map(|&(label, seconds)| PresetJson { label, seconds })
        .collect()
}

// ---------------------------------------------------------------------------
// Human-readable formatting
// ---------------------------------------------------------------------------

/// Remaining time, with a play marker while running
pub fn format_timer(task: &Task) -> String {
    let time = format_time(task.timer_remaining);
    if task.is_timer_running {
        format!("{} >", time)
    } else {
        time
    }
}

/// Format a single task as a one-line summary
pub fn format_task_line(task: &Task, today: NaiveDate) -> String {
    format!(
        "[{}] {} {}  {}  due {}",
        task.status.marker(),
        task.id,
        task.title,
        format_timer(task),
        format_due_relative(&task.due_date, today)
    )
}

/// Format a task with its subtasks, indented
pub fn format_task_tree(task: &Task, indent: usize, today: NaiveDate) -> Vec<String> {
    let mut lines = Vec::new();
    let prefix = "  ".repeat(indent);
    lines.push(format!("{}{}", prefix, format_task_line(task, today)));

    for sub in &task.subtasks {
        lines.extend(format_task_tree(sub, indent + 1, today));
    }
    lines
}

/// Format a whole forest
pub fn format_tree(tasks: &[Task], today: NaiveDate) -> Vec<String> {
    tasks
        .iter()
        .flat_map(|t| format_task_tree(t, 0, today))
        .collect()
}

/// Summary footer for `tt list`
pub fn format_stats(stats: &TreeStats) -> String {
    let mut s = format!(
        "{} tasks: {} not started, {} preparing, {} in progress, {} completed",
        stats.total(),
        stats.not_started,
        stats.preparing,
        stats.in_progress,
        stats.completed
    );
    if stats.running_timers > 0 {
        s.push_str(&format!(" ({} running)", stats.running_timers));
    }
    s.push_str(&format!(", {} elapsed", format_time(stats.elapsed_secs)));
    s
}

/// Format detailed task view
pub fn format_task_detail(task: &Task, today: NaiveDate) -> Vec<String> {
    let mut lines = Vec::new();

    lines.push(format!("[{}] {} {}", task.status.marker(), task.id, task.title));
    lines.push(format!("status: {}", task.status.label()));
    lines.push(format!(
        "due: {} ({})",
        task.due_date,
        format_due_relative(&task.due_date, today)
    ));
    lines.push(format!(
        "timer: {} / {}{}",
        format_time(task.timer_remaining),
        format_time(task.timer_duration),
        if task.is_timer_running {
            " (running)"
        } else {
            ""
        }
    ));
    if let Some(created) = task.created() {
        lines.push(format!("created: {}", created.format("%Y-%m-%d %H:%M UTC")));
    }

    if !task.description.is_empty() {
        lines.push("description:".to_string());
        for line in task.description.lines() {
            lines.push(format!("  {}", line));
        }
    }

    if !task.subtasks.is_empty() {
        lines.push(String::new());
        lines.push("subtasks:".to_string());
        for sub in &task.subtasks {
            lines.extend(format_task_tree(sub, 1, today));
        }
    }

    lines
}

/// Detail view preceded by the ancestor chain
pub fn format_task_detail_with_context(
    ancestors: &[&Task],
    task: &Task,
    today: NaiveDate,
) -> Vec<String> {
    let mut lines = Vec::new();
    for (depth, anc) in ancestors.iter().enumerate() {
        lines.push(format!(
            "{}[{}] {} {}",
            "  ".repeat(depth),
            anc.status.marker(),
            anc.id,
            anc.title
        ));
    }
    if !ancestors.is_empty() {
        lines.push(String::new());
    }
    lines.extend(format_task_detail(task, today));
    lines
}

/// Parse a status string into TaskStatus
pub fn parse_task_status(s: &str) -> Result<TaskStatus, String> {
    TaskStatus::parse(s).ok_or_else(|| {
        format!(
            "unknown status '{}' (expected: not-started, preparing, in-progress, completed)",
            s
        )
    })
}
