use std::collections::HashSet;

use crate::model::task::{Task, TaskId, TaskPatch, TaskStatus};

// ---------------------------------------------------------------------------
// Lookup
// ---------------------------------------------------------------------------

/// Find a task by ID anywhere in the tree (depth-first, pre-order).
pub fn find_task<'a>(tasks: &'a [Task], id: &TaskId) -> Option<&'a Task> {
    for task in tasks {
        if &task.id == id {
            return Some(task);
        }
        if let Some(t) = find_task(&task.subtasks, id) {
            return Some(t);
        }
    }
    None
}

/// Find a task by ID anywhere in the tree, return mutable ref.
pub fn find_task_mut<'a>(tasks: &'a mut [Task], id: &TaskId) -> Option<&'a mut Task> {
    for task in tasks.iter_mut() {
        if &task.id == id {
            return Some(task);
        }
        if let Some(t) = find_task_mut(&mut task.subtasks, id) {
            return Some(t);
        }
    }
    None
}

pub fn contains_task(tasks: &[Task], id: &TaskId) -> bool {
    find_task(tasks, id).is_some()
}

/// IDs of the ancestors of `id`, outermost first. `None` if `id` is absent.
pub fn ancestors_of(tasks: &[Task], id: &TaskId) -> Option<Vec<TaskId>> {
    fn walk(tasks: &[Task], id: &TaskId, chain: &mut Vec<TaskId>) -> bool {
        for task in tasks {
            if &task.id == id {
                return true;
            }
            chain.push(task.id.clone());
            if walk(&task.subtasks, id, chain) {
                return true;
            }
            chain.pop();
        }
        false
    }

    let mut chain = Vec::new();
    walk(tasks, id, &mut chain).then_some(chain)
}

// ---------------------------------------------------------------------------
// Rewrites
// ---------------------------------------------------------------------------

/// Append `task` to the root list (`parent_id == None`) or to the subtasks of
/// `parent_id`. Returns false, dropping `task`, if the parent does not exist.
pub fn insert_task(tasks: &mut Vec<Task>, parent_id: Option<&TaskId>, task: Task) -> bool {
    match parent_id {
        None => {
            tasks.push(task);
            true
        }
        Some(pid) => match find_task_mut(tasks, pid) {
            Some(parent) => {
                parent.subtasks.push(task);
                true
            }
            None => false,
        },
    }
}

/// Run `f` on the task with `id`. Returns false if no such task exists.
pub fn with_task_mut(tasks: &mut [Task], id: &TaskId, f: impl FnOnce(&mut Task)) -> bool {
    match find_task_mut(tasks, id) {
        Some(task) => {
            f(task);
            true
        }
        None => false,
    }
}

/// Merge `patch` into the task with `id`.
pub fn update_task(tasks: &mut [Task], id: &TaskId, patch: &TaskPatch) -> bool {
    with_task_mut(tasks, id, |task| patch.apply(task))
}

/// Set the status field only.
pub fn change_status(tasks: &mut [Task], id: &TaskId, status: TaskStatus) -> bool {
    with_task_mut(tasks, id, |task| task.status = status)
}

/// Remove the task with `id` (and with it, its whole subtree) from wherever
/// it sits. Returns the detached subtree.
pub fn remove_task(tasks: &mut Vec<Task>, id: &TaskId) -> Option<Task> {
    if let Some(idx) = tasks.iter().position(|t| &t.id == id) {
        return Some(tasks.remove(idx));
    }
    for task in tasks.iter_mut() {
        if let Some(removed) = remove_task(&mut task.subtasks, id) {
            return Some(removed);
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Walks
// ---------------------------------------------------------------------------

/// Visit every task, parents before children.
pub fn for_each_task(tasks: &[Task], f: &mut dyn FnMut(&Task)) {
    for task in tasks {
        f(task);
        for_each_task(&task.subtasks, f);
    }
}

/// Visit every task mutably, parents before children.
pub fn for_each_task_mut(tasks: &mut [Task], f: &mut dyn FnMut(&mut Task)) {
    for task in tasks.iter_mut() {
        f(task);
        for_each_task_mut(&mut task.subtasks, f);
    }
}

/// Total number of tasks in the tree.
pub fn count_tasks(tasks: &[Task]) -> usize {
    tasks.iter().map(Task::subtree_len).sum()
}

/// Every ID present in the tree.
pub fn collect_ids(tasks: &[Task]) -> HashSet<TaskId> {
    let mut ids = HashSet::new();
    for_each_task(tasks, &mut |t| {
        ids.insert(t.id.clone());
    });
    ids
}

/// Restore timer invariants on every node (used after loading foreign data).
pub fn normalize_tree(tasks: &mut [Task]) {
    for_each_task_mut(tasks, &mut |t| t.normalize());
}

/// Per-status counts, running timers and time spent across the tree
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TreeStats {
    pub not_started: usize,
    pub preparing: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub running_timers: usize,
    /// Sum of `timer_duration - timer_remaining` over every task
    pub elapsed_secs: u64,
}

impl TreeStats {
    pub fn total(&self) -> usize {
        self.not_started + self.preparing + self.in_progress + self.completed
    }

    pub fn count(&self, status: TaskStatus) -> usize {
        match status {
            TaskStatus::NotStarted => self.not_started,
            TaskStatus::Preparing => self.preparing,
            TaskStatus::InProgress => self.in_progress,
            TaskStatus::Completed => self.completed,
        }
    }
}

pub fn tree_stats(tasks: &[Task]) -> TreeStats {
    let mut stats = TreeStats::default();
    for_each_task(tasks, &mut |t| {
        match t.status {
            TaskStatus::NotStarted => stats.not_started += 1,
            TaskStatus::Preparing => stats.preparing += 1,
            TaskStatus::InProgress => stats.in_progress += 1,
            TaskStatus::Completed => stats.completed += 1,
        }
        if t.is_timer_running {
            stats.running_timers += 1;
        }
        stats.elapsed_secs += t.timer_duration.saturating_sub(t.timer_remaining);
    });
    stats
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
