use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::alarm::Alarm;
use crate::io::kv::{KvError, KvStore};
use crate::model::task::{Task, TaskId, TaskPatch, TaskStatus};
use crate::ops::timer::{self, TickOutcome};
use crate::ops::tree::{self, TreeStats};

/// Error type for store persistence
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Kv(#[from] KvError),
    #[error("could not serialize tasks: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Owns the task tree and keeps it persisted.
///
/// Every operation that applies writes the whole tree back to `key` in the
/// key-value store before returning. Operations that name a missing task
/// leave both the tree and storage untouched and report `false` / `None`.
pub struct TaskStore<K: KvStore> {
    tasks: Vec<Task>,
    kv: K,
    key: String,
    alarm: Box<dyn Alarm>,
}

impl<K: KvStore> TaskStore<K> {
    /// Load the tree stored under `key`.
    ///
    /// A missing key is an empty tree. Data that does not decode as a task
    /// tree is logged and replaced by an empty tree; it is overwritten by the
    /// next mutation. I/O failures are returned.
    pub fn load(kv: K, key: impl Into<String>, alarm: Box<dyn Alarm>) -> Result<Self, StoreError> {
        let key = key.into();
        let tasks = read_tree(&kv, &key)?;
        Ok(TaskStore {
            tasks,
            kv,
            key,
            alarm,
        })
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn find(&self, id: &TaskId) -> Option<&Task> {
        tree::find_task(&self.tasks, id)
    }

    pub fn stats(&self) -> TreeStats {
        tree::tree_stats(&self.tasks)
    }

    pub fn kv(&self) -> &K {
        &self.kv
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    // -----------------------------------------------------------------------
    // Operations
    // -----------------------------------------------------------------------

    /// Create a default task at the root (`parent == None`) or as the last
    /// subtask of `parent`. Returns `None` if `parent` does not exist.
    pub fn create_task(&mut self, parent: Option<&TaskId>) -> Result<Option<Task>, StoreError> {
        self.create_task_with(parent, &TaskPatch::default(), Utc::now())
    }

    /// Like [`create_task`](Self::create_task), with `patch` merged into the
    /// defaults and `now` as the creation time. Persists once.
    pub fn create_task_with(
        &mut self,
        parent: Option<&TaskId>,
        patch: &TaskPatch,
        now: DateTime<Utc>,
    ) -> Result<Option<Task>, StoreError> {
        if let Some(pid) = parent
            && !tree::contains_task(&self.tasks, pid)
        {
            tracing::debug!(parent = %pid, "create: parent not found");
            return Ok(None);
        }

        let mut task = Task::new_at(now);
        while tree::contains_task(&self.tasks, &task.id) {
            task.id = TaskId::generate(task.created_at);
        }
        patch.apply(&mut task);

        let created = task.clone();
        tree::insert_task(&mut self.tasks, parent, task);
        tracing::debug!(id = %created.id, parent = ?parent.map(TaskId::as_str), "created task");
        self.persist()?;
        Ok(Some(created))
    }

    /// Merge `patch` into the task with `id`.
    pub fn update_task(&mut self, id: &TaskId, patch: &TaskPatch) -> Result<bool, StoreError> {
        let applied = tree::update_task(&mut self.tasks, id, patch);
        self.finish("update", id, applied)
    }

    /// Remove the task with `id` together with its subtree.
    /// Returns the removed subtree.
    pub fn delete_task(&mut self, id: &TaskId) -> Result<Option<Task>, StoreError> {
        let removed = tree::remove_task(&mut self.tasks, id);
        if let Some(task) = &removed {
            tracing::debug!(id = %id, removed = task.subtree_len(), "deleted task");
        }
        self.finish("delete", id, removed.is_some())?;
        Ok(removed)
    }

    pub fn toggle_timer(&mut self, id: &TaskId) -> Result<bool, StoreError> {
        let applied = tree::with_task_mut(&mut self.tasks, id, timer::toggle_timer);
        self.finish("toggle timer", id, applied)
    }

    pub fn reset_timer(&mut self, id: &TaskId) -> Result<bool, StoreError> {
        let applied = tree::with_task_mut(&mut self.tasks, id, timer::reset_timer);
        self.finish("reset timer", id, applied)
    }

    pub fn set_timer_duration(&mut self, id: &TaskId, seconds: u64) -> Result<bool, StoreError> {
        let applied = tree::with_task_mut(&mut self.tasks, id, |t| {
            timer::set_timer_duration(t, seconds)
        });
        self.finish("set timer", id, applied)
    }

    pub fn change_status(&mut self, id: &TaskId, status: TaskStatus) -> Result<bool, StoreError> {
        let applied = tree::change_status(&mut self.tasks, id, status);
        self.finish("change status", id, applied)
    }

    /// One timer tick: decrement every running timer, ring the alarm once per
    /// expiry, and persist if anything moved.
    pub fn tick(&mut self) -> Result<TickOutcome, StoreError> {
        let outcome = self.advance();
        if outcome.changed() {
            self.persist()?;
        }
        Ok(outcome)
    }

    /// Tick without persisting. The scheduler batches catch-up ticks and
    /// persists once.
    pub(crate) fn advance(&mut self) -> TickOutcome {
        let outcome = timer::tick(&mut self.tasks);
        for id in &outcome.expired {
            let title = tree::find_task(&self.tasks, id)
                .map(|t| t.title.as_str())
                .unwrap_or_default();
            tracing::info!(id = %id, title, "timer expired");
            if let Err(e) = self.alarm.ring() {
                tracing::warn!(id = %id, error = %e, "alarm failed");
            }
        }
        outcome
    }

    /// Wait for alarm playback still in flight
    pub fn finish_alarms(&self) {
        self.alarm.finish();
    }

    /// Re-read the tree from storage, adopting changes made by another
    /// process. Returns true if the tree differed.
    pub fn reload(&mut self) -> Result<bool, StoreError> {
        let fresh = read_tree(&self.kv, &self.key)?;
        if fresh == self.tasks {
            return Ok(false);
        }
        tracing::info!(tasks = tree::count_tasks(&fresh), "reloaded tasks from storage");
        self.tasks = fresh;
        Ok(true)
    }

    /// Write the whole tree under the store key.
    pub fn persist(&mut self) -> Result<(), StoreError> {
        let blob = serde_json::to_string(&self.tasks)?;
        tracing::debug!(key = %self.key, bytes = blob.len(), "persisting tasks");
        self.kv.set(&self.key, blob)?;
        Ok(())
    }

    fn finish(&mut self, op: &str, id: &TaskId, applied: bool) -> Result<bool, StoreError> {
        if applied {
            self.persist()?;
        } else {
            tracing::debug!(id = %id, "{op}: task not found");
        }
        Ok(applied)
    }
}

/// Decode the tree stored under `key`, failing soft on malformed content.
fn read_tree<K: KvStore>(kv: &K, key: &str) -> Result<Vec<Task>, StoreError> {
    let blob = match kv.get(key) {
        Ok(Some(blob)) => blob,
        Ok(None) => return Ok(Vec::new()),
        Err(KvError::Corrupt { path, source }) => {
            tracing::warn!(
                path = %path.display(),
                error = %source,
                "storage file unreadable, starting empty"
            );
            return Ok(Vec::new());
        }
        Err(e) => return Err(e.into()),
    };
    Ok(decode_tree(&blob))
}

/// Parse a serialized tree. Anything that is not a list of tasks yields an
/// empty tree. Timer fields are clamped and duplicate ids re-minted.
pub fn decode_tree(blob: &str) -> Vec<Task> {
    let mut tasks = match serde_json::from_str::<Option<Vec<Task>>>(blob) {
        Ok(tasks) => tasks.unwrap_or_default(),
        Err(e) => {
            tracing::warn!(error = %e, "stored tasks are malformed, starting empty");
            return Vec::new();
        }
    };
    tree::normalize_tree(&mut tasks);
    dedupe_ids(&mut tasks);
    tasks
}

/// Give every task after the first holder of an id a fresh one.
fn dedupe_ids(tasks: &mut [Task]) {
    let mut seen: HashSet<TaskId> = HashSet::new();
    let mut dupes = Vec::new();
    tree::for_each_task(tasks, &mut |t| {
        if !seen.insert(t.id.clone()) {
            dupes.push(t.id.clone());
        }
    });
    if dupes.is_empty() {
        return;
    }

    let mut first_seen: HashSet<TaskId> = HashSet::new();
    tree::for_each_task_mut(tasks, &mut |t| {
        if first_seen.insert(t.id.clone()) {
            return;
        }
        let mut fresh = TaskId::generate(t.created_at);
        while seen.contains(&fresh) {
            fresh = TaskId::generate(t.created_at);
        }
        tracing::warn!(old = %t.id, new = %fresh, "duplicate task id re-minted");
        seen.insert(fresh.clone());
        t.id = fresh;
    });
}
