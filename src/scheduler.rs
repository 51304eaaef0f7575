use std::time::{Duration, Instant};

use crate::io::kv::KvStore;
use crate::ops::timer::TickOutcome;
use crate::store::{StoreError, TaskStore};

/// Fixed timer resolution
pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// What one `run_due` call did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Ticks whose deadline had passed
    pub ticks: u32,
    /// Combined outcome of those ticks
    pub outcome: TickOutcome,
    /// Storage held a tree written elsewhere, adopted before ticking
    pub reloaded: bool,
}

/// Drives the store's periodic tick from a host loop.
///
/// The host calls [`run_due`](Self::run_due) whenever it wakes and uses
/// [`time_until_next`](Self::time_until_next) as its poll timeout. Time is
/// passed in so the schedule can be exercised without sleeping.
pub struct Scheduler<K: KvStore> {
    store: TaskStore<K>,
    next_due: Option<Instant>,
}

impl<K: KvStore> Scheduler<K> {
    /// Wrap a store. The scheduler starts stopped.
    pub fn new(store: TaskStore<K>) -> Self {
        Scheduler {
            store,
            next_due: None,
        }
    }

    /// Arm the first tick one period after `now`. Restarting re-arms.
    pub fn start(&mut self, now: Instant) {
        self.next_due = Some(now + TICK_PERIOD);
    }

    /// Disarm. Pending ticks are dropped.
    pub fn stop(&mut self) {
        self.next_due = None;
    }

    pub fn is_running(&self) -> bool {
        self.next_due.is_some()
    }

    /// Run every tick due at `now`, then persist once if any timer moved.
    ///
    /// When a tick is due the tree is first re-read from storage, so the
    /// persisted result builds on writes made by other processes instead of
    /// replacing them.
    pub fn run_due(&mut self, now: Instant) -> Result<TickReport, StoreError> {
        let mut report = TickReport::default();
        let Some(mut due) = self.next_due else {
            return Ok(report);
        };
        if due > now {
            return Ok(report);
        }
        report.reloaded = self.store.reload()?;
        while due <= now {
            report.outcome.merge(self.store.advance());
            report.ticks += 1;
            due += TICK_PERIOD;
        }
        self.next_due = Some(due);

        if report.ticks > 1 {
            tracing::debug!(ticks = report.ticks, "caught up on missed ticks");
        }
        if report.outcome.changed() {
            self.store.persist()?;
        }
        Ok(report)
    }

    /// Time left until the next tick; `None` when stopped.
    pub fn time_until_next(&self, now: Instant) -> Option<Duration> {
        self.next_due.map(|due| due.saturating_duration_since(now))
    }

    pub fn store(&self) -> &TaskStore<K> {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut TaskStore<K> {
        &mut self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alarm::{CountingAlarm, SilentAlarm};
    use crate::io::kv::{FileKv, MemoryKv};
    use crate::model::task::{TaskId, TaskPatch};
    use crate::ops::tree::tests::sample_tree;

    fn scheduler(alarm: CountingAlarm) -> Scheduler<MemoryKv> {
        let mut tasks = sample_tree();
        tasks[0].timer_duration = 3;
        tasks[0].timer_remaining = 3;
        tasks[0].is_timer_running = true;
        let blob = serde_json::to_string(&tasks).unwrap();
        let store =
            TaskStore::load(MemoryKv::with_entry("tasks", blob), "tasks", Box::new(alarm)).unwrap();
        Scheduler::new(store)
    }

    fn remaining(s: &Scheduler<MemoryKv>) -> u64 {
        s.store().find(&TaskId::from("a")).unwrap().timer_remaining
    }

    #[test]
    fn stopped_scheduler_does_nothing() {
        let mut s = scheduler(CountingAlarm::new());
        let now = Instant::now();
        assert!(!s.is_running());
        assert_eq!(s.time_until_next(now), None);
        assert_eq!(s.run_due(now + Duration::from_secs(10)).unwrap().ticks, 0);
        assert_eq!(remaining(&s), 3);
    }

    #[test]
    fn ticks_once_per_period() {
        let mut s = scheduler(CountingAlarm::new());
        let t0 = Instant::now();
        s.start(t0);

        assert_eq!(s.run_due(t0 + Duration::from_millis(999)).unwrap().ticks, 0);
        assert_eq!(remaining(&s), 3);

        assert_eq!(s.run_due(t0 + Duration::from_secs(1)).unwrap().ticks, 1);
        assert_eq!(remaining(&s), 2);
        assert_eq!(
            s.time_until_next(t0 + Duration::from_millis(1500)),
            Some(Duration::from_millis(500))
        );
    }

    #[test]
    fn late_wakeup_catches_up_and_persists_once() {
        let alarm = CountingAlarm::new();
        let mut s = scheduler(alarm.clone());
        let t0 = Instant::now();
        s.start(t0);

        let report = s.run_due(t0 + Duration::from_millis(5200)).unwrap();
        assert_eq!(report.ticks, 5);
        assert_eq!(report.outcome.expired, vec![TaskId::from("a")]);
        assert_eq!(alarm.count(), 1);
        assert_eq!(remaining(&s), 0);

        let blob = s.store().kv().get("tasks").unwrap().unwrap();
        assert!(blob.contains("\"timerRemaining\":0"));
        assert_eq!(
            s.time_until_next(t0 + Duration::from_millis(5200)),
            Some(Duration::from_millis(800))
        );
    }

    #[test]
    fn due_tick_builds_on_storage_written_elsewhere() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("storage.json");
        let mut task = crate::model::task::Task::new();
        task.id = TaskId::from("a");
        task.title = "Original".into();
        task.timer_remaining = 10;
        task.timer_duration = 10;
        task.is_timer_running = true;
        let mut kv = FileKv::new(&path);
        kv.set("tasks", serde_json::to_string(&vec![task]).unwrap())
            .unwrap();

        let store = TaskStore::load(FileKv::new(&path), "tasks", Box::new(SilentAlarm)).unwrap();
        let mut s = Scheduler::new(store);
        let t0 = Instant::now();
        s.start(t0);

        let mut other =
            TaskStore::load(FileKv::new(&path), "tasks", Box::new(SilentAlarm)).unwrap();
        let patch = TaskPatch {
            title: Some("Edited elsewhere".into()),
            ..Default::default()
        };
        assert!(other.update_task(&TaskId::from("a"), &patch).unwrap());

        let report = s.run_due(t0 + Duration::from_secs(1)).unwrap();
        assert!(report.reloaded);
        let task = s.store().find(&TaskId::from("a")).unwrap();
        assert_eq!(task.title, "Edited elsewhere");
        assert_eq!(task.timer_remaining, 9);

        let fresh = TaskStore::load(FileKv::new(&path), "tasks", Box::new(SilentAlarm)).unwrap();
        assert_eq!(fresh.tasks(), s.store().tasks());
    }

    #[test]
    fn nothing_due_skips_the_reload() {
        let mut s = scheduler(CountingAlarm::new());
        let t0 = Instant::now();
        s.start(t0);
        let report = s.run_due(t0 + Duration::from_millis(10)).unwrap();
        assert_eq!(report, TickReport::default());
    }

    #[test]
    fn stop_disarms() {
        let mut s = scheduler(CountingAlarm::new());
        let t0 = Instant::now();
        s.start(t0);
        s.stop();
        assert_eq!(s.run_due(t0 + Duration::from_secs(5)).unwrap().ticks, 0);
        assert_eq!(remaining(&s), 3);
    }
}
