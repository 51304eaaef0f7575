use std::io::Write;
use std::thread;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::io::kv::KvStore;
use crate::ops::tree;
use crate::scheduler::Scheduler;
use crate::store::TaskStore;

/// Options for `tt run`
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Stop after this many seconds
    pub seconds: Option<u64>,
    /// Keep going when no timer is running
    pub forever: bool,
    /// One JSON object per expiry instead of text lines
    pub json: bool,
}

#[derive(Serialize)]
struct ExpiryJson<'a> {
    event: &'static str,
    id: &'a str,
    title: &'a str,
}

/// Drive the timers without a terminal UI.
///
/// Each due tick first adopts whatever other `tt` processes wrote (see
/// [`Scheduler::run_due`]). Returns the number of expiries seen.
pub fn run_headless<K: KvStore, W: Write>(
    store: TaskStore<K>,
    opts: &RunOptions,
    out: &mut W,
) -> Result<usize, Box<dyn std::error::Error>> {
    let start = Instant::now();
    let deadline = opts.seconds.map(|s| start + Duration::from_secs(s));
    let mut scheduler = Scheduler::new(store);
    scheduler.start(start);
    let mut expiries = 0;

    tracing::info!(seconds = ?opts.seconds, forever = opts.forever, "headless runner started");
    loop {
        let now = Instant::now();
        let report = scheduler.run_due(now)?;

        for id in &report.outcome.expired {
            expiries += 1;
            let title = scheduler
                .store()
                .find(id)
                .map(|t| t.title.as_str())
                .unwrap_or_default();
            if opts.json {
                let line = ExpiryJson {
                    event: "expired",
                    id: id.as_str(),
                    title,
                };
                writeln!(out, "{}", serde_json::to_string(&line)?)?;
            } else {
                writeln!(out, "timer expired: {} {}", id, title)?;
            }
            out.flush()?;
        }

        if deadline.is_some_and(|d| now >= d) {
            break;
        }
        let running = tree::tree_stats(scheduler.store().tasks()).running_timers;
        if running == 0 && !opts.forever && opts.seconds.is_none() {
            break;
        }

        let mut wait = scheduler
            .time_until_next(Instant::now())
            .unwrap_or(Duration::from_secs(1));
        if let Some(d) = deadline {
            wait = wait.min(d.saturating_duration_since(Instant::now()));
        }
        thread::sleep(wait);
    }

    scheduler.stop();
    scheduler.store().finish_alarms();
    tracing::info!(expiries, "headless runner stopped");
    Ok(expiries)
}
