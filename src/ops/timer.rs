use crate::model::task::{Task, TaskId};

/// Error parsing a duration entered by the user
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DurationError {
    #[error("empty duration")]
    Empty,
    #[error("invalid duration: {0}")]
    Invalid(String),
    #[error("duration must be greater than zero")]
    Zero,
}

/// Duration presets offered by the UI: (label, seconds)
pub const PRESETS: [(&str, u64); 8] = [
    ("5 min", 5 * 60),
    ("10 min", 10 * 60),
    ("15 min", 15 * 60),
    ("25 min", 25 * 60),
    ("30 min", 30 * 60),
    ("45 min", 45 * 60),
    ("1 h", 60 * 60),
    ("2 h", 2 * 60 * 60),
];

// ---------------------------------------------------------------------------
// Single-task timer transitions
// ---------------------------------------------------------------------------

/// Start/pause. A spent timer restarts from its full duration.
pub fn toggle_timer(task: &mut Task) {
    if task.timer_remaining == 0 {
        task.timer_remaining = task.timer_duration;
        task.is_timer_running = true;
    } else {
        task.is_timer_running = !task.is_timer_running;
    }
    task.normalize();
}

/// Rewind to the full duration and stop.
pub fn reset_timer(task: &mut Task) {
    task.timer_remaining = task.timer_duration;
    task.is_timer_running = false;
}

/// Configure a new duration; the countdown restarts stopped at full length.
pub fn set_timer_duration(task: &mut Task, seconds: u64) {
    task.timer_duration = seconds;
    task.timer_remaining = seconds;
    task.is_timer_running = false;
}

/// Share of the timer still left, 0..=100. A zero-length timer has none.
pub fn remaining_percent(task: &Task) -> u64 {
    if task.timer_duration == 0 {
        return 0;
    }
    task.timer_remaining.min(task.timer_duration) * 100 / task.timer_duration
}

/// Below this share of time left the timer is drawn as running low
pub const LOW_TIME_PERCENT: u64 = 20;

// ---------------------------------------------------------------------------
// Tick
// ---------------------------------------------------------------------------

/// Outcome of one tick over the tree
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickOutcome {
    /// How many running timers were decremented
    pub decremented: usize,
    /// Tasks whose timer reached zero on this tick, in tree order
    pub expired: Vec<TaskId>,
}

impl TickOutcome {
    pub fn changed(&self) -> bool {
        self.decremented > 0
    }

    pub fn merge(&mut self, other: TickOutcome) {
        self.decremented += other.decremented;
        self.expired.extend(other.expired);
    }
}

/// Advance every running timer by one second.
///
/// Each child is visited regardless of whether its parent runs. A timer that
/// lands on zero stops and is reported once in `expired`; a stopped timer is
/// never reported again.
pub fn tick(tasks: &mut [Task]) -> TickOutcome {
    let mut outcome = TickOutcome::default();
    tick_into(tasks, &mut outcome);
    outcome
}

fn tick_into(tasks: &mut [Task], outcome: &mut TickOutcome) {
    for task in tasks.iter_mut() {
        if task.is_timer_running && task.timer_remaining > 0 {
            task.timer_remaining -= 1;
            outcome.decremented += 1;
            if task.timer_remaining == 0 {
                task.is_timer_running = false;
                outcome.expired.push(task.id.clone());
            }
        }
        tick_into(&mut task.subtasks, outcome);
    }
}

// ---------------------------------------------------------------------------
// Formatting and parsing
// ---------------------------------------------------------------------------

/// Format seconds as `HH:MM:SS` (hours widen past 99).
pub fn format_time(seconds: u64) -> String {
    let hours = seconds / 3600;
    let mins = (seconds % 3600) / 60;
    let secs = seconds % 60;
    format!("{:02}:{:02}:{:02}", hours, mins, secs)
}

/// Parse a user-entered duration into seconds.
///
/// Accepts `h:m:s`, `m:s`, plain seconds (`90`), and unit forms such as
/// `25m`, `1h30m`, `45s`, `2h`. Zero totals are rejected.
pub fn parse_duration(input: &str) -> Result<u64, DurationError> {
    let s = input.trim().to_lowercase();
    if s.is_empty() {
        return Err(DurationError::Empty);
    }
    let invalid = || DurationError::Invalid(input.trim().to_string());

    let total = if s.contains(':') {
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() > 3 {
            return Err(invalid());
        }
        let mut nums = Vec::with_capacity(3);
        for p in &parts {
            let p = p.trim();
            // An empty field counts as zero, so "1::" is one hour.
            let n = if p.is_empty() {
                0
            } else {
                p.parse::<u64>().map_err(|_| invalid())?
            };
            nums.push(n);
        }
        let (h, m, sec) = match nums.as_slice() {
            [m, sec] => (0, *m, *sec),
            [h, m, sec] => (*h, *m, *sec),
            _ => return Err(invalid()),
        };
        h.checked_mul(3600)
            .and_then(|h| m.checked_mul(60).and_then(|m| h.checked_add(m)))
            .and_then(|hm| hm.checked_add(sec))
            .ok_or_else(invalid)?
    } else if let Ok(n) = s.parse::<u64>() {
        n
    } else {
        let mut total: u64 = 0;
        let mut digits = String::new();
        for c in s.chars() {
            if c.is_ascii_digit() {
                digits.push(c);
                continue;
            }
            if c.is_whitespace() {
                continue;
            }
            let unit = match c {
                'h' => 3600,
                'm' => 60,
                's' => 1,
                _ => return Err(invalid()),
            };
            let n: u64 = digits.parse().map_err(|_| invalid())?;
            digits.clear();
            total = n
                .checked_mul(unit)
                .and_then(|v| total.checked_add(v))
                .ok_or_else(invalid)?;
        }
        if !digits.is_empty() {
            return Err(invalid());
        }
        total
    };

    if total == 0 {
        return Err(DurationError::Zero);
    }
    Ok(total)
}

/// Look up a preset by label or by its compact form (`25m`, `1h`).
pub fn preset_seconds(name: &str) -> Option<u64> {
    let wanted = name.trim().to_lowercase().replace(' ', "");
    PRESETS
        .iter()
        .find(|(label, _)| label.replace(' ', "") == wanted)
        .map(|(_, secs)| *secs)
}

/// Parse a timer length typed by the user: a preset label first, then any
/// form [`parse_duration`] accepts.
pub fn parse_timer_input(input: &str) -> Result<u64, DurationError> {
    match preset_seconds(input) {
        Some(secs) => Ok(secs),
        None => parse_duration(input),
    }
}
