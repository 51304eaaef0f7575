use std::io::{self, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::model::config::AlarmConfig;

/// Error type for alarm playback
#[derive(Debug, thiserror::Error)]
pub enum AlarmError {
    #[error("could not start alarm thread: {0}")]
    Spawn(io::Error),
    #[error("could not ring terminal bell: {0}")]
    Io(#[from] io::Error),
}

/// Side effect fired once per timer expiry.
///
/// Implementations must return promptly; the tick waits on `ring`.
pub trait Alarm {
    fn ring(&self) -> Result<(), AlarmError>;

    /// Block until playback started by earlier `ring` calls has finished.
    /// Call before the process exits.
    fn finish(&self) {}
}

/// Build the alarm described by the `[alarm]` config section
pub fn from_config(config: &AlarmConfig) -> Box<dyn Alarm> {
    if config.enabled && config.beeps > 0 {
        Box::new(TerminalBell::new(
            config.beeps,
            Duration::from_millis(config.gap_ms),
        ))
    } else {
        Box::new(SilentAlarm)
    }
}

/// Rings the terminal bell (BEL) on stderr a fixed number of times with a
/// pause between beeps, on a background thread. Stdout stays free for
/// command output.
#[derive(Debug, Clone)]
pub struct TerminalBell {
    beeps: u32,
    gap: Duration,
    pending: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl TerminalBell {
    pub fn new(beeps: u32, gap: Duration) -> Self {
        TerminalBell {
            beeps,
            gap,
            pending: Arc::default(),
        }
    }
}

impl Default for TerminalBell {
    fn default() -> Self {
        TerminalBell::new(3, Duration::from_millis(600))
    }
}

impl Alarm for TerminalBell {
    fn ring(&self) -> Result<(), AlarmError> {
        let beeps = self.beeps;
        let gap = self.gap;
        let handle = thread::Builder::new()
            .name("tt-alarm".into())
            .spawn(move || {
                if let Err(e) = beep(&mut io::stderr(), beeps, gap) {
                    tracing::warn!(error = %e, "terminal bell failed");
                }
            })
            .map_err(AlarmError::Spawn)?;

        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        pending.retain(|h| !h.is_finished());
        pending.push(handle);
        Ok(())
    }

    fn finish(&self) {
        let handles: Vec<_> = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();
        for handle in handles {
            if handle.join().is_err() {
                tracing::warn!("alarm thread panicked");
            }
        }
    }
}

fn beep(out: &mut impl Write, beeps: u32, gap: Duration) -> io::Result<()> {
    for i in 0..beeps {
        if i > 0 {
            thread::sleep(gap);
        }
        out.write_all(b"\x07")?;
        out.flush()?;
    }
    Ok(())
}

/// Alarm that does nothing (alarm disabled, or tests)
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentAlarm;

impl Alarm for SilentAlarm {
    fn ring(&self) -> Result<(), AlarmError> {
        Ok(())
    }
}

/// Alarm that only counts how often it rang. Clones share the counter.
#[derive(Debug, Clone, Default)]
pub struct CountingAlarm {
    rings: Arc<AtomicUsize>,
}

impl CountingAlarm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.rings.load(Ordering::SeqCst)
    }
}

impl Alarm for CountingAlarm {
    fn ring(&self) -> Result<(), AlarmError> {
        self.rings.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
