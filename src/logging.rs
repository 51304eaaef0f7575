use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Environment variable holding a filter directive, e.g. `tasktree=debug`
pub const LOG_ENV: &str = "TASKTREE_LOG";

/// Log file written by the TUI, inside the data directory
pub const LOG_FILE: &str = "tasktree.log";

/// Where log lines go
pub enum LogTarget<'a> {
    Stderr,
    /// Append to `tasktree.log` in this directory (the terminal is in raw mode)
    File(&'a Path),
}

/// Filter from `TASKTREE_LOG`, falling back to `default_level`.
fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("warn"))
}

/// Install the global subscriber. Safe to call more than once; later calls
/// are ignored.
pub fn init(target: LogTarget<'_>, default_level: &str) {
    let filter = env_filter(default_level);
    match target {
        LogTarget::Stderr => {
            let _ = tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .try_init();
        }
        LogTarget::File(dir) => {
            let file = fs::create_dir_all(dir).and_then(|_| {
                OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(dir.join(LOG_FILE))
            });
            match file {
                Ok(file) => {
                    let _ = tracing_subscriber::registry()
                        .with(filter)
                        .with(
                            tracing_subscriber::fmt::layer()
                                .with_ansi(false)
                                .with_writer(Mutex::new(file)),
                        )
                        .try_init();
                }
                // No log file, no logging: writing to the raw-mode terminal
                // would corrupt the display.
                Err(e) => eprintln!("warning: could not open log file: {e}"),
            }
        }
    }
}
