use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "tt",
    about = concat!(
        "[>] tasktree v",
        env!("CARGO_PKG_VERSION"),
        " - nested tasks with countdown timers"
    ),
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Use a different data directory
    #[arg(short = 'C', long = "data-dir", global = true)]
    pub data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the task tree, optionally filtered
    List(ListArgs),
    /// Show task details
    Show(ShowArgs),
    /// Create a task (at the root, or under --parent)
    Add(AddArgs),
    /// Change title, description or due date
    Edit(EditArgs),
    /// Change task status
    Status(StatusArgs),
    /// Delete a task and all of its subtasks
    Rm(RmArgs),
    /// Start, pause, reset or configure a task's countdown
    #[command(subcommand)]
    Timer(TimerCmd),
    /// Run timers headless, ringing the bell on expiry
    Run(RunArgs),
    /// Print the effective configuration
    Config(ConfigArgs),
}

// ---------------------------------------------------------------------------
// Read command args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct ListArgs {
    /// Only show tasks whose title or description contains this text
    /// (ancestors of matches are kept)
    #[arg(short, long)]
    pub filter: Option<String>,
    /// Hide the summary footer
    #[arg(long)]
    pub no_stats: bool,
}

#[derive(Args)]
pub struct ShowArgs {
    /// Task ID to show
    pub id: String,
    /// Include ancestor context (parent chain)
    #[arg(long)]
    pub context: bool,
}

// ---------------------------------------------------------------------------
// Write command args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct AddArgs {
    /// Task title (default: "Nuovo Task")
    pub title: Option<String>,
    /// Add as the last subtask of this task
    #[arg(short, long)]
    pub parent: Option<String>,
    /// Description text
    #[arg(short, long)]
    pub desc: Option<String>,
    /// Due date: today, tomorrow, "in 3d", or YYYY-MM-DD
    #[arg(long)]
    pub due: Option<String>,
    /// Timer length: a preset ("25 min"), h:m:s, m:s, seconds, or 1h30m
    #[arg(long)]
    pub timer: Option<String>,
}

#[derive(Args)]
pub struct EditArgs {
    /// Task ID
    pub id: String,
    /// New title
    #[arg(long)]
    pub title: Option<String>,
    /// New description
    #[arg(long)]
    pub desc: Option<String>,
    /// New due date: today, tomorrow, "in 3d", or YYYY-MM-DD
    #[arg(long)]
    pub due: Option<String>,
}

#[derive(Args)]
pub struct StatusArgs {
    /// Task ID
    pub id: String,
    /// New status (not-started, preparing, in-progress, completed)
    pub status: String,
}

#[derive(Args)]
pub struct RmArgs {
    /// Task ID
    pub id: String,
}

#[derive(Subcommand)]
pub enum TimerCmd {
    /// Start or pause; a finished timer restarts from its full length
    Toggle(TimerIdArgs),
    /// Rewind to the full length and stop
    Reset(TimerIdArgs),
    /// Set a new length (stops the timer)
    Set(TimerSetArgs),
    /// List the duration presets
    Presets,
}

#[derive(Args)]
pub struct TimerIdArgs {
    /// Task ID
    pub id: String,
}

#[derive(Args)]
pub struct TimerSetArgs {
    /// Task ID
    pub id: String,
    /// A preset ("25 min", "1 h"), h:m:s, m:s, seconds, or 1h30m
    pub duration: String,
}

// ---------------------------------------------------------------------------
// Runner / config args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct RunArgs {
    /// Stop after this many seconds (default: run until no timer is running)
    #[arg(long)]
    pub seconds: Option<u64>,
    /// Keep running even when no timer is running
    #[arg(long)]
    pub forever: bool,
}

#[derive(Args)]
pub struct ConfigArgs {
    /// Write a default config.toml if none exists
    #[arg(long)]
    pub init: bool,
}
