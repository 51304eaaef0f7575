mod run;
pub use run::{RunOptions, run_headless};

use chrono::{Local, Utc};

use crate::cli::commands::*;
use crate::cli::output::*;
use crate::context::Context;
use crate::io::config_io;
use crate::io::kv::FileKv;
use crate::model::task::{TaskId, TaskPatch};
use crate::ops::filter::filter_tasks;
use crate::ops::timer::{PRESETS, format_time, parse_timer_input};
use crate::ops::tree;
use crate::store::TaskStore;
use crate::util::dates::normalize_due;

type CmdResult = Result<(), Box<dyn std::error::Error>>;

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn dispatch(ctx: &Context, command: Commands, json: bool) -> CmdResult {
    match command {
        // Read commands
        Commands::List(args) => cmd_list(ctx, args, json),
        Commands::Show(args) => cmd_show(ctx, args, json),

        // Write commands
        Commands::Add(args) => cmd_add(ctx, args, json),
        Commands::Edit(args) => cmd_edit(ctx, args),
        Commands::Status(args) => cmd_status(ctx, args),
        Commands::Rm(args) => cmd_rm(ctx, args),
        Commands::Timer(cmd) => cmd_timer(ctx, cmd, json),

        // Runner / config
        Commands::Run(args) => cmd_run(ctx, args, json),
        Commands::Config(args) => cmd_config(ctx, args),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn open_store(ctx: &Context) -> Result<TaskStore<FileKv>, Box<dyn std::error::Error>> {
    Ok(ctx.open_store()?)
}

fn not_found(id: &str) -> Box<dyn std::error::Error> {
    format!("task not found: {}", id).into()
}

fn parse_due_arg(input: &str) -> Result<String, Box<dyn std::error::Error>> {
    normalize_due(input).ok_or_else(|| {
        format!(
            "invalid due date '{}' (expected: today, tomorrow, \"in 3d\", or YYYY-MM-DD)",
            input
        )
        .into()
    })
}

fn today() -> chrono::NaiveDate {
    Local::now().date_naive()
}

// ---------------------------------------------------------------------------
// Read commands
// ---------------------------------------------------------------------------

fn cmd_list(ctx: &Context, args: ListArgs, json: bool) -> CmdResult {
    let store = open_store(ctx)?;
    let query = args.filter.as_deref().unwrap_or("");
    let visible = filter_tasks(store.tasks(), query);
    let stats = store.stats();

    if json {
        let out = ListJson {
            tasks: &visible,
            stats: stats_to_json(&stats),
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    if visible.is_empty() {
        if query.trim().is_empty() {
            println!("no tasks");
        } else {
            println!("no tasks match '{}'", query.trim());
        }
    } else {
        for line in format_tree(&visible, today()) {
            println!("{}", line);
        }
    }
    if !args.no_stats && !store.tasks().is_empty() {
        println!();
        println!("{}", format_stats(&stats));
    }
    Ok(())
}

fn cmd_show(ctx: &Context, args: ShowArgs, json: bool) -> CmdResult {
    let store = open_store(ctx)?;
    let id = TaskId::from(args.id.as_str());
    let task = store.find(&id).ok_or_else(|| not_found(&args.id))?;
    let ancestors: Vec<_> = tree::ancestors_of(store.tasks(), &id)
        .unwrap_or_default()
        .iter()
        .filter_map(|aid| store.find(aid))
        .collect();

    if json {
        let out = ShowJson {
            task,
            ancestors: ancestors
                .iter()
                .map(|a| AncestorJson {
                    id: a.id.to_string(),
                    title: a.title.clone(),
                })
                .collect(),
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else if args.context {
        for line in format_task_detail_with_context(&ancestors, task, today()) {
            println!("{}", line);
        }
    } else {
        for line in format_task_detail(task, today()) {
            println!("{}", line);
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Write commands
// ---------------------------------------------------------------------------

fn cmd_add(ctx: &Context, args: AddArgs, json: bool) -> CmdResult {
    let mut patch = TaskPatch {
        title: args.title,
        description: args.desc,
        ..Default::default()
    };
    if let Some(due) = &args.due {
        patch.due_date = Some(parse_due_arg(due)?);
    }
    if let Some(timer) = &args.timer {
        let secs = parse_timer_input(timer)?;
        patch.timer_duration = Some(secs);
        patch.timer_remaining = Some(secs);
    }

    let mut store = open_store(ctx)?;
    let parent = args.parent.as_deref().map(TaskId::from);
    let created = store
        .create_task_with(parent.as_ref(), &patch, Utc::now())?
        .ok_or_else(|| not_found(args.parent.as_deref().unwrap_or_default()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&created)?);
    } else {
        println!("{}", created.id);
    }
    Ok(())
}

fn cmd_edit(ctx: &Context, args: EditArgs) -> CmdResult {
    let mut patch = TaskPatch {
        title: args.title,
        description: args.desc,
        ..Default::default()
    };
    if let Some(due) = &args.due {
        patch.due_date = Some(parse_due_arg(due)?);
    }
    if patch.is_empty() {
        return Err("nothing to change (use --title, --desc or --due)".into());
    }

    let mut store = open_store(ctx)?;
    let id = TaskId::from(args.id.as_str());
    if !store.update_task(&id, &patch)? {
        return Err(not_found(&args.id));
    }
    println!("{}", id);
    Ok(())
}

fn cmd_status(ctx: &Context, args: StatusArgs) -> CmdResult {
    let status = parse_task_status(&args.status).map_err(Box::<dyn std::error::Error>::from)?;
    let mut store = open_store(ctx)?;
    let id = TaskId::from(args.id.as_str());
    if !store.change_status(&id, status)? {
        return Err(not_found(&args.id));
    }
    println!("{} → {}", id, status);
    Ok(())
}

fn cmd_rm(ctx: &Context, args: RmArgs) -> CmdResult {
    let mut store = open_store(ctx)?;
    let id = TaskId::from(args.id.as_str());
    let removed = store.delete_task(&id)?.ok_or_else(|| not_found(&args.id))?;
    let n = removed.subtree_len();
    if n == 1 {
        println!("deleted {}", id);
    } else {
        println!("deleted {} and {} subtasks", id, n - 1);
    }
    Ok(())
}

fn cmd_timer(ctx: &Context, cmd: TimerCmd, json: bool) -> CmdResult {
    let (raw_id, applied, store) = match cmd {
        TimerCmd::Presets => {
            if json {
                println!("{}", serde_json::to_string_pretty(&presets_to_json())?);
            } else {
                for (label, secs) in PRESETS {
                    println!("{:<7} {}", label, format_time(secs));
                }
            }
            return Ok(());
        }
        TimerCmd::Toggle(args) => {
            let mut store = open_store(ctx)?;
            let applied = store.toggle_timer(&TaskId::from(args.id.as_str()))?;
            (args.id, applied, store)
        }
        TimerCmd::Reset(args) => {
            let mut store = open_store(ctx)?;
            let applied = store.reset_timer(&TaskId::from(args.id.as_str()))?;
            (args.id, applied, store)
        }
        TimerCmd::Set(args) => {
            let secs = parse_timer_input(&args.duration)?;
            let mut store = open_store(ctx)?;
            let applied = store.set_timer_duration(&TaskId::from(args.id.as_str()), secs)?;
            (args.id, applied, store)
        }
    };
    if !applied {
        return Err(not_found(&raw_id));
    }

    let id = TaskId::from(raw_id.as_str());
    let task = store.find(&id).ok_or_else(|| not_found(&raw_id))?;
    if json {
        println!("{}", serde_json::to_string_pretty(task)?);
    } else {
        let state = if task.is_timer_running {
            "running"
        } else {
            "stopped"
        };
        println!(
            "{} {} {} / {}",
            id,
            state,
            format_time(task.timer_remaining),
            format_time(task.timer_duration)
        );
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Runner / config
// ---------------------------------------------------------------------------

fn cmd_run(ctx: &Context, args: RunArgs, json: bool) -> CmdResult {
    let store = open_store(ctx)?;
    let opts = RunOptions {
        seconds: args.seconds,
        forever: args.forever,
        json,
    };
    let mut out = std::io::stdout();
    run_headless(store, &opts, &mut out)?;
    Ok(())
}

fn cmd_config(ctx: &Context, args: ConfigArgs) -> CmdResult {
    if args.init {
        let path = ctx.data_dir.join(config_io::CONFIG_FILE);
        if config_io::write_config_if_missing(&ctx.data_dir, &ctx.config)? {
            println!("wrote {}", path.display());
        } else {
            println!("{} already exists", path.display());
        }
        return Ok(());
    }
    println!("# data dir: {}", ctx.data_dir.display());
    print!("{}", config_io::config_to_toml(&ctx.config)?);
    Ok(())
}
