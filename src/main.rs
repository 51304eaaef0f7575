use clap::Parser;
use tasktree::cli::commands::Cli;
use tasktree::cli::handlers;
use tasktree::context::Context;
use tasktree::logging::{self, LogTarget};

fn main() {
    let cli = Cli::parse();

    let ctx = match Context::load(cli.data_dir.as_deref()) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(1);
        }
    };

    match cli.command {
        None => {
            // No subcommand → launch TUI
            logging::init(LogTarget::File(&ctx.data_dir), &ctx.config.log.level);
            if let Err(e) = tasktree::tui::run(&ctx) {
                eprintln!("error: {}", e);
                std::process::exit(1);
            }
        }
        Some(command) => {
            logging::init(LogTarget::Stderr, &ctx.config.log.level);
            if let Err(e) = handlers::dispatch(&ctx, command, cli.json) {
                eprintln!("error: {}", e);
                std::process::exit(1);
            }
        }
    }
}
