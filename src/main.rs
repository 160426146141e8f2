mod cli;
mod collision;
mod commands;
mod config;
mod drag;
mod layout;
mod logging;
mod model;
mod ui;

use anyhow::Result;
use clap::Parser;
use logging::LogTarget;

fn main() -> Result<()> {
    let args = cli::Cli::parse();
    let command = args.command.unwrap_or(cli::Command::Tui);
    let log_target = match command {
        cli::Command::Tui => args
            .log_file
            .or_else(logging::default_log_path)
            .map(LogTarget::File),
        _ => Some(LogTarget::Stderr),
    };
    if let Some(target) = log_target {
        logging::init(target, args.verbose)?;
    }

    let config = args.config.as_deref();
    match command {
        cli::Command::Init { force } => commands::init(force),
        cli::Command::Config => commands::show_config(config),
        cli::Command::Tui => commands::tui(config),
    }
}
