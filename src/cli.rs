use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "dragboard",
    version,
    about = "Terminal kanban board with mouse drag-and-drop"
)]
pub struct Cli {
    /// Config file to use instead of the discovered one
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// Where the TUI writes its log
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,
    /// Raise log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Write a default board config to ./.dragboard/config.yml
    Init {
        /// Overwrite an existing config
        #[arg(long)]
        force: bool,
    },
    /// Print the effective config and where it came from
    Config,
    /// Launch the interactive board
    Tui,
}
