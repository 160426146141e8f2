use crate::config::{init_project_config, load_config, locate_config, Config, ConfigLocation};
use crate::ui;
use anyhow::{Context, Result};
use std::env;
use std::path::Path;
use tracing::info;

pub fn init(force: bool) -> Result<()> {
    let cwd = env::current_dir()?;
    let path = init_project_config(&cwd, force)?;
    println!("Wrote default config to {}", path.display());
    Ok(())
}

pub fn show_config(explicit: Option<&Path>) -> Result<()> {
    let (config, location) = load_current_config(explicit)?;
    match &location.path {
        Some(path) => println!("# {} config: {}", location.scope.label(), path.display()),
        None => println!("# {} config", location.scope.label()),
    }
    let yaml = serde_yaml::to_string(&config).context("serializing config")?;
    print!("{}", yaml);
    Ok(())
}

pub fn tui(explicit: Option<&Path>) -> Result<()> {
    let (config, location) = load_current_config(explicit)?;
    let board = config
        .build_board()
        .context("building board from config")?;
    info!(
        scope = location.scope.label(),
        columns = board.columns().len(),
        tasks = board.task_count(),
        "starting board"
    );
    ui::run(board, &config.drag, location)
}

fn load_current_config(explicit: Option<&Path>) -> Result<(Config, ConfigLocation)> {
    let cwd = env::current_dir()?;
    let location = locate_config(explicit, &cwd);
    let config = load_config(&location)?;
    Ok((config, location))
}
