use crate::drag::{ActivationConstraint, InputKind, Sensors};
use crate::model::{Board, BoardError};
use anyhow::{bail, Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

const PROJECT_DIR: &str = ".dragboard";
const CONFIG_FILE: &str = "config.yml";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub columns: Vec<ColumnConfig>,
    pub drag: DragConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ColumnConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tasks: Vec<SeedTask>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SeedTask {
    pub title: String,
    pub description: String,
}

/// Activation thresholds are in terminal cells.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct DragConfig {
    pub input: InputKind,
    pub pointer_distance: u16,
    pub touch_delay_ms: u64,
    pub touch_tolerance: u16,
    pub drop_animation_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigScope {
    Explicit,
    Project,
    Global,
    Builtin,
}

#[derive(Debug, Clone)]
pub struct ConfigLocation {
    pub path: Option<PathBuf>,
    pub scope: ConfigScope,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            columns: vec![
                ColumnConfig {
                    name: "To Do".into(),
                    tasks: vec![
                        SeedTask {
                            title: "Learn NextJS".into(),
                            description: "Watch youtube courses".into(),
                        },
                        SeedTask {
                            title: "Learn Python".into(),
                            description: "Watch datacamp courses".into(),
                        },
                    ],
                },
                ColumnConfig {
                    name: "In Progress".into(),
                    tasks: Vec::new(),
                },
                ColumnConfig {
                    name: "Done".into(),
                    tasks: Vec::new(),
                },
            ],
            drag: DragConfig::default(),
        }
    }
}

impl Default for DragConfig {
    fn default() -> Self {
        DragConfig {
            input: InputKind::Pointer,
            pointer_distance: 5,
            touch_delay_ms: 250,
            touch_tolerance: 5,
            drop_animation_ms: 250,
        }
    }
}

impl Config {
    /// Fresh board with the configured columns and seed tasks.
    pub fn build_board(&self) -> Result<Board, BoardError> {
        let mut board = Board::new(self.columns.iter().map(|c| c.name.clone()))?;
        for column in &self.columns {
            for seed in &column.tasks {
                board.add_task(&column.name, seed.title.clone(), seed.description.clone())?;
            }
        }
        Ok(board)
    }
}

impl DragConfig {
    pub fn sensors(&self) -> Sensors {
        Sensors {
            pointer: ActivationConstraint::Distance(f64::from(self.pointer_distance)),
            touch: ActivationConstraint::Delay {
                delay: Duration::from_millis(self.touch_delay_ms),
                tolerance: f64::from(self.touch_tolerance),
            },
        }
    }

    pub fn drop_animation(&self) -> Duration {
        Duration::from_millis(self.drop_animation_ms)
    }
}

impl ConfigScope {
    pub fn label(&self) -> &'static str {
        match self {
            ConfigScope::Explicit => "explicit",
            ConfigScope::Project => "project",
            ConfigScope::Global => "global",
            ConfigScope::Builtin => "built-in",
        }
    }
}

pub fn init_project_config(start: &Path, force: bool) -> Result<PathBuf> {
    let dir = start.join(PROJECT_DIR);
    fs::create_dir_all(&dir).with_context(|| format!("creating {:?}", dir))?;
    let path = dir.join(CONFIG_FILE);
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    save_config(&path, &Config::default())?;
    Ok(path)
}

pub fn locate_config(explicit: Option<&Path>, start: &Path) -> ConfigLocation {
    if let Some(path) = explicit {
        return ConfigLocation {
            path: Some(path.to_path_buf()),
            scope: ConfigScope::Explicit,
        };
    }
    if let Some(path) = find_project_config(start) {
        return ConfigLocation {
            path: Some(path),
            scope: ConfigScope::Project,
        };
    }
    if let Some(path) = global_config_path().filter(|p| p.exists()) {
        return ConfigLocation {
            path: Some(path),
            scope: ConfigScope::Global,
        };
    }
    ConfigLocation {
        path: None,
        scope: ConfigScope::Builtin,
    }
}

pub fn load_config(location: &ConfigLocation) -> Result<Config> {
    let Some(path) = &location.path else {
        debug!("no config file found, using built-in defaults");
        return Ok(Config::default());
    };
    let data = fs::read_to_string(path).with_context(|| format!("reading {:?}", path))?;
    let config: Config =
        serde_yaml::from_str(&data).with_context(|| format!("parsing {:?}", path))?;
    debug!(path = %path.display(), columns = config.columns.len(), "loaded config");
    if config.columns.is_empty() {
        warn!(path = %path.display(), "config defines no columns");
    }
    Ok(config)
}

pub fn save_config(path: &Path, config: &Config) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("creating {:?}", parent))?;
    }
    let serialized = serde_yaml::to_string(config).context("serializing config")?;
    fs::write(path, serialized).with_context(|| format!("writing {:?}", path))?;
    Ok(())
}

pub fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "dragboard")
}

fn find_project_config(start: &Path) -> Option<PathBuf> {
    let mut dir = Some(start);
    while let Some(current) = dir {
        let candidate = current.join(PROJECT_DIR).join(CONFIG_FILE);
        if candidate.exists() {
            return Some(candidate);
        }
        dir = current.parent();
    }
    None
}

fn global_config_path() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ids;
    use rstest::rstest;

    #[rstest]
    fn default_board_has_three_columns_and_two_seeds() {
        let board = Config::default().build_board().expect("default is valid");
        let names = board
            .columns()
            .iter()
            .map(|c| c.name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(names, ["To Do", "In Progress", "Done"]);
        assert_eq!(board.column("To Do").map(|c| c.len()), Some(2));
        assert_eq!(board.task_count(), 2);
        let todo = ids(&board, "To Do");
        assert_ne!(todo[0], todo[1]);
    }

    #[rstest]
    fn partial_yaml_falls_back_to_defaults() {
        let yaml = r#"
columns:
  - name: Backlog
  - name: Shipped
    tasks:
      - title: a
        description: b
drag:
  pointer_distance: 2
"#;
        let config: Config = serde_yaml::from_str(yaml).expect("valid yaml");
        assert_eq!(config.columns.len(), 2);
        assert!(config.columns[0].tasks.is_empty());
        assert_eq!(config.drag.pointer_distance, 2);
        assert_eq!(config.drag.touch_delay_ms, 250);
        assert_eq!(config.drag.input, InputKind::Pointer);
        assert_eq!(config.drag.drop_animation(), Duration::from_millis(250));

        let board = config.build_board().expect("valid columns");
        assert_eq!(board.task_count(), 1);
        let shipped = ids(&board, "Shipped");
        assert_eq!(
            board.find_task(&shipped[0]).map(|t| t.title.as_str()),
            Some("a")
        );
    }

    #[rstest]
    fn duplicate_columns_are_rejected() {
        let config: Config =
            serde_yaml::from_str("columns:\n  - name: A\n  - name: A\n").expect("valid yaml");
        assert_eq!(
            config.build_board(),
            Err(BoardError::DuplicateContainer("A".into()))
        );
    }

    #[rstest]
    fn sensors_follow_drag_config() {
        let sensors = DragConfig {
            input: InputKind::Touch,
            pointer_distance: 3,
            touch_delay_ms: 400,
            touch_tolerance: 2,
            drop_animation_ms: 0,
        }
        .sensors();
        assert_eq!(sensors.pointer, ActivationConstraint::Distance(3.0));
        assert_eq!(
            sensors.touch,
            ActivationConstraint::Delay {
                delay: Duration::from_millis(400),
                tolerance: 2.0
            }
        );
    }

    #[rstest]
    fn project_config_is_found_from_nested_dir() {
        let root = tempfile::tempdir().expect("tempdir");
        let path = init_project_config(root.path(), false).expect("init");
        assert!(init_project_config(root.path(), false).is_err());
        init_project_config(root.path(), true).expect("forced init");

        let nested = root.path().join("a").join("b");
        fs::create_dir_all(&nested).expect("mkdir");
        let location = locate_config(None, &nested);
        assert_eq!(location.scope, ConfigScope::Project);
        assert_eq!(location.path.as_deref(), Some(path.as_path()));
        assert_eq!(load_config(&location).expect("load"), Config::default());
    }

    #[rstest]
    fn explicit_path_wins_and_must_exist() {
        let root = tempfile::tempdir().expect("tempdir");
        init_project_config(root.path(), false).expect("init");
        let missing = root.path().join("missing.yml");
        let location = locate_config(Some(&missing), root.path());
        assert_eq!(location.scope, ConfigScope::Explicit);
        assert!(load_config(&location).is_err());
    }
}
