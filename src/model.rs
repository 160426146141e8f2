use rand::{distributions::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub type TaskId = String;

const ID_LEN: usize = 8;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    tasks: Vec<Task>,
}

/// Owns the container -> ordered tasks mapping. Column order is the
/// left-to-right order on screen, task order is top-to-bottom.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Board {
    columns: Vec<Column>,
}

/// Identity of something that can be dropped onto. Container names and task
/// ids live in separate namespaces here even though both are strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DropId {
    Container(String),
    Task(TaskId),
}

/// A [`DropId`] resolved against the current board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropTarget {
    Container {
        name: String,
    },
    Task {
        id: TaskId,
        container: String,
        index: usize,
    },
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum BoardError {
    #[error("container not found: {0}")]
    ContainerNotFound(String),
    #[error("task {task} not found in container {container}")]
    TaskNotFound { task: TaskId, container: String },
    #[error("index {index} out of range for container {container} (len {len})")]
    IndexOutOfRange {
        container: String,
        index: usize,
        len: usize,
    },
    #[error("duplicate container name: {0}")]
    DuplicateContainer(String),
    #[error("container name must not be empty")]
    EmptyContainerName,
}

impl Column {
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

impl DropTarget {
    pub fn container(&self) -> &str {
        match self {
            DropTarget::Container { name } => name,
            DropTarget::Task { container, .. } => container,
        }
    }
}

impl Board {
    pub fn new<I, S>(names: I) -> Result<Self, BoardError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut columns: Vec<Column> = Vec::new();
        for name in names {
            let name = name.into();
            if name.trim().is_empty() {
                return Err(BoardError::EmptyContainerName);
            }
            if columns.iter().any(|c| c.name == name) {
                return Err(BoardError::DuplicateContainer(name));
            }
            columns.push(Column {
                name,
                tasks: Vec::new(),
            });
        }
        Ok(Board { columns })
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn task_count(&self) -> usize {
        self.columns.iter().map(Column::len).sum()
    }

    pub fn find_task(&self, id: &str) -> Option<&Task> {
        self.columns
            .iter()
            .flat_map(|c| c.tasks.iter())
            .find(|t| t.id == id)
    }

    /// Container holding `key`. A container name resolves to itself so that
    /// hovering an empty column and hovering a card go through the same lookup.
    pub fn find_container(&self, key: &str) -> Option<&str> {
        if let Some(column) = self.column(key) {
            return Some(&column.name);
        }
        self.columns
            .iter()
            .find(|c| c.tasks.iter().any(|t| t.id == key))
            .map(|c| c.name.as_str())
    }

    pub fn index_of(&self, container: &str, task_id: &str) -> Option<usize> {
        self.column(container)?
            .tasks
            .iter()
            .position(|t| t.id == task_id)
    }

    pub fn resolve(&self, id: &DropId) -> Option<DropTarget> {
        match id {
            DropId::Container(name) => self.column(name).map(|c| DropTarget::Container {
                name: c.name.clone(),
            }),
            DropId::Task(task_id) => self.columns.iter().find_map(|c| {
                c.tasks
                    .iter()
                    .position(|t| &t.id == task_id)
                    .map(|index| DropTarget::Task {
                        id: task_id.clone(),
                        container: c.name.clone(),
                        index,
                    })
            }),
        }
    }

    /// Removes the task at `from` and reinserts it at `to`. Out of range
    /// indices leave the container untouched.
    pub fn move_within_container(
        &mut self,
        container: &str,
        from: usize,
        to: usize,
    ) -> Result<(), BoardError> {
        let column = self.column_mut(container)?;
        let len = column.tasks.len();
        for index in [from, to] {
            if index >= len {
                return Err(BoardError::IndexOutOfRange {
                    container: container.to_string(),
                    index,
                    len,
                });
            }
        }
        if from != to {
            let task = column.tasks.remove(from);
            column.tasks.insert(to, task);
        }
        Ok(())
    }

    /// Moves `task_id` from `from` into `to` at `index`, clamped to the
    /// destination length. Returns the index the task landed at.
    pub fn move_across_containers(
        &mut self,
        task_id: &str,
        from: &str,
        to: &str,
        index: usize,
    ) -> Result<usize, BoardError> {
        let src = self.column_index(from)?;
        let dest = self.column_index(to)?;
        let pos = self.columns[src]
            .tasks
            .iter()
            .position(|t| t.id == task_id)
            .ok_or_else(|| BoardError::TaskNotFound {
                task: task_id.to_string(),
                container: from.to_string(),
            })?;
        let task = self.columns[src].tasks.remove(pos);
        let target = &mut self.columns[dest].tasks;
        let index = index.min(target.len());
        target.insert(index, task);
        Ok(index)
    }

    /// Appends a new task with a fresh id to the end of `container`.
    pub fn add_task(
        &mut self,
        container: &str,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Result<TaskId, BoardError> {
        let idx = self.column_index(container)?;
        let id = self.generate_id();
        self.columns[idx].tasks.push(Task {
            id: id.clone(),
            title: title.into(),
            description: description.into(),
        });
        Ok(id)
    }

    fn column_index(&self, name: &str) -> Result<usize, BoardError> {
        self.columns
            .iter()
            .position(|c| c.name == name)
            .ok_or_else(|| BoardError::ContainerNotFound(name.to_string()))
    }

    fn column_mut(&mut self, name: &str) -> Result<&mut Column, BoardError> {
        let idx = self.column_index(name)?;
        Ok(&mut self.columns[idx])
    }

    fn generate_id(&self) -> TaskId {
        let taken: HashSet<&str> = self
            .columns
            .iter()
            .flat_map(|c| c.tasks.iter().map(|t| t.id.as_str()))
            .collect();
        loop {
            let id: String = rand::thread_rng()
                .sample_iter(&Alphanumeric)
                .take(ID_LEN)
                .map(char::from)
                .collect();
            if !taken.contains(id.as_str()) && self.column(&id).is_none() {
                return id;
            }
        }
    }
}

/// Builds a board whose task ids double as titles, e.g.
/// `test_board(&[("A", &["t1", "t2"]), ("B", &[])])`.
#[cfg(test)]
pub(crate) fn test_board(columns: &[(&str, &[&str])]) -> Board {
    Board {
        columns: columns
            .iter()
            .map(|(name, ids)| Column {
                name: name.to_string(),
                tasks: ids
                    .iter()
                    .map(|id| Task {
                        id: id.to_string(),
                        title: id.to_string(),
                        description: format!("{} description", id),
                    })
                    .collect(),
            })
            .collect(),
    }
}

#[cfg(test)]
pub(crate) fn ids(board: &Board, container: &str) -> Vec<String> {
    board
        .column(container)
        .map(|c| c.tasks().iter().map(|t| t.id.clone()).collect())
        .unwrap_or_default()
}

#[cfg(test)]
pub(crate) fn assert_unique(board: &Board) {
    let mut seen = HashSet::new();
    for column in board.columns() {
        for task in column.tasks() {
            assert!(seen.insert(task.id.clone()), "duplicate task {}", task.id);
        }
    }
}
