use std::path::PathBuf;

use thiserror::Error;

use crate::board::BoardError;
use crate::config::ConfigError;
use crate::lock::LockError;
use crate::project::ProjectError;
use crate::status::{Status, StatusError, TransitionError};
use crate::store::StoreError;
use crate::template::TemplateError;
use crate::wbs::{AllocError, Wbs, WbsError};

#[derive(Debug, Error)]
pub enum TasksError {
    #[error("Please provide a task name.")]
    MissingName,
    #[error("Task name must be a single line without control characters: '{0}'")]
    InvalidName(String),
    #[error("Task name too long ({len} characters, max {max})")]
    NameTooLong { len: usize, max: usize },
    #[error("Please provide a requirement to decompose.")]
    MissingRequirement,
    #[error("Start WBS {start} is below the next free id {next}")]
    StartBelowSequence { start: Wbs, next: Wbs },
    #[error("Stage '{0}' not found in kanban board.")]
    SectionMissing(Status),
    #[error(transparent)]
    Project(#[from] ProjectError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Wbs(#[from] WbsError),
    #[error(transparent)]
    Alloc(#[from] AllocError),
    #[error(transparent)]
    Status(#[from] StatusError),
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error(transparent)]
    Board(#[from] BoardError),
    #[error(transparent)]
    Lock(#[from] LockError),
    #[error("Failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl TasksError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        TasksError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, TasksError>;
