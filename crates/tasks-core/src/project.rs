use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::{load_config, ConfigError, TasksConfig};
use crate::store::RecordStore;
use crate::wbs::sequence_path;

pub const BOARD_FILE: &str = ".kanban.md";
pub const TEMPLATE_FILE: &str = ".template.md";
pub const LOCK_FILE: &str = ".lock";

/// Marker identifying a project root.
pub const PROJECT_MARKER: &str = ".git";

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("Not in a git repository: {}. Run from inside a project or pass --root.", .0.display())]
    NotAProject(PathBuf),
    #[error("Kanban board not found: {}. Run 'tasks init' first.", .0.display())]
    BoardMissing(PathBuf),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Nearest ancestor of `start` (inclusive) carrying the project marker.
pub fn find_project_root(start: &Path) -> Result<PathBuf, ProjectError> {
    let start = start.canonicalize().unwrap_or_else(|_| start.to_path_buf());
    start
        .ancestors()
        .find(|candidate| candidate.join(PROJECT_MARKER).exists())
        .map(Path::to_path_buf)
        .ok_or(ProjectError::NotAProject(start))
}

/// Every on-disk location the tool touches, resolved once per invocation.
#[derive(Debug, Clone)]
pub struct ProjectPaths {
    pub root: PathBuf,
    pub records_dir: PathBuf,
    pub board_file: PathBuf,
    pub template_file: PathBuf,
    pub config: TasksConfig,
}

impl ProjectPaths {
    /// Locate the project root above `start` and load its config.
    pub fn resolve(start: &Path) -> Result<Self, ProjectError> {
        let root = find_project_root(start)?;
        let config = load_config(&root)?;
        Ok(Self::from_config(root, config))
    }

    pub fn from_config(root: PathBuf, config: TasksConfig) -> Self {
        let records_dir = root.join(config.docs_dir.trim());
        Self {
            board_file: records_dir.join(BOARD_FILE),
            template_file: records_dir.join(TEMPLATE_FILE),
            records_dir,
            root,
            config,
        }
    }

    pub fn store(&self) -> RecordStore {
        RecordStore::new(&self.records_dir)
    }

    pub fn lock_file(&self) -> PathBuf {
        self.records_dir.join(LOCK_FILE)
    }

    pub fn sequence_file(&self) -> PathBuf {
        sequence_path(&self.store())
    }

    pub fn require_board(&self) -> Result<(), ProjectError> {
        if self.board_file.is_file() {
            Ok(())
        } else {
            Err(ProjectError::BoardMissing(self.board_file.clone()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn find_project_root_walks_up_to_git_marker() {
        let temp = TempDir::new().expect("tempdir");
        std::fs::create_dir(temp.path().join(".git")).expect("git");
        let nested = temp.path().join("src").join("deep");
        std::fs::create_dir_all(&nested).expect("nested");

        let root = find_project_root(&nested).expect("root");
        let expected = temp.path().canonicalize().expect("canonical");
        assert_eq!(root, expected);
    }

    #[test]
    fn find_project_root_errors_outside_project() {
        let temp = TempDir::new().expect("tempdir");
        // A TempDir may itself live inside a repository; only assert when it does not.
        let outcome = find_project_root(temp.path());
        if temp.path().ancestors().all(|dir| !dir.join(".git").exists()) {
            assert!(matches!(outcome, Err(ProjectError::NotAProject(_))));
        }
    }

    #[test]
    fn paths_follow_docs_dir() {
        let config = TasksConfig {
            docs_dir: "planning".to_string(),
            ..TasksConfig::default()
        };
        let paths = ProjectPaths::from_config(PathBuf::from("/repo"), config);
        assert_eq!(paths.records_dir, PathBuf::from("/repo/planning"));
        assert_eq!(paths.board_file, PathBuf::from("/repo/planning/.kanban.md"));
        assert_eq!(paths.template_file, PathBuf::from("/repo/planning/.template.md"));
        assert_eq!(paths.lock_file(), PathBuf::from("/repo/planning/.lock"));
        assert_eq!(paths.sequence_file(), PathBuf::from("/repo/planning/.sequence"));
    }
}
