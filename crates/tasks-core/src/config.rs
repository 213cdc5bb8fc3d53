use std::fs;
use std::path::{Component, Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

pub const CONFIG_FILE: &str = ".tasks.toml";
pub const DEFAULT_DOCS_DIR: &str = "docs/prompts";
pub const DEFAULT_PAGER: &str = "glow";
pub const DEFAULT_MAX_NAME_LENGTH: usize = 200;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("docs_dir must be a relative path inside the project: {0}")]
    InvalidDocsDir(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TasksConfig {
    /// Records directory, relative to the project root.
    pub docs_dir: String,
    /// Program used to render the board for `list`. Empty prints directly.
    pub pager: String,
    /// Longest accepted task name, in characters.
    pub max_name_length: usize,
}

impl Default for TasksConfig {
    fn default() -> Self {
        Self {
            docs_dir: DEFAULT_DOCS_DIR.to_string(),
            pager: DEFAULT_PAGER.to_string(),
            max_name_length: DEFAULT_MAX_NAME_LENGTH,
        }
    }
}

impl TasksConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let docs_dir = Path::new(self.docs_dir.trim());
        let escapes = docs_dir
            .components()
            .any(|component| !matches!(component, Component::Normal(_) | Component::CurDir));
        if self.docs_dir.trim().is_empty() || escapes {
            return Err(ConfigError::InvalidDocsDir(self.docs_dir.clone()));
        }
        Ok(())
    }
}

pub fn config_path(project_root: &Path) -> PathBuf {
    project_root.join(CONFIG_FILE)
}

/// Load `.tasks.toml` from the project root. A missing file yields the
/// defaults; a malformed one is an error.
pub fn load_config(project_root: &Path) -> Result<TasksConfig, ConfigError> {
    let path = config_path(project_root);
    if !path.is_file() {
        return Ok(TasksConfig::default());
    }
    let text = fs::read_to_string(&path)?;
    let config: TasksConfig =
        toml::from_str(&text).map_err(|source| ConfigError::Parse { path, source })?;
    config.validate()?;
    Ok(config)
}
