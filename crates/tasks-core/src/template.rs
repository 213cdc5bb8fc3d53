use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

use crate::wbs::Wbs;

/// Template written by `init` when no template exists yet.
pub const DEFAULT_TEMPLATE: &str = "---
name: {{PROMPT_NAME}}
description: <prompt description>
status: Backlog
created_at: {{CREATED_AT}}
updated_at: {{UPDATED_AT}}
---

## {{WBS}}. {{PROMPT_NAME}}

### Background

### Requirements / Objectives

### Solutions / Goals

### References
";

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Template file not found: {}. Run 'tasks init' first.", .0.display())]
    NotFound(PathBuf),
    #[error("Failed to read template {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
    Name,
    Wbs,
    CreatedAt,
    UpdatedAt,
    Description,
}

impl Placeholder {
    pub const ALL: [Placeholder; 5] = [
        Placeholder::Name,
        Placeholder::Wbs,
        Placeholder::CreatedAt,
        Placeholder::UpdatedAt,
        Placeholder::Description,
    ];

    /// Key written between braces. The description is a bare marker instead.
    pub fn key(self) -> Option<&'static str> {
        match self {
            Placeholder::Name => Some("PROMPT_NAME"),
            Placeholder::Wbs => Some("WBS"),
            Placeholder::CreatedAt => Some("CREATED_AT"),
            Placeholder::UpdatedAt => Some("UPDATED_AT"),
            Placeholder::Description => None,
        }
    }

    /// `{{KEY}}`, the one supported brace spelling, or the description marker.
    pub fn token(self) -> String {
        match self.key() {
            Some(key) => format!("{{{{{key}}}}}"),
            None => DESCRIPTION_MARKER.to_string(),
        }
    }

    fn is_known_key(key: &str) -> bool {
        Placeholder::ALL
            .iter()
            .filter_map(|placeholder| placeholder.key())
            .any(|known| known == key)
    }
}

/// Marker replaced with `Task: {name}`.
pub const DESCRIPTION_MARKER: &str = "<prompt description>";

/// Values substituted into a template when a record is created.
#[derive(Debug, Clone)]
pub struct TemplateValues<'a> {
    pub name: &'a str,
    pub wbs: Wbs,
    pub created_at: &'a str,
    pub updated_at: &'a str,
}

impl TemplateValues<'_> {
    fn value(&self, placeholder: Placeholder) -> String {
        match placeholder {
            Placeholder::Name => self.name.to_string(),
            Placeholder::Wbs => self.wbs.to_string(),
            Placeholder::CreatedAt => self.created_at.to_string(),
            Placeholder::UpdatedAt => self.updated_at.to_string(),
            Placeholder::Description => format!("Task: {}", self.name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    text: String,
}

impl Template {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn load(path: &Path) -> Result<Self, TemplateError> {
        match fs::read_to_string(path) {
            Ok(text) => Ok(Self::new(text)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(TemplateError::NotFound(path.to_path_buf()))
            }
            Err(source) => Err(TemplateError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn render(&self, values: &TemplateValues<'_>) -> String {
        Placeholder::ALL
            .iter()
            .fold(self.text.clone(), |acc, placeholder| {
                acc.replace(&placeholder.token(), &values.value(*placeholder))
            })
    }

    /// Keys still written in the retired `{ { KEY } }` spelling. These are
    /// left untouched by [`Template::render`].
    pub fn legacy_placeholders(&self) -> Vec<String> {
        captured_keys(legacy_regex(), &self.text).into_iter().collect()
    }

    /// Brace tokens that [`Template::render`] would leave in the record as
    /// written: unknown keys, or known keys with padding inside the braces.
    pub fn unknown_placeholders(&self) -> Vec<String> {
        token_regex()
            .captures_iter(&self.text)
            .filter(|cap| {
                let key = cap.get(1).map_or("", |m| m.as_str());
                let whole = cap.get(0).map_or("", |m| m.as_str());
                !Placeholder::is_known_key(key) || whole != format!("{{{{{key}}}}}")
            })
            .filter_map(|cap| cap.get(0))
            .map(|m| m.as_str().to_string())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

fn captured_keys(regex: &Regex, text: &str) -> BTreeSet<String> {
    regex
        .captures_iter(text)
        .filter_map(|cap| cap.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}

fn legacy_regex() -> &'static Regex {
    static LEGACY: OnceLock<Regex> = OnceLock::new();
    LEGACY.get_or_init(|| Regex::new(r"\{\s+\{\s*([A-Z_]+)\s*\}\s+\}").expect("regex"))
}

fn token_regex() -> &'static Regex {
    static TOKEN: OnceLock<Regex> = OnceLock::new();
    TOKEN.get_or_init(|| Regex::new(r"\{\{\s*([A-Za-z0-9_]+)\s*\}\}").expect("regex"))
}
