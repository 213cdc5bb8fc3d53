use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::io::{atomic_create, atomic_write};
use crate::wbs::Wbs;

/// Extension of record files.
pub const RECORD_EXTENSION: &str = "md";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Records directory not found: {}. Run 'tasks init' first.", .0.display())]
    RecordsDirMissing(PathBuf),
    #[error("No task found with WBS: {0}")]
    RecordNotFound(Wbs),
    #[error("Multiple files found for WBS {wbs}: {}", .matches.join(", "))]
    AmbiguousId { wbs: Wbs, matches: Vec<String> },
    #[error("Field '{key}' not found in header of {}", .path.display())]
    FieldNotFound { key: String, path: PathBuf },
    #[error("A task with WBS {wbs} already exists: {}", .path.display())]
    IdCollision { wbs: Wbs, path: PathBuf },
    #[error("Failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// A record file located in the records directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordHandle {
    pub path: PathBuf,
}

impl RecordHandle {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn file_name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("")
    }

    /// File name without extension, as shown on the board.
    pub fn display_name(&self) -> &str {
        self.path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("")
    }

    pub fn wbs(&self) -> Option<Wbs> {
        Wbs::from_file_name(self.file_name())
    }
}

/// The leading `key: value` block of a record, in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Header {
    entries: Vec<(String, String)>,
}

impl Header {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }
}

pub fn parse_header(text: &str) -> Header {
    let lines: Vec<&str> = text.lines().collect();
    let mut entries = Vec::new();
    for line in &lines[header_span(&lines)] {
        if let Some((key, value)) = split_key_line(line) {
            if !entries.iter().any(|(existing, _): &(String, String)| existing == key) {
                entries.push((key.to_string(), value.to_string()));
            }
        }
    }
    Header { entries }
}

/// Replace header lines `key: value` in `text`. Every key must already be
/// present; nothing is changed otherwise. Untouched lines, including their
/// `\r\n` or `\n` terminators, are copied through as they are.
pub fn replace_header_fields(text: &str, fields: &[(&str, &str)]) -> Result<String, String> {
    let segments: Vec<&str> = text.split_inclusive('\n').collect();
    let bare: Vec<&str> = segments.iter().map(|segment| strip_terminator(segment)).collect();
    let span = header_span(&bare);

    let mut replacements: Vec<(usize, String)> = Vec::with_capacity(fields.len());
    for (key, value) in fields {
        let idx = span
            .clone()
            .find(|idx| split_key_line(bare[*idx]).map(|(k, _)| k) == Some(*key))
            .ok_or_else(|| key.to_string())?;
        replacements.push((idx, format!("{key}: {value}")));
    }

    let mut rendered = String::with_capacity(text.len());
    for (idx, segment) in segments.iter().enumerate() {
        match replacements.iter().rev().find(|(line, _)| *line == idx) {
            Some((_, line)) => {
                rendered.push_str(line);
                rendered.push_str(&segment[bare[idx].len()..]);
            }
            None => rendered.push_str(segment),
        }
    }
    Ok(rendered)
}

fn strip_terminator(segment: &str) -> &str {
    let line = segment.strip_suffix('\n').unwrap_or(segment);
    line.strip_suffix('\r').unwrap_or(line)
}

/// Line range holding header candidates. A leading `---` fences the block
/// until the closing `---`; otherwise the block ends at the first line that
/// is not a `key: value` pair.
fn header_span(lines: &[&str]) -> std::ops::Range<usize> {
    if lines.first().map(|line| line.trim() == "---").unwrap_or(false) {
        if let Some(end) = lines.iter().skip(1).position(|line| line.trim() == "---") {
            return 1..end + 1;
        }
    }
    let start = if lines.first().map(|line| line.trim() == "---").unwrap_or(false) {
        1
    } else {
        0
    };
    let end = lines[start..]
        .iter()
        .position(|line| split_key_line(line).is_none())
        .map(|offset| start + offset)
        .unwrap_or(lines.len());
    start..end
}

fn split_key_line(line: &str) -> Option<(&str, &str)> {
    if line.starts_with(char::is_whitespace) {
        return None;
    }
    let (key, value) = line.split_once(':')?;
    let key = key.trim_end();
    if key.is_empty()
        || !key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return None;
    }
    Some((key, value.trim()))
}

/// File-backed record store rooted at the records directory.
#[derive(Debug, Clone)]
pub struct RecordStore {
    dir: PathBuf,
    extension: String,
}

impl RecordStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            extension: RECORD_EXTENSION.to_string(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn exists(&self) -> bool {
        self.dir.is_dir()
    }

    pub fn require_dir(&self) -> Result<(), StoreError> {
        if self.exists() {
            Ok(())
        } else {
            Err(StoreError::RecordsDirMissing(self.dir.clone()))
        }
    }

    /// Non-hidden files with the record extension, sorted by file name.
    pub fn list_records(&self) -> Result<Vec<RecordHandle>, StoreError> {
        self.require_dir()?;
        let read_dir = fs::read_dir(&self.dir).map_err(|err| StoreError::io(&self.dir, err))?;
        let mut records: Vec<RecordHandle> = read_dir
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| self.is_record_path(path))
            .map(RecordHandle::new)
            .collect();
        records.sort_by(|a, b| a.file_name().cmp(b.file_name()));
        Ok(records)
    }

    pub fn read_header(&self, record: &RecordHandle) -> Result<Header, StoreError> {
        let text =
            fs::read_to_string(&record.path).map_err(|err| StoreError::io(&record.path, err))?;
        Ok(parse_header(&text))
    }

    pub fn write_field(
        &self,
        record: &RecordHandle,
        key: &str,
        value: &str,
    ) -> Result<(), StoreError> {
        self.write_fields(record, &[(key, value)])
    }

    /// Rewrite several header lines at once. Fails with `FieldNotFound` before
    /// touching the file if any key is absent.
    pub fn write_fields(
        &self,
        record: &RecordHandle,
        fields: &[(&str, &str)],
    ) -> Result<(), StoreError> {
        let text =
            fs::read_to_string(&record.path).map_err(|err| StoreError::io(&record.path, err))?;
        let updated =
            replace_header_fields(&text, fields).map_err(|key| StoreError::FieldNotFound {
                key,
                path: record.path.clone(),
            })?;
        atomic_write(&record.path, updated.as_bytes())
            .map_err(|err| StoreError::io(&record.path, err))
    }

    /// Locate the single record whose file name starts with `{wbs}_`.
    pub fn find(&self, wbs: Wbs) -> Result<RecordHandle, StoreError> {
        let mut matches = self.matching(wbs)?;
        match matches.len() {
            0 => Err(StoreError::RecordNotFound(wbs)),
            1 => Ok(matches.remove(0)),
            _ => Err(StoreError::AmbiguousId {
                wbs,
                matches: matches
                    .iter()
                    .map(|record| record.file_name().to_string())
                    .collect(),
            }),
        }
    }

    pub fn record_path(&self, wbs: Wbs, slug: &str) -> PathBuf {
        self.dir.join(format!("{wbs}_{slug}.{}", self.extension))
    }

    /// Write a new record. Refuses to reuse an id that any file already carries.
    pub fn create_record(
        &self,
        wbs: Wbs,
        slug: &str,
        content: &str,
    ) -> Result<RecordHandle, StoreError> {
        self.ensure_unused(wbs, slug)?;
        let path = self.record_path(wbs, slug);
        atomic_create(&path, content.as_bytes()).map_err(|err| {
            if err.kind() == std::io::ErrorKind::AlreadyExists {
                StoreError::IdCollision {
                    wbs,
                    path: path.clone(),
                }
            } else {
                StoreError::io(&path, err)
            }
        })?;
        debug!(path = %path.display(), "record created");
        Ok(RecordHandle::new(path))
    }

    pub fn ensure_unused(&self, wbs: Wbs, slug: &str) -> Result<(), StoreError> {
        if let Some(existing) = self.matching(wbs)?.into_iter().next() {
            return Err(StoreError::IdCollision {
                wbs,
                path: existing.path,
            });
        }
        let path = self.record_path(wbs, slug);
        if path.exists() {
            return Err(StoreError::IdCollision { wbs, path });
        }
        Ok(())
    }

    fn matching(&self, wbs: Wbs) -> Result<Vec<RecordHandle>, StoreError> {
        let prefix = format!("{wbs}_");
        Ok(self
            .list_records()?
            .into_iter()
            .filter(|record| record.file_name().starts_with(&prefix))
            .collect())
    }

    fn is_record_path(&self, path: &Path) -> bool {
        let hidden = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(|name| name.starts_with('.'))
            .unwrap_or(true);
        !hidden
            && path.is_file()
            && path
                .extension()
                .map(|ext| ext == self.extension.as_str())
                .unwrap_or(false)
    }
}

/// Filename-safe form of a task name.
pub fn slugify(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| match c {
            ' ' | '/' | '\\' => '_',
            other => other,
        })
        .collect()
}
