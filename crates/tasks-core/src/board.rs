use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::warn;

use crate::io::atomic_write;
use crate::status::{Status, STATUS_KEY};
use crate::store::{RecordStore, StoreError};
use crate::wbs::Wbs;

/// Fixed board metadata written ahead of the status sections.
pub const BOARD_PREAMBLE: &str = "---\nkanban-plugin: board\n---\n\n# Kanban Board\n\n";

#[derive(Debug, Error)]
pub enum BoardError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("Failed to write kanban board {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoardEntry {
    pub wbs: Option<Wbs>,
    pub name: String,
    pub status: Status,
}

impl BoardEntry {
    pub fn render_line(&self) -> String {
        format!("- [{}] {}", self.status.marker(), self.name)
    }
}

/// A record left off the board, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRecord {
    pub file: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Lane {
    pub status: Status,
    pub entries: Vec<BoardEntry>,
}

/// The kanban board: one lane per status in display order. Always derived
/// from the records on disk.
#[derive(Debug, Clone, Serialize)]
pub struct Board {
    pub lanes: Vec<Lane>,
    pub skipped: Vec<SkippedRecord>,
}

impl Board {
    pub fn empty() -> Self {
        Self {
            lanes: Status::ALL
                .iter()
                .map(|status| Lane {
                    status: *status,
                    entries: Vec::new(),
                })
                .collect(),
            skipped: Vec::new(),
        }
    }

    /// Bucket every record by its header status. Records that cannot be read
    /// or carry an unknown status are skipped and reported, never fatal.
    pub fn from_store(store: &RecordStore) -> Result<Self, StoreError> {
        let mut board = Self::empty();
        for record in store.list_records()? {
            let header = match store.read_header(&record) {
                Ok(header) => header,
                Err(err) => {
                    board.skip(record.file_name(), err.to_string());
                    continue;
                }
            };
            match Status::from_header_value(header.get(STATUS_KEY)) {
                Ok(status) => board.push(BoardEntry {
                    wbs: record.wbs(),
                    name: record.display_name().to_string(),
                    status,
                }),
                Err(err) => board.skip(record.file_name(), err.to_string()),
            }
        }
        Ok(board)
    }

    pub fn lane(&self, status: Status) -> &[BoardEntry] {
        self.lanes
            .iter()
            .find(|lane| lane.status == status)
            .map(|lane| lane.entries.as_slice())
            .unwrap_or(&[])
    }

    pub fn entries(&self) -> impl Iterator<Item = &BoardEntry> {
        self.lanes.iter().flat_map(|lane| lane.entries.iter())
    }

    pub fn len(&self) -> usize {
        self.lanes.iter().map(|lane| lane.entries.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn render(&self) -> String {
        let mut content = String::from(BOARD_PREAMBLE);
        for lane in &self.lanes {
            let lines: Vec<String> = lane.entries.iter().map(BoardEntry::render_line).collect();
            content.push_str(&format!("## {}\n\n{}\n\n", lane.status, lines.join("\n")));
        }
        content
    }

    /// Replace the board document in one rename. On failure the previous
    /// document stays as it was.
    pub fn write_to(&self, path: &Path) -> Result<(), BoardError> {
        atomic_write(path, self.render().as_bytes()).map_err(|source| BoardError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    fn push(&mut self, entry: BoardEntry) {
        if let Some(lane) = self.lanes.iter_mut().find(|lane| lane.status == entry.status) {
            lane.entries.push(entry);
        }
    }

    fn skip(&mut self, file: &str, reason: String) {
        warn!(file, %reason, "skipping record");
        self.skipped.push(SkippedRecord {
            file: file.to_string(),
            reason,
        });
    }
}

/// Rebuild the board from the store and write it to `path`.
pub fn sync(store: &RecordStore, path: &Path) -> Result<Board, BoardError> {
    let board = Board::from_store(store)?;
    board.write_to(path)?;
    Ok(board)
}

/// The `## {status}` section of a rendered board, up to the next heading.
pub fn extract_section(board: &str, status: Status) -> Option<String> {
    let heading = format!("## {}", status.as_str());
    let lines: Vec<&str> = board.lines().collect();
    let start = lines.iter().position(|line| line.trim_end() == heading)?;
    let end = lines[start + 1..]
        .iter()
        .position(|line| line.starts_with("## "))
        .map(|offset| start + 1 + offset)
        .unwrap_or(lines.len());
    let mut section = lines[start..end].join("\n");
    section.push('\n');
    Some(section)
}

/// Entry lines (`- [ ] ...`) of a section.
pub fn section_entries(section: &str) -> Vec<&str> {
    section
        .lines()
        .filter(|line| line.starts_with("- ["))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    fn seed(dir: &Path, name: &str, status: Option<&str>) {
        let mut content = String::from("---\nname: x\n");
        if let Some(status) = status {
            content.push_str(&format!("status: {status}\n"));
        }
        content.push_str("---\n\nbody\n");
        fs::write(dir.join(name), content).expect("seed");
    }

    #[test]
    fn empty_board_renders_five_sections_in_order() {
        assert_eq!(
            Board::empty().render(),
            "---\nkanban-plugin: board\n---\n\n# Kanban Board\n\n\
## Backlog\n\n\n\n\
## Todo\n\n\n\n\
## WIP\n\n\n\n\
## Testing\n\n\n\n\
## Done\n\n\n\n"
        );
    }

    #[test]
    fn from_store_buckets_by_status_with_markers() {
        let temp = TempDir::new().expect("tempdir");
        seed(temp.path(), "0001_a.md", Some("Backlog"));
        seed(temp.path(), "0002_b.md", Some("WIP"));
        seed(temp.path(), "0003_c.md", Some("testing"));
        seed(temp.path(), "0004_d.md", Some("Done"));
        seed(temp.path(), "0005_e.md", None);

        let board = Board::from_store(&RecordStore::new(temp.path())).expect("board");
        let rendered = board.render();
        assert_eq!(
            extract_section(&rendered, Status::Backlog).expect("backlog"),
            "## Backlog\n\n- [ ] 0001_a\n- [ ] 0005_e\n\n"
        );
        assert!(rendered.contains("## WIP\n\n- [.] 0002_b\n"));
        assert!(rendered.contains("## Testing\n\n- [.] 0003_c\n"));
        assert!(rendered.contains("## Done\n\n- [x] 0004_d\n"));
        assert_eq!(board.len(), 5);
    }

    #[test]
    fn unknown_status_is_skipped_not_fatal() {
        let temp = TempDir::new().expect("tempdir");
        seed(temp.path(), "0001_a.md", Some("Paused"));
        seed(temp.path(), "0002_b.md", Some("Todo"));

        let board = Board::from_store(&RecordStore::new(temp.path())).expect("board");
        assert_eq!(board.len(), 1);
        assert_eq!(board.lane(Status::Todo)[0].name, "0002_b");
        assert_eq!(board.skipped.len(), 1);
        assert_eq!(board.skipped[0].file, "0001_a.md");
        assert!(board.skipped[0].reason.contains("Paused"));
    }

    #[test]
    fn sync_is_idempotent() {
        let temp = TempDir::new().expect("tempdir");
        seed(temp.path(), "0001_a.md", Some("Todo"));
        seed(temp.path(), "0002_b.md", Some("Done"));
        let store = RecordStore::new(temp.path());
        let path = temp.path().join(".kanban.md");

        sync(&store, &path).expect("first");
        let first = fs::read(&path).expect("read first");
        sync(&store, &path).expect("second");
        let second = fs::read(&path).expect("read second");
        assert_eq!(first, second);
    }

    #[test]
    fn failed_write_leaves_previous_board() {
        let temp = TempDir::new().expect("tempdir");
        let store = RecordStore::new(temp.path());
        let missing = temp.path().join("gone").join(".kanban.md");
        let err = sync(&store, &missing).expect_err("write");
        assert!(matches!(err, BoardError::Write { .. }));
        assert!(!missing.exists());
    }

    #[test]
    fn extract_section_stops_at_next_heading() {
        let rendered = Board::empty().render();
        assert_eq!(
            extract_section(&rendered, Status::Wip).expect("wip"),
            "## WIP\n\n\n\n"
        );
        assert!(section_entries(&extract_section(&rendered, Status::Wip).expect("wip")).is_empty());
    }

    #[test]
    fn extract_section_missing_heading() {
        assert_eq!(extract_section("# Kanban Board\n", Status::Done), None);
    }
}
