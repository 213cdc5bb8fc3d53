use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Serialize, Serializer};
use thiserror::Error;
use tracing::debug;

use crate::io::atomic_write;
use crate::store::{RecordHandle, RecordStore, StoreError};

/// Hidden file in the records directory holding the last allocated id.
pub const SEQUENCE_FILE: &str = ".sequence";

#[derive(Debug, Error)]
pub enum WbsError {
    #[error("Invalid WBS number '{0}'. Expected a 1-4 digit number (e.g. '47' or '0047').")]
    Invalid(String),
    #[error("WBS space exhausted: 9999 is the last assignable id")]
    Exhausted,
    #[error("Corrupt sequence file {}: '{content}'", .path.display())]
    CorruptSequence { path: PathBuf, content: String },
    #[error("Failed to access sequence file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Zero-padded 4-digit task identifier, used as the record filename prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Wbs(u16);

impl Wbs {
    pub const MAX: u16 = 9999;

    pub fn new(value: u16) -> Result<Self, WbsError> {
        if value > Self::MAX {
            return Err(WbsError::Invalid(value.to_string()));
        }
        Ok(Self(value))
    }

    pub fn value(self) -> u16 {
        self.0
    }

    pub fn next(self) -> Result<Self, WbsError> {
        if self.0 >= Self::MAX {
            return Err(WbsError::Exhausted);
        }
        Ok(Self(self.0 + 1))
    }

    /// Id of a record filename shaped `{id}_{slug}.ext`, if any.
    pub fn from_file_name(name: &str) -> Option<Self> {
        if name.as_bytes().get(4) != Some(&b'_') {
            return None;
        }
        let prefix = name.get(..4)?;
        if !prefix.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        prefix.parse::<u16>().ok().map(Self)
    }
}

impl FromStr for Wbs {
    type Err = WbsError;

    /// Accepts the short form (`47`) as well as the padded form (`0047`).
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let trimmed = input.trim();
        if trimmed.is_empty()
            || trimmed.len() > 4
            || !trimmed.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(WbsError::Invalid(input.to_string()));
        }
        trimmed
            .parse::<u16>()
            .map(Self)
            .map_err(|_| WbsError::Invalid(input.to_string()))
    }
}

impl fmt::Display for Wbs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}", self.0)
    }
}

impl Serialize for Wbs {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

pub fn sequence_path(store: &RecordStore) -> PathBuf {
    store.dir().join(SEQUENCE_FILE)
}

pub fn highest_existing(records: &[RecordHandle]) -> Option<Wbs> {
    records.iter().filter_map(RecordHandle::wbs).max()
}

pub fn read_sequence(path: &Path) -> Result<Option<Wbs>, WbsError> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(WbsError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    let content = text.trim();
    if content.is_empty() {
        return Ok(None);
    }
    content
        .parse::<Wbs>()
        .map(Some)
        .map_err(|_| WbsError::CorruptSequence {
            path: path.to_path_buf(),
            content: content.to_string(),
        })
}

/// Next id to assign: one past the larger of the highest id on disk and the
/// persisted sequence, so ids stay unique even after records are deleted.
pub fn next_wbs(store: &RecordStore) -> Result<Wbs, AllocError> {
    let records = store.list_records()?;
    let on_disk = highest_existing(&records);
    let persisted = read_sequence(&sequence_path(store))?;
    let next = match on_disk.max(persisted) {
        Some(last) => last.next()?,
        None => Wbs(1),
    };
    debug!(?on_disk, ?persisted, %next, "allocated wbs");
    Ok(next)
}

/// Persist `wbs` as the last allocated id. Never moves the sequence backwards.
pub fn record_allocation(store: &RecordStore, wbs: Wbs) -> Result<(), WbsError> {
    let path = sequence_path(store);
    if let Some(current) = read_sequence(&path)? {
        if current >= wbs {
            return Ok(());
        }
    }
    atomic_write(&path, format!("{wbs}\n").as_bytes()).map_err(|source| WbsError::Io {
        path: path.clone(),
        source,
    })
}

#[derive(Debug, Error)]
pub enum AllocError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Wbs(#[from] WbsError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn parses_short_and_padded_forms() {
        assert_eq!("47".parse::<Wbs>().expect("short").to_string(), "0047");
        assert_eq!("0047".parse::<Wbs>().expect("padded").to_string(), "0047");
        assert!("12345".parse::<Wbs>().is_err());
        assert!("4a".parse::<Wbs>().is_err());
        assert!("".parse::<Wbs>().is_err());
        assert!("-1".parse::<Wbs>().is_err());
    }

    #[test]
    fn from_file_name_reads_prefix() {
        assert_eq!(
            Wbs::from_file_name("0012_Add_login.md").map(Wbs::value),
            Some(12)
        );
        assert_eq!(Wbs::from_file_name("notes.md"), None);
        assert_eq!(Wbs::from_file_name("12.md"), None);
        assert_eq!(Wbs::from_file_name("20260101_standup_notes.md"), None);
        assert_eq!(Wbs::from_file_name("00041_other.md"), None);
    }

    #[test]
    fn next_stops_at_max() {
        let last = Wbs::new(Wbs::MAX).expect("max");
        assert!(matches!(last.next(), Err(WbsError::Exhausted)));
    }

    #[test]
    fn next_wbs_starts_at_one() {
        let temp = TempDir::new().expect("tempdir");
        let store = RecordStore::new(temp.path());
        assert_eq!(next_wbs(&store).expect("next").to_string(), "0001");
    }

    #[test]
    fn next_wbs_uses_highest_id_not_count() {
        let temp = TempDir::new().expect("tempdir");
        fs::write(temp.path().join("0001_a.md"), "status: Backlog\n").expect("a");
        fs::write(temp.path().join("0007_b.md"), "status: Backlog\n").expect("b");
        let store = RecordStore::new(temp.path());
        assert_eq!(next_wbs(&store).expect("next").to_string(), "0008");
    }

    #[test]
    fn next_wbs_ignores_date_prefixed_files() {
        let temp = TempDir::new().expect("tempdir");
        fs::write(temp.path().join("20260101_standup_notes.md"), "notes\n").expect("notes");
        fs::write(temp.path().join("2026_retro.txt"), "retro\n").expect("retro");
        let store = RecordStore::new(temp.path());
        assert_eq!(next_wbs(&store).expect("next").to_string(), "0001");
    }

    #[test]
    fn persisted_sequence_prevents_reuse_after_delete() {
        let temp = TempDir::new().expect("tempdir");
        let store = RecordStore::new(temp.path());
        let record = temp.path().join("0003_c.md");
        fs::write(&record, "status: Backlog\n").expect("c");
        record_allocation(&store, Wbs::new(3).expect("3")).expect("persist");
        fs::remove_file(&record).expect("delete");
        assert_eq!(next_wbs(&store).expect("next").to_string(), "0004");
    }

    #[test]
    fn record_allocation_never_moves_backwards() {
        let temp = TempDir::new().expect("tempdir");
        let store = RecordStore::new(temp.path());
        record_allocation(&store, Wbs::new(9).expect("9")).expect("9");
        record_allocation(&store, Wbs::new(4).expect("4")).expect("4");
        let persisted = read_sequence(&sequence_path(&store)).expect("read");
        assert_eq!(persisted, Some(Wbs::new(9).expect("9")));
    }

    #[test]
    fn corrupt_sequence_is_reported() {
        let temp = TempDir::new().expect("tempdir");
        let store = RecordStore::new(temp.path());
        fs::write(sequence_path(&store), "banana").expect("seed");
        assert!(matches!(
            next_wbs(&store),
            Err(AllocError::Wbs(WbsError::CorruptSequence { .. }))
        ));
    }
}
