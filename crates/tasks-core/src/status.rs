use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::Local;
use serde::{Serialize, Serializer};
use thiserror::Error;
use tracing::debug;

use crate::store::{RecordHandle, RecordStore, StoreError};
use crate::wbs::Wbs;

/// Header key holding the record status.
pub const STATUS_KEY: &str = "status";
/// Header key bumped on every status change.
pub const UPDATED_AT_KEY: &str = "updated_at";

#[derive(Debug, Error)]
pub enum StatusError {
    #[error("Invalid status '{0}'. Valid statuses: {}", Status::valid_values())]
    Invalid(String),
    #[error("Task {} has no 'status' field in its header", .0.display())]
    MissingStatusField(PathBuf),
}

/// Workflow stage of a record. Any stage may move to any other stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Status {
    Backlog,
    Todo,
    Wip,
    Testing,
    Done,
}

impl Status {
    /// Board display order.
    pub const ALL: [Status; 5] = [
        Status::Backlog,
        Status::Todo,
        Status::Wip,
        Status::Testing,
        Status::Done,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Backlog => "Backlog",
            Status::Todo => "Todo",
            Status::Wip => "WIP",
            Status::Testing => "Testing",
            Status::Done => "Done",
        }
    }

    /// Checkbox fill used on the board.
    pub fn marker(self) -> char {
        match self {
            Status::Wip | Status::Testing => '.',
            Status::Done => 'x',
            Status::Backlog | Status::Todo => ' ',
        }
    }

    pub fn valid_values() -> String {
        Self::ALL
            .iter()
            .map(|status| status.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Status as read from a header value: empty means `Backlog`.
    pub fn from_header_value(value: Option<&str>) -> Result<Self, StatusError> {
        match value.map(str::trim) {
            None | Some("") => Ok(Status::Backlog),
            Some(raw) => raw.parse(),
        }
    }
}

impl FromStr for Status {
    type Err = StatusError;

    /// Case-insensitive, ignores `-`, `_` and spaces, and accepts the common
    /// aliases (`in-progress`, `review`, `completed`, ...).
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let normalized: String = input
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .collect::<String>()
            .to_lowercase();
        let status = match normalized.as_str() {
            "backlog" => Status::Backlog,
            "todo" => Status::Todo,
            "wip" | "inprogress" | "working" => Status::Wip,
            "testing" | "test" | "review" | "inreview" => Status::Testing,
            "done" | "completed" | "complete" | "finished" | "closed" => Status::Done,
            _ => return Err(StatusError::Invalid(input.to_string())),
        };
        Ok(status)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Status {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

pub fn now_timestamp() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

#[derive(Debug, Error)]
pub enum TransitionError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Status(#[from] StatusError),
}

/// Move the record `wbs` to `status`, stamping `updated_at` with `timestamp`.
///
/// Only the `status` and `updated_at` header lines are rewritten. The record
/// must already carry a `status` line. Re-applying the current status is
/// accepted and still bumps `updated_at`.
pub fn transition(
    store: &RecordStore,
    wbs: Wbs,
    status: Status,
    timestamp: &str,
) -> Result<RecordHandle, TransitionError> {
    let record = store.find(wbs)?;
    let header = store.read_header(&record)?;
    if header.get(STATUS_KEY).is_none() {
        return Err(StatusError::MissingStatusField(record.path.clone()).into());
    }

    let mut fields = vec![(STATUS_KEY, status.as_str())];
    if header.get(UPDATED_AT_KEY).is_some() {
        fields.push((UPDATED_AT_KEY, timestamp));
    }
    store.write_fields(&record, &fields)?;
    debug!(record = %record.file_name(), %status, "status updated");
    Ok(record)
}
