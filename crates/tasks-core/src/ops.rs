use std::fs;
use std::path::PathBuf;

use serde::Serialize;
use tracing::info;

use crate::board::{self, extract_section, Board};
use crate::decompose::{plan_subtasks, render_subtask, Subtask};
use crate::error::{Result, TasksError};
use crate::io::write_if_missing;
use crate::lock::DirLock;
use crate::project::ProjectPaths;
use crate::status::{transition, Status};
use crate::store::{slugify, RecordHandle};
use crate::template::{Template, TemplateValues, DEFAULT_TEMPLATE};
use crate::wbs::{next_wbs, record_allocation, Wbs};

#[derive(Debug, Serialize)]
pub struct InitReport {
    pub records_dir: PathBuf,
    pub created_dir: bool,
    pub created_board: bool,
    pub created_template: bool,
}

#[derive(Debug)]
pub struct Created {
    pub wbs: Wbs,
    pub record: RecordHandle,
    pub board: Board,
}

#[derive(Debug)]
pub struct Updated {
    pub record: RecordHandle,
    pub status: Status,
    pub board: Board,
}

#[derive(Debug, Serialize)]
pub struct PlannedRecord {
    pub wbs: Wbs,
    pub path: PathBuf,
    pub subtask: Subtask,
}

#[derive(Debug)]
pub struct Decomposed {
    pub records: Vec<PlannedRecord>,
    /// `None` on a dry run.
    pub board: Option<Board>,
}

/// Create the records directory, board and template when absent. Existing
/// files are left alone, so running it twice changes nothing.
pub fn init(paths: &ProjectPaths) -> Result<InitReport> {
    let created_dir = !paths.records_dir.is_dir();
    fs::create_dir_all(&paths.records_dir)
        .map_err(|err| TasksError::io(&paths.records_dir, err))?;

    let _lock = DirLock::acquire(&paths.lock_file())?;
    let store = paths.store();
    // Existing records are folded into a fresh board so it never disagrees with them.
    let board_text = Board::from_store(&store)?.render();
    let created_board = write_if_missing(&paths.board_file, board_text.as_bytes())
        .map_err(|err| TasksError::io(&paths.board_file, err))?;
    let created_template = write_if_missing(&paths.template_file, DEFAULT_TEMPLATE.as_bytes())
        .map_err(|err| TasksError::io(&paths.template_file, err))?;

    Ok(InitReport {
        records_dir: paths.records_dir.clone(),
        created_dir,
        created_board,
        created_template,
    })
}

pub fn validate_name(paths: &ProjectPaths, name: &str) -> Result<()> {
    let name = name.trim();
    if name.is_empty() {
        return Err(TasksError::MissingName);
    }
    if name.chars().any(char::is_control) {
        return Err(TasksError::InvalidName(name.escape_default().to_string()));
    }
    let len = name.chars().count();
    let max = paths.config.max_name_length;
    if len > max {
        return Err(TasksError::NameTooLong { len, max });
    }
    Ok(())
}

/// Allocate the next id, instantiate the template and rebuild the board.
pub fn create_task(paths: &ProjectPaths, name: &str, timestamp: &str) -> Result<Created> {
    validate_name(paths, name)?;
    let name = name.trim();
    let store = paths.store();
    store.require_dir()?;
    paths.require_board()?;
    let template = Template::load(&paths.template_file)?;

    let _lock = DirLock::acquire(&paths.lock_file())?;
    let wbs = next_wbs(&store)?;
    let content = template.render(&TemplateValues {
        name,
        wbs,
        created_at: timestamp,
        updated_at: timestamp,
    });
    let slug = slugify(name);
    store.ensure_unused(wbs, &slug)?;
    // The sequence moves first so a failed write can only leave a gap.
    record_allocation(&store, wbs)?;
    let record = store.create_record(wbs, &slug, &content)?;
    info!(record = %record.file_name(), "task created");

    let board = board::sync(&store, &paths.board_file)?;
    Ok(Created { wbs, record, board })
}

/// Validate both inputs, move the record to the new status and rebuild the board.
pub fn update_task(
    paths: &ProjectPaths,
    wbs: &str,
    status: &str,
    timestamp: &str,
) -> Result<Updated> {
    let status: Status = status.parse()?;
    let wbs: Wbs = wbs.parse()?;
    let store = paths.store();
    store.require_dir()?;
    paths.require_board()?;

    let _lock = DirLock::acquire(&paths.lock_file())?;
    let record = transition(&store, wbs, status, timestamp)?;
    let board = board::sync(&store, &paths.board_file)?;
    Ok(Updated {
        record,
        status,
        board,
    })
}

/// Rebuild the board without touching any record.
pub fn refresh(paths: &ProjectPaths) -> Result<Board> {
    let store = paths.store();
    store.require_dir()?;
    paths.require_board()?;

    let _lock = DirLock::acquire(&paths.lock_file())?;
    Ok(board::sync(&store, &paths.board_file)?)
}

/// Board document text, or just one status section of it.
pub fn board_text(paths: &ProjectPaths, status: Option<Status>) -> Result<String> {
    paths.require_board()?;
    let text = fs::read_to_string(&paths.board_file)
        .map_err(|err| TasksError::io(&paths.board_file, err))?;
    match status {
        None => Ok(text),
        Some(status) => extract_section(&text, status).ok_or(TasksError::SectionMissing(status)),
    }
}

/// Current board computed straight from the records.
pub fn current_board(paths: &ProjectPaths) -> Result<Board> {
    Ok(Board::from_store(&paths.store())?)
}

pub fn locate(paths: &ProjectPaths, wbs: &str) -> Result<RecordHandle> {
    let wbs: Wbs = wbs.parse()?;
    Ok(paths.store().find(wbs)?)
}

/// Options for [`decompose`] beyond the requirement itself.
#[derive(Debug, Default, Clone, Copy)]
pub struct DecomposeOptions<'a> {
    /// First id to use instead of the next free one.
    pub start: Option<&'a str>,
    /// Existing task the first subtask hangs under.
    pub parent: Option<&'a str>,
    pub dry_run: bool,
}

/// Split `requirement` into sequential records starting at `start` (or the
/// next free id). Every target is checked before anything is written.
pub fn decompose(
    paths: &ProjectPaths,
    requirement: &str,
    options: DecomposeOptions<'_>,
    timestamp: &str,
) -> Result<Decomposed> {
    let requirement = requirement.trim();
    if requirement.is_empty() {
        return Err(TasksError::MissingRequirement);
    }
    let start = options.start.map(str::parse::<Wbs>).transpose()?;
    let parent = options.parent.map(str::parse::<Wbs>).transpose()?;
    let store = paths.store();
    store.require_dir()?;
    paths.require_board()?;
    if let Some(parent) = parent {
        store.find(parent)?;
    }

    let _lock = DirLock::acquire(&paths.lock_file())?;
    let next = next_wbs(&store)?;
    let first = match start {
        Some(start) if start < next => {
            return Err(TasksError::StartBelowSequence { start, next });
        }
        Some(start) => start,
        None => next,
    };

    let mut planned = Vec::new();
    let mut wbs = first;
    for (idx, subtask) in plan_subtasks(requirement).into_iter().enumerate() {
        if idx > 0 {
            wbs = wbs.next()?;
        }
        let slug = slugify(&subtask.name);
        store.ensure_unused(wbs, &slug)?;
        planned.push(PlannedRecord {
            wbs,
            path: store.record_path(wbs, &slug),
            subtask,
        });
    }

    if options.dry_run {
        return Ok(Decomposed {
            records: planned,
            board: None,
        });
    }

    if let Some(last) = planned.last() {
        record_allocation(&store, last.wbs)?;
    }
    let mut previous = None;
    for record in &planned {
        let content = render_subtask(
            &record.subtask,
            record.wbs,
            previous,
            parent,
            requirement,
            timestamp,
        );
        store.create_record(record.wbs, &slugify(&record.subtask.name), &content)?;
        previous = Some(record.wbs);
    }
    info!(count = planned.len(), "requirement decomposed");

    let board = board::sync(&store, &paths.board_file)?;
    Ok(Decomposed {
        records: planned,
        board: Some(board),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TasksConfig;
    use tempfile::TempDir;

    fn project() -> (TempDir, ProjectPaths) {
        let temp = TempDir::new().expect("tempdir");
        let paths = ProjectPaths::from_config(temp.path().to_path_buf(), TasksConfig::default());
        (temp, paths)
    }

    #[test]
    fn validate_name_rejects_blank_and_long_names() {
        let (_temp, paths) = project();
        assert!(matches!(validate_name(&paths, "  "), Err(TasksError::MissingName)));
        let long = "x".repeat(201);
        assert!(matches!(
            validate_name(&paths, &long),
            Err(TasksError::NameTooLong { len: 201, max: 200 })
        ));
        assert!(validate_name(&paths, &"x".repeat(200)).is_ok());
    }

    #[test]
    fn validate_name_rejects_control_characters() {
        let (_temp, paths) = project();
        for name in ["x\nstatus: Done", "tab\there", "bell\u{7}"] {
            assert!(
                matches!(validate_name(&paths, name), Err(TasksError::InvalidName(_))),
                "{name:?}"
            );
        }
    }

    #[test]
    fn injected_header_line_is_never_written() {
        let (_temp, paths) = project();
        init(&paths).expect("init");
        let err = create_task(&paths, "x\nstatus: Done", "2026-01-01 09:00:00")
            .expect_err("control character");
        assert!(matches!(err, TasksError::InvalidName(_)));
        assert!(paths.store().list_records().expect("list").is_empty());
    }

    #[test]
    fn failed_record_write_still_consumes_the_id() {
        let (_temp, paths) = project();
        init(&paths).expect("init");
        let store = paths.store();
        fs::create_dir(store.record_path(Wbs::new(1).expect("1"), "Blocked")).expect("blocker");

        let err = create_task(&paths, "Blocked", "2026-01-01 09:00:00").expect_err("write");
        assert!(matches!(err, TasksError::Store(_)));
        assert!(store.list_records().expect("list").is_empty());
        assert_eq!(
            crate::wbs::read_sequence(&paths.sequence_file()).expect("sequence"),
            Some(Wbs::new(1).expect("1"))
        );

        let created = create_task(&paths, "Blocked", "2026-01-01 09:00:00").expect("retry");
        assert_eq!(created.wbs.to_string(), "0002");
        assert_eq!(created.board.len(), 1);
    }

    #[test]
    fn decompose_links_first_subtask_to_parent() {
        let (_temp, paths) = project();
        init(&paths).expect("init");
        create_task(&paths, "Login epic", "2026-01-01 09:00:00").expect("parent");

        let options = DecomposeOptions {
            parent: Some("1"),
            ..DecomposeOptions::default()
        };
        let outcome =
            decompose(&paths, "Add OAuth", options, "2026-01-01 09:00:00").expect("decompose");
        let store = paths.store();
        let first = store.find(outcome.records[0].wbs).expect("first");
        let second = store.find(outcome.records[1].wbs).expect("second");
        assert_eq!(store.read_header(&first).expect("first").get("parent"), Some("0001"));
        assert_eq!(store.read_header(&second).expect("second").get("parent"), None);
    }

    #[test]
    fn decompose_rejects_missing_parent() {
        let (_temp, paths) = project();
        init(&paths).expect("init");
        let options = DecomposeOptions {
            parent: Some("42"),
            ..DecomposeOptions::default()
        };
        let err = decompose(&paths, "Add OAuth", options, "2026-01-01 09:00:00")
            .expect_err("missing parent");
        assert!(matches!(err, TasksError::Store(_)));
        assert!(paths.store().list_records().expect("list").is_empty());
    }

    #[test]
    fn create_without_template_writes_nothing() {
        let (_temp, paths) = project();
        init(&paths).expect("init");
        fs::remove_file(&paths.template_file).expect("remove template");

        let err = create_task(&paths, "Orphan", "2026-01-01 09:00:00").expect_err("template");
        assert!(matches!(err, TasksError::Template(_)));
        assert!(paths.store().list_records().expect("list").is_empty());
    }

    #[test]
    fn init_folds_existing_records_into_new_board() {
        let (_temp, paths) = project();
        fs::create_dir_all(&paths.records_dir).expect("dir");
        fs::write(paths.records_dir.join("0001_seed.md"), "status: Done\n").expect("seed");

        let report = init(&paths).expect("init");
        assert!(!report.created_dir);
        assert!(report.created_board);
        let text = fs::read_to_string(&paths.board_file).expect("board");
        assert!(text.contains("## Done\n\n- [x] 0001_seed\n"));
    }

    #[test]
    fn decompose_rejects_start_below_sequence() {
        let (_temp, paths) = project();
        init(&paths).expect("init");
        create_task(&paths, "First", "2026-01-01 09:00:00").expect("create");

        let options = DecomposeOptions {
            start: Some("1"),
            ..DecomposeOptions::default()
        };
        let err = decompose(&paths, "Add OAuth", options, "2026-01-01 09:00:00")
            .expect_err("below");
        assert!(matches!(err, TasksError::StartBelowSequence { .. }));
    }

    #[test]
    fn decompose_dry_run_writes_nothing() {
        let (_temp, paths) = project();
        init(&paths).expect("init");

        let options = DecomposeOptions {
            dry_run: true,
            ..DecomposeOptions::default()
        };
        let outcome =
            decompose(&paths, "Add OAuth", options, "2026-01-01 09:00:00").expect("dry run");
        assert_eq!(outcome.records.len(), 4);
        assert!(outcome.board.is_none());
        assert!(paths.store().list_records().expect("list").is_empty());
    }
}
