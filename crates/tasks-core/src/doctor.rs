use std::path::Path;

use serde::Serialize;
use serde_json::json;

use crate::board::Board;
use crate::project::ProjectPaths;
use crate::template::Template;
use crate::wbs::{read_sequence, Wbs};

#[derive(Debug, Clone, Serialize)]
pub struct CheckItem {
    pub name: &'static str,
    pub ok: bool,
    pub detail: String,
}

/// Readiness report for `tasks check`.
#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    pub ready: bool,
    pub items: Vec<CheckItem>,
    /// Blocking problems.
    pub issues: Vec<String>,
    /// Problems that do not block any command.
    pub warnings: Vec<String>,
}

impl CheckReport {
    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "ready": self.ready,
            "items": self.items,
            "issues": self.issues,
            "warnings": self.warnings,
        })
    }
}

fn path_item(name: &'static str, path: &Path, ok: bool) -> CheckItem {
    CheckItem {
        name,
        ok,
        detail: path.to_string_lossy().to_string(),
    }
}

pub fn check_report(paths: &ProjectPaths) -> CheckReport {
    let mut items = Vec::new();
    let mut issues = Vec::new();
    let mut warnings = Vec::new();

    let records_ok = paths.records_dir.is_dir();
    items.push(path_item("records_dir", &paths.records_dir, records_ok));
    if !records_ok {
        issues.push(format!(
            "Records directory not found: {}",
            paths.records_dir.display()
        ));
    }

    let board_ok = paths.board_file.is_file();
    items.push(path_item("board", &paths.board_file, board_ok));
    if !board_ok {
        issues.push(format!("Kanban file not found: {}", paths.board_file.display()));
    }

    match Template::load(&paths.template_file) {
        Ok(template) => {
            items.push(path_item("template", &paths.template_file, true));
            let legacy = template.legacy_placeholders();
            if !legacy.is_empty() {
                warnings.push(format!(
                    "Template uses the retired '{{ {{ KEY }} }}' spelling for {}; rewrite as {{{{KEY}}}}",
                    legacy.join(", ")
                ));
            }
            let unknown = template.unknown_placeholders();
            if !unknown.is_empty() {
                warnings.push(format!(
                    "Template placeholders left unfilled by 'tasks create': {}",
                    unknown.join(", ")
                ));
            }
        }
        Err(err) => {
            items.push(path_item("template", &paths.template_file, false));
            issues.push(err.to_string());
        }
    }

    if records_ok {
        match Board::from_store(&paths.store()) {
            Ok(board) => {
                items.push(CheckItem {
                    name: "records",
                    ok: board.skipped.is_empty(),
                    detail: format!("{} on board, {} skipped", board.len(), board.skipped.len()),
                });
                for skipped in &board.skipped {
                    warnings.push(format!("Skipping {}: {}", skipped.file, skipped.reason));
                }
                check_duplicate_ids(&board, &mut warnings);
            }
            Err(err) => issues.push(err.to_string()),
        }
        if let Err(err) = read_sequence(&paths.sequence_file()) {
            issues.push(err.to_string());
        }
    }

    let pager = paths.config.pager.trim();
    if pager.is_empty() {
        items.push(CheckItem {
            name: "pager",
            ok: true,
            detail: "disabled".to_string(),
        });
    } else {
        match which::which(pager) {
            Ok(found) => items.push(CheckItem {
                name: "pager",
                ok: true,
                detail: found.to_string_lossy().to_string(),
            }),
            Err(_) => {
                items.push(CheckItem {
                    name: "pager",
                    ok: false,
                    detail: format!("'{pager}' not installed"),
                });
                warnings.push(format!(
                    "'{pager}' is not installed; boards are printed without it"
                ));
            }
        }
    }

    CheckReport {
        ready: issues.is_empty(),
        items,
        issues,
        warnings,
    }
}

fn check_duplicate_ids(board: &Board, warnings: &mut Vec<String>) {
    let mut ids: Vec<(Wbs, &str)> = board
        .entries()
        .filter_map(|entry| entry.wbs.map(|wbs| (wbs, entry.name.as_str())))
        .collect();
    ids.sort();
    for pair in ids.windows(2) {
        if pair[0].0 == pair[1].0 {
            warnings.push(format!(
                "Duplicate WBS {}: {} and {}",
                pair[0].0, pair[0].1, pair[1].1
            ));
        }
    }
}
