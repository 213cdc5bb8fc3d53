use std::process::ExitCode;

use tasks_core::board::section_entries;
use tasks_core::ops;
use tasks_core::project::ProjectPaths;
use tasks_core::status::Status;

use crate::{output, pager};

pub fn list(paths: &ProjectPaths, status: Option<&str>, json: bool) -> anyhow::Result<ExitCode> {
    let status = status.map(str::parse::<Status>).transpose()?;

    if json {
        let board = ops::current_board(paths)?;
        output::skipped(&board);
        match status {
            Some(status) => output::print_json(&board.lane(status))?,
            None => output::print_json(&board)?,
        }
        return Ok(ExitCode::SUCCESS);
    }

    let text = ops::board_text(paths, status)?;
    pager::show(&paths.config.pager, &text);
    if let Some(status) = status {
        if section_entries(&text).is_empty() {
            output::info(format_args!("No tasks in {status}."));
        }
    }
    Ok(ExitCode::SUCCESS)
}

pub fn refresh(paths: &ProjectPaths) -> anyhow::Result<ExitCode> {
    let board = ops::refresh(paths)?;
    output::skipped(&board);
    if board.is_empty() {
        output::info(format_args!(
            "Rebuilt {} (no tasks yet)",
            paths.board_file.display()
        ));
    } else {
        output::info(format_args!(
            "Rebuilt {} ({} tasks)",
            paths.board_file.display(),
            board.len()
        ));
    }
    Ok(ExitCode::SUCCESS)
}
