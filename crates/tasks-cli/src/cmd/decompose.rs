use std::process::ExitCode;

use tasks_core::ops::{self, DecomposeOptions};
use tasks_core::project::ProjectPaths;
use tasks_core::status::now_timestamp;

use crate::output;

pub fn run(
    paths: &ProjectPaths,
    requirement: &str,
    options: DecomposeOptions<'_>,
) -> anyhow::Result<ExitCode> {
    let outcome = ops::decompose(paths, requirement, options, &now_timestamp())?;

    if options.dry_run {
        output::info(format_args!(
            "Dry run: {} tasks would be created",
            outcome.records.len()
        ));
        for record in &outcome.records {
            println!("  {} {}", record.wbs, record.subtask.name);
            println!("       {}", record.subtask.description);
        }
        return Ok(ExitCode::SUCCESS);
    }

    if let Some(board) = &outcome.board {
        output::skipped(board);
    }
    for record in &outcome.records {
        output::info(format_args!("Created {}", record.path.display()));
    }
    Ok(ExitCode::SUCCESS)
}
