use std::process::ExitCode;

use anyhow::Context;
use tasks_core::ops;
use tasks_core::project::ProjectPaths;
use tasks_core::status::now_timestamp;

use crate::output;

pub fn create(paths: &ProjectPaths, name: &str) -> anyhow::Result<ExitCode> {
    let created = ops::create_task(paths, name, &now_timestamp())?;
    output::skipped(&created.board);
    output::info(format_args!("Created {}", created.record.path.display()));
    Ok(ExitCode::SUCCESS)
}

pub fn update(paths: &ProjectPaths, wbs: &str, status: &str) -> anyhow::Result<ExitCode> {
    let updated = ops::update_task(paths, wbs, status, &now_timestamp())?;
    output::skipped(&updated.board);
    output::info(format_args!(
        "Updated {} to {}",
        updated.record.display_name(),
        updated.status
    ));
    Ok(ExitCode::SUCCESS)
}

pub fn open(paths: &ProjectPaths, wbs: &str) -> anyhow::Result<ExitCode> {
    let record = ops::locate(paths, wbs)?;
    open::that(&record.path)
        .with_context(|| format!("failed to open {}", record.path.display()))?;
    output::info(format_args!("Opened {}", record.path.display()));
    Ok(ExitCode::SUCCESS)
}
