use std::process::ExitCode;

use tasks_core::ops;
use tasks_core::project::ProjectPaths;

use crate::{output, pager};

pub fn run(paths: &ProjectPaths) -> anyhow::Result<ExitCode> {
    let report = ops::init(paths)?;

    if report.created_dir {
        output::info(format_args!(
            "Created records directory {}",
            report.records_dir.display()
        ));
    }
    if report.created_board {
        output::info(format_args!("Created {}", paths.board_file.display()));
    }
    if report.created_template {
        output::info(format_args!("Created {}", paths.template_file.display()));
    }
    if !(report.created_dir || report.created_board || report.created_template) {
        output::info("Already initialized; nothing to do.");
    }

    if !pager::available(&paths.config.pager) {
        output::warn(format_args!(
            "'{}' is not installed; 'tasks list' will print plain text",
            paths.config.pager.trim()
        ));
    }
    Ok(ExitCode::SUCCESS)
}
