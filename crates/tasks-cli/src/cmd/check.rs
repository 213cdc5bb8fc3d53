use std::process::ExitCode;

use tasks_core::doctor::check_report;
use tasks_core::project::ProjectPaths;

use crate::output;

pub fn run(paths: &ProjectPaths, json: bool) -> anyhow::Result<ExitCode> {
    let report = check_report(paths);

    if json {
        output::print_json(&report.to_json())?;
    } else {
        for item in &report.items {
            let mark = if item.ok { "ok" } else { "missing" };
            println!("{:<12} {:<8} {}", item.name, mark, item.detail);
        }
        for warning in &report.warnings {
            output::warn(warning);
        }
        for issue in &report.issues {
            output::error(issue);
        }
        if report.ready {
            output::info("Project is ready.");
        }
    }

    Ok(if report.ready {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
