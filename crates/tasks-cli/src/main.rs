mod cmd;
mod output;
mod pager;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser, Subcommand};
use tasks_core::ops::DecomposeOptions;
use tasks_core::project::ProjectPaths;

#[derive(Parser)]
#[command(
    name = "tasks",
    about = "File-backed task tracker with a generated kanban board",
    version
)]
struct Cli {
    /// Directory inside the project (default: current directory)
    #[arg(long, global = true, env = "TASKS_ROOT")]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Create the records directory, kanban board and template
    Init,

    /// Create a task from the template
    Create {
        /// Task name (multiple words are joined with spaces)
        #[arg(required = true, num_args = 1..)]
        name: Vec<String>,
    },

    /// Show the kanban board, or a single status section
    List {
        /// Backlog, Todo, WIP, Testing or Done
        status: Option<String>,

        /// Print the board computed from the records as JSON
        #[arg(long)]
        json: bool,
    },

    /// Move a task to a new status
    Update {
        /// Task id, e.g. 0001 or 1
        wbs: String,
        /// Backlog, Todo, WIP, Testing or Done
        status: String,
    },

    /// Open a task file in the default viewer
    Open {
        /// Task id, e.g. 0001 or 1
        wbs: String,
    },

    /// Rebuild the kanban board from the task files
    Refresh,

    /// Report whether the project is ready to use
    Check {
        #[arg(long)]
        json: bool,
    },

    /// Break a requirement down into sequential tasks
    Decompose {
        /// Requirement text (multiple words are joined with spaces)
        #[arg(required = true, num_args = 1..)]
        requirement: Vec<String>,

        /// First id to use instead of the next free one
        #[arg(long)]
        start: Option<String>,

        /// Existing task the first subtask belongs to
        #[arg(long)]
        parent: Option<String>,

        /// Show the planned tasks without writing them
        #[arg(long)]
        dry_run: bool,
    },
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("error"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn resolve_paths(root: Option<PathBuf>) -> anyhow::Result<ProjectPaths> {
    let start = match root {
        Some(root) => root,
        None => std::env::current_dir().context("failed to read current directory")?,
    };
    let paths = ProjectPaths::resolve(&start)?;
    tracing::debug!(root = %paths.root.display(), records = %paths.records_dir.display(), "project resolved");
    Ok(paths)
}

fn run(root: Option<PathBuf>, command: Command) -> anyhow::Result<ExitCode> {
    let paths = resolve_paths(root)?;
    match command {
        Command::Init => cmd::init::run(&paths),
        Command::Create { name } => cmd::task::create(&paths, &name.join(" ")),
        Command::List { status, json } => cmd::board::list(&paths, status.as_deref(), json),
        Command::Update { wbs, status } => cmd::task::update(&paths, &wbs, &status),
        Command::Open { wbs } => cmd::task::open(&paths, &wbs),
        Command::Refresh => cmd::board::refresh(&paths),
        Command::Check { json } => cmd::check::run(&paths, json),
        Command::Decompose {
            requirement,
            start,
            parent,
            dry_run,
        } => cmd::decompose::run(
            &paths,
            &requirement.join(" "),
            DecomposeOptions {
                start: start.as_deref(),
                parent: parent.as_deref(),
                dry_run,
            },
        ),
    }
}

fn main() -> ExitCode {
    init_tracing();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            return match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                    let _ = err.print();
                    ExitCode::SUCCESS
                }
                _ => {
                    let rendered = err.to_string();
                    output::error(rendered.trim_start_matches("error: ").trim_end());
                    ExitCode::FAILURE
                }
            };
        }
    };

    let Some(command) = cli.command else {
        if let Err(err) = Cli::command().print_help() {
            output::error(&err);
            return ExitCode::FAILURE;
        }
        println!();
        return ExitCode::SUCCESS;
    };

    match run(cli.root, command) {
        Ok(code) => code,
        Err(err) => {
            output::error(format!("{err:#}"));
            ExitCode::FAILURE
        }
    }
}
