//! Core domain for the `tasks` CLI: file-backed task records, WBS id
//! allocation, the status state machine, record templates and the derived
//! kanban board.

pub mod board;
pub mod config;
pub mod decompose;
pub mod doctor;
pub mod error;
pub mod io;
pub mod lock;
pub mod ops;
pub mod project;
pub mod status;
pub mod store;
pub mod template;
pub mod wbs;

pub use error::{Result, TasksError};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
