use std::fmt::Display;

use serde::Serialize;

pub fn info(message: impl Display) {
    println!("[INFO] {message}");
}

pub fn warn(message: impl Display) {
    eprintln!("[WARN] {message}");
}

pub fn error(message: impl Display) {
    eprintln!("[ERROR] {message}");
}

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{json}");
    Ok(())
}

/// One warning per record the board had to leave out.
pub fn skipped(board: &tasks_core::board::Board) {
    for record in &board.skipped {
        warn(format_args!("Skipping {}: {}", record.file, record.reason));
    }
}
