pub mod board;
pub mod check;
pub mod decompose;
pub mod init;
pub mod task;
