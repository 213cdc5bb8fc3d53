use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

use anyhow::Context;

use crate::output;

/// Whether the configured pager can be launched. An empty pager means plain output.
pub fn available(pager: &str) -> bool {
    let pager = pager.trim();
    pager.is_empty() || which::which(pager).is_ok()
}

/// Show `content` through `pager`, falling back to stdout when it is unset,
/// not installed or fails.
pub fn show(pager: &str, content: &str) {
    let pager = pager.trim();
    if pager.is_empty() {
        print!("{content}");
        return;
    }
    let Ok(program) = which::which(pager) else {
        output::warn(format_args!("'{pager}' not found; printing plain text"));
        print!("{content}");
        return;
    };

    if let Err(err) = page(&program, content) {
        output::warn(format_args!("{err:#}; printing plain text"));
        print!("{content}");
    }
}

fn page(program: &Path, content: &str) -> anyhow::Result<()> {
    let mut child = Command::new(program)
        .stdin(Stdio::piped())
        .spawn()
        .with_context(|| format!("failed to start {}", program.display()))?;
    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(content.as_bytes())
            .with_context(|| format!("failed to write to {}", program.display()))?;
    }
    let status = child
        .wait()
        .with_context(|| format!("failed to wait for {}", program.display()))?;
    if !status.success() {
        anyhow::bail!("{} exited with {status}", program.display());
    }
    Ok(())
}
