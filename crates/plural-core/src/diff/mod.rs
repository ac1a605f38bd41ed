//! Captured diff commands.
//!
//! Diff output is streamed to the terminal and persisted under
//! `<root>/diffs/<component>/<command>` for later inspection.

pub mod tee;

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

use anyhow::Context;
use thiserror::Error;
use tracing::{debug, info, warn};

pub use tee::TeeWriter;

pub const DIFFS_DIR: &str = "diffs";

#[derive(Debug, Error)]
pub enum DiffError {
    #[error("failed to start {command}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("{command} exited with {status}")]
    Failed { command: String, status: ExitStatus },

    #[error("failed to capture output of {command}")]
    Capture {
        command: String,
        #[source]
        source: io::Error,
    },
}

/// `<root>/diffs/<component>`, created when absent.
pub fn diff_folder(root: &Path, component: &str) -> anyhow::Result<PathBuf> {
    let folder = root.join(DIFFS_DIR).join(component);
    fs::create_dir_all(&folder)
        .with_context(|| format!("Failed to create diff folder: {}", folder.display()))?;
    Ok(folder)
}

/// Run `command` with stdout copied to the terminal and to the capture file.
///
/// Returns the capture file path. The command's failure is returned as-is
/// once the captured bytes have been flushed to disk.
pub fn run_captured(
    root: &Path,
    component: &str,
    command: &str,
    args: &[&str],
    workdir: Option<&Path>,
) -> anyhow::Result<PathBuf> {
    run_captured_into(root, component, command, args, workdir, io::stdout().lock())
}

/// As [`run_captured`], copying output to `terminal` instead of stdout.
pub fn run_captured_into<W: Write>(
    root: &Path,
    component: &str,
    command: &str,
    args: &[&str],
    workdir: Option<&Path>,
    terminal: W,
) -> anyhow::Result<PathBuf> {
    let folder = diff_folder(root, component)?;
    let capture_path = folder.join(capture_name(command));
    let file = File::create(&capture_path)
        .with_context(|| format!("Failed to create {}", capture_path.display()))?;

    info!(command, args = ?args, capture = %capture_path.display(), "running diff");
    capture(command, args, workdir, TeeWriter::new(file, terminal))?;
    Ok(capture_path)
}

fn capture<A: Write, B: Write>(
    command: &str,
    args: &[&str],
    workdir: Option<&Path>,
    mut sink: TeeWriter<A, B>,
) -> Result<(), DiffError> {
    // `sink` writes the capture file first; the terminal mirror is best effort.
    let mut cmd = Command::new(command);
    cmd.args(args).stdin(Stdio::null()).stdout(Stdio::piped());
    if let Some(dir) = workdir {
        cmd.current_dir(dir);
    }

    let mut child = cmd.spawn().map_err(|source| DiffError::Spawn {
        command: command.to_string(),
        source,
    })?;

    let copied = match child.stdout.take() {
        Some(mut stdout) => {
            io::copy(&mut stdout, &mut sink).and_then(|n| sink.flush().map(|_| n))
        }
        None => Ok(0),
    };
    if let Some(err) = sink.take_secondary_error() {
        let reason = err.to_string();
        warn!(command, %reason, "terminal output stopped, capture file is complete");
    }
    let status = child.wait().map_err(|source| DiffError::Capture {
        command: command.to_string(),
        source,
    })?;

    let copied = copied.map_err(|source| DiffError::Capture {
        command: command.to_string(),
        source,
    })?;
    debug!(command, bytes = copied, status = %status, "diff finished");

    if !status.success() {
        return Err(DiffError::Failed {
            command: command.to_string(),
            status,
        });
    }
    Ok(())
}

/// Capture file name for a command, which may be given as a path.
fn capture_name(command: &str) -> String {
    Path::new(command)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| command.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_name_strips_directories() {
        assert_eq!(capture_name("/usr/bin/helm"), "helm");
        assert_eq!(capture_name("terraform"), "terraform");
    }

    #[test]
    fn diff_folder_is_created() {
        let temp = tempfile::TempDir::new().unwrap();
        let folder = diff_folder(temp.path(), "api").unwrap();
        assert_eq!(folder, temp.path().join("diffs").join("api"));
        assert!(folder.is_dir());
    }
}
