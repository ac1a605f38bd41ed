//! Helpers for managing .pluralignore entries.

use std::fs;
use std::path::Path;

use anyhow::Context;

pub const IGNORE_FILE: &str = ".pluralignore";

/// Transient paths inside a workspace that are never deployable content.
pub const DEFAULT_IGNORES: [&str; 2] = ["terraform/.terraform", "helm/*/charts/*.tgz"];

/// Append `entry` to `<workspace_root>/.pluralignore` unless already present.
pub fn ensure_ignore(workspace_root: &Path, entry: &str) -> anyhow::Result<()> {
    if entry.contains('\n') || entry.contains('\r') {
        anyhow::bail!("ignore entry contains newline");
    }

    let ignore_path = workspace_root.join(IGNORE_FILE);
    let existing = if ignore_path.exists() {
        fs::read_to_string(&ignore_path)
            .with_context(|| format!("Failed to read {}", ignore_path.display()))?
    } else {
        String::new()
    };

    if existing.lines().any(|line| line.trim() == entry) {
        return Ok(());
    }

    let mut next = existing;
    if !next.is_empty() && !next.ends_with('\n') {
        next.push('\n');
    }
    next.push_str(entry);
    next.push('\n');

    fs::write(&ignore_path, next)
        .with_context(|| format!("Failed to write {}", ignore_path.display()))?;
    Ok(())
}

/// Register every default ignore rule for a workspace.
pub fn ensure_default_ignores(workspace_root: &Path) -> anyhow::Result<()> {
    for entry in DEFAULT_IGNORES {
        ensure_ignore(workspace_root, entry)?;
    }
    Ok(())
}
