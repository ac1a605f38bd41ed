//! Repository root discovery.

use std::path::{Path, PathBuf};

use git2::Repository;

/// Root of the working tree containing `start`.
pub fn repo_root(start: &Path) -> anyhow::Result<PathBuf> {
    let repo = Repository::discover(start).map_err(|e| {
        anyhow::anyhow!(
            "Not inside a git repository: {} ({})",
            start.display(),
            e.message()
        )
    })?;
    let workdir = repo.workdir().ok_or_else(|| {
        anyhow::anyhow!("Repository has no working tree: {}", repo.path().display())
    })?;
    Ok(workdir.canonicalize().unwrap_or_else(|_| workdir.to_path_buf()))
}
