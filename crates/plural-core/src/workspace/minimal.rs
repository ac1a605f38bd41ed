//! Minimal workspace for diff commands.

use std::path::{Path, PathBuf};

use crate::context::AppContext;
use crate::diff;
use crate::provider::{self, Provider};

/// Name, provider and repository root: enough to run diffs.
#[derive(Debug, Clone)]
pub struct MinimalWorkspace {
    pub name: String,
    pub provider: Provider,
    repo_root: PathBuf,
}

impl MinimalWorkspace {
    pub fn new(name: String, provider: Provider, repo_root: PathBuf) -> Self {
        Self {
            name,
            provider,
            repo_root,
        }
    }

    /// Load without contacting the API.
    pub fn load(app: &AppContext, name: &str) -> anyhow::Result<Self> {
        let repo_root = app.repo_root()?;
        let provider =
            provider::bootstrap(&app.manifest_path(name)?, &app.project_manifest_path())?;
        Ok(Self::new(name.to_string(), provider, repo_root))
    }

    pub fn repo_root(&self) -> &Path {
        &self.repo_root
    }

    pub fn workspace_root(&self) -> PathBuf {
        self.repo_root.join(&self.name)
    }

    /// `helm diff upgrade` against the repository's chart.
    pub fn diff_helm(&self) -> anyhow::Result<PathBuf> {
        let chart = self.workspace_root().join("helm").join(&self.name);
        let chart = chart.to_string_lossy();
        let name = self.name.as_str();
        self.run_diff(
            "helm",
            &[
                "diff",
                "upgrade",
                "--show-secrets",
                "--install",
                "--namespace",
                name,
                name,
                chart.as_ref(),
            ],
            None,
        )
    }

    /// `terraform plan` in the repository's terraform directory.
    pub fn diff_terraform(&self) -> anyhow::Result<PathBuf> {
        let dir = self.workspace_root().join("terraform");
        self.run_diff("terraform", &["plan"], Some(&dir))
    }

    /// Run a diff command, capturing stdout under `<repo_root>/diffs/<name>/`.
    pub fn run_diff(
        &self,
        command: &str,
        args: &[&str],
        workdir: Option<&Path>,
    ) -> anyhow::Result<PathBuf> {
        diff::run_captured(&self.repo_root, &self.name, command, args, workdir)
    }
}
