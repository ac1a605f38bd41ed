//! Execution scaffolding: control files, ignore rules and the deploy plan.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::debug;

use super::ignore::ensure_default_ignores;
use super::nonce::{NONCE_LEN, random_token};
use super::plan::{Plan, PlanKind};
use super::{CONTROL_DIR, NONCE_FILE, ONCE_CONTENT, ONCE_FILE};

/// Prepares a workspace for the execution engine.
#[derive(Debug, Clone)]
pub struct ExecutionScaffolder {
    repo_root: PathBuf,
}

impl ExecutionScaffolder {
    pub fn new(repo_root: PathBuf) -> Self {
        Self { repo_root }
    }

    pub fn repo_root(&self) -> &Path {
        &self.repo_root
    }

    /// Scaffold the workspace named `name` and return the written plan.
    ///
    /// The marker is rewritten and the nonce regenerated on every call, so
    /// steps targeting the nonce run again after each prepare.
    pub fn scaffold(&self, name: &str) -> anyhow::Result<Plan> {
        let workspace_root = self.repo_root.join(name);
        let control = workspace_root.join(CONTROL_DIR);
        fs::create_dir_all(&control)
            .with_context(|| format!("Failed to create {}", control.display()))?;

        let once = control.join(ONCE_FILE);
        fs::write(&once, ONCE_CONTENT)
            .with_context(|| format!("Failed to write {}", once.display()))?;

        let nonce = control.join(NONCE_FILE);
        fs::write(&nonce, random_token(NONCE_LEN))
            .with_context(|| format!("Failed to write {}", nonce.display()))?;

        ensure_default_ignores(&workspace_root)?;

        let previous = Plan::load(&workspace_root, PlanKind::Execution);
        let plan = Plan::default_for(PlanKind::Execution, name, previous.as_ref());
        plan.flush(&self.repo_root)?;
        debug!(workspace = name, "scaffolded execution");
        Ok(plan)
    }
}
