//! Diff scaffolding: materializes the diff plan.

use std::path::{Path, PathBuf};

use tracing::debug;

use super::plan::{Plan, PlanKind};

/// Prepares a workspace for diff runs.
#[derive(Debug, Clone)]
pub struct DiffScaffolder {
    repo_root: PathBuf,
}

impl DiffScaffolder {
    pub fn new(repo_root: PathBuf) -> Self {
        Self { repo_root }
    }

    pub fn repo_root(&self) -> &Path {
        &self.repo_root
    }

    pub fn scaffold(&self, name: &str) -> anyhow::Result<Plan> {
        let workspace_root = self.repo_root.join(name);
        let previous = Plan::load(&workspace_root, PlanKind::Diff);
        let plan = Plan::default_for(PlanKind::Diff, name, previous.as_ref());
        plan.flush(&self.repo_root)?;
        debug!(workspace = name, "scaffolded diff");
        Ok(plan)
    }
}
