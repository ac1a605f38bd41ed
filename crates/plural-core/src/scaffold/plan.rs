//! Execution and diff plans persisted inside each workspace.
//!
//! A plan is an ordered list of steps. Each step records the fingerprint of
//! its target from the last successful run, which survives regeneration of
//! the default plan.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::CONTROL_DIR;

/// Which plan a file holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanKind {
    Execution,
    Diff,
}

impl PlanKind {
    /// File name under the control directory.
    pub fn file_name(&self) -> &'static str {
        match self {
            PlanKind::Execution => "deploy",
            PlanKind::Diff => "diff",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanMetadata {
    /// Workspace directory relative to the repository root
    pub path: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub name: String,
    pub wkdir: String,
    pub target: String,
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub sha: String,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub retries: u32,
}

fn is_zero(n: &u32) -> bool {
    *n == 0
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub metadata: PlanMetadata,
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Plan {
    /// Read the plan of `kind` stored in `workspace_root`.
    ///
    /// A missing or unreadable plan is `None`; callers regenerate defaults.
    pub fn load(workspace_root: &Path, kind: PlanKind) -> Option<Plan> {
        let path = plan_path(workspace_root, kind);
        let content = fs::read_to_string(&path).ok()?;
        match serde_yaml_ng::from_str(&content) {
            Ok(plan) => Some(plan),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "discarding unreadable plan");
                None
            }
        }
    }

    /// Default plan for the workspace at `path`, keeping step fingerprints
    /// recorded in `previous`.
    pub fn default_for(kind: PlanKind, path: &str, previous: Option<&Plan>) -> Plan {
        let recorded: HashMap<&str, &str> = previous
            .map(|p| {
                p.steps
                    .iter()
                    .map(|s| (s.name.as_str(), s.sha.as_str()))
                    .collect()
            })
            .unwrap_or_default();

        let mut steps = match kind {
            PlanKind::Execution => default_execution_steps(path),
            PlanKind::Diff => default_diff_steps(path),
        };
        for step in &mut steps {
            if let Some(sha) = recorded.get(step.name.as_str()) {
                step.sha = sha.to_string();
            }
        }

        Plan {
            metadata: PlanMetadata {
                path: path.to_string(),
                name: kind.file_name().to_string(),
            },
            steps,
        }
    }

    /// Write the plan under `repo_root`, at `<path>/.plural/<name>`.
    pub fn flush(&self, repo_root: &Path) -> anyhow::Result<PathBuf> {
        let dir = repo_root.join(&self.metadata.path).join(CONTROL_DIR);
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create plan directory: {}", dir.display()))?;
        let path = dir.join(&self.metadata.name);
        let content = serde_yaml_ng::to_string(self)
            .with_context(|| format!("Failed to serialize plan {}", self.metadata.name))?;
        fs::write(&path, content)
            .with_context(|| format!("Failed to write plan: {}", path.display()))?;
        debug!(path = %path.display(), steps = self.steps.len(), "wrote plan");
        Ok(path)
    }

    pub fn step(&self, name: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.name == name)
    }
}

pub fn plan_path(workspace_root: &Path, kind: PlanKind) -> PathBuf {
    workspace_root.join(CONTROL_DIR).join(kind.file_name())
}

fn join(base: &str, rest: &str) -> String {
    format!("{base}/{rest}")
}

fn step(name: &str, wkdir: String, target: String, command: &str, args: &[&str]) -> Step {
    Step {
        name: name.to_string(),
        wkdir,
        target,
        command: command.to_string(),
        args: args.iter().map(|a| a.to_string()).collect(),
        sha: String::new(),
        retries: 0,
    }
}

fn default_execution_steps(path: &str) -> Vec<Step> {
    let terraform = join(path, "terraform");
    let nonce = join(path, ".plural/NONCE");
    vec![
        step(
            "terraform-init",
            terraform.clone(),
            terraform.clone(),
            "terraform",
            &["init", "-upgrade"],
        ),
        Step {
            retries: 2,
            ..step(
                "terraform",
                terraform.clone(),
                terraform.clone(),
                "terraform",
                &["apply", "-auto-approve"],
            )
        },
        step(
            "terraform-output",
            path.to_string(),
            terraform,
            "plural",
            &["output", "terraform", path],
        ),
        step("kube-init", path.to_string(), nonce, "plural", &["wkspace", "kube-init"]),
        step(
            "crds",
            path.to_string(),
            join(path, "crds"),
            "plural",
            &["wkspace", "crds", path],
        ),
        Step {
            retries: 2,
            ..step(
                "bounce",
                path.to_string(),
                join(path, "helm"),
                "plural",
                &["wkspace", "helm", path],
            )
        },
    ]
}

fn default_diff_steps(path: &str) -> Vec<Step> {
    let terraform = join(path, "terraform");
    vec![
        step("terraform-init", terraform.clone(), terraform.clone(), "terraform", &["init"]),
        step(
            "terraform",
            terraform.clone(),
            terraform,
            "plural",
            &["wkspace", "terraform-diff", path],
        ),
        step(
            "kube-init",
            path.to_string(),
            join(path, ".plural/NONCE"),
            "plural",
            &["wkspace", "kube-init"],
        ),
        step(
            "helm",
            path.to_string(),
            join(path, "helm"),
            "plural",
            &["wkspace", "helm-diff", path],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_plan_keeps_recorded_shas() {
        let mut previous = Plan::default_for(PlanKind::Execution, "api", None);
        previous.steps[1].sha = "tf-sha".to_string();
        previous.steps.push(step("custom", "api".into(), "api".into(), "echo", &[]));

        let plan = Plan::default_for(PlanKind::Execution, "api", Some(&previous));
        assert_eq!(plan.step("terraform").unwrap().sha, "tf-sha");
        assert_eq!(plan.step("bounce").unwrap().sha, "");
        assert!(plan.step("custom").is_none());
        assert_eq!(plan.metadata.name, "deploy");
    }

    #[test]
    fn flush_then_load() {
        let temp = TempDir::new().unwrap();
        let plan = Plan::default_for(PlanKind::Diff, "api", None);
        let path = plan.flush(temp.path()).unwrap();

        assert_eq!(path, temp.path().join("api/.plural/diff"));
        let loaded = Plan::load(&temp.path().join("api"), PlanKind::Diff).unwrap();
        assert_eq!(loaded, plan);
    }

    #[test]
    fn corrupt_plan_loads_as_none() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join(CONTROL_DIR);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("deploy"), "steps: [[[").unwrap();
        assert!(Plan::load(temp.path(), PlanKind::Execution).is_none());
    }

    #[test]
    fn kube_init_targets_nonce() {
        let plan = Plan::default_for(PlanKind::Execution, "api", None);
        assert_eq!(plan.step("kube-init").unwrap().target, "api/.plural/NONCE");
    }
}
