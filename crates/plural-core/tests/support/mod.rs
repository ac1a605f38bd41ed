#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::Path;
use std::rc::Rc;

use plural_core::api::{
    AppliedLock, Chart, ChartInstallation, Installation, InstallationSource, LedgerClient,
    PackageInstallations, Repository, Terraform, TerraformInstallation, Version,
};
use plural_core::config::PluralConfig;
use plural_core::context::AppContext;
use plural_core::manifest::context::context_path;
use plural_core::manifest::{Context, ProjectManifest};

/// Remote ledger held in memory; clones share state.
#[derive(Clone, Default)]
pub struct MemoryLedger {
    blobs: Rc<RefCell<HashMap<String, String>>>,
    pub fail_acquire: bool,
    pub fail_release: bool,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unreachable() -> Self {
        Self {
            fail_acquire: true,
            fail_release: true,
            ..Self::default()
        }
    }

    pub fn rejecting_release() -> Self {
        Self {
            fail_release: true,
            ..Self::default()
        }
    }

    pub fn blob(&self, repo: &str) -> Option<String> {
        self.blobs.borrow().get(repo).cloned()
    }

    pub fn boxed(&self) -> Box<dyn LedgerClient> {
        Box::new(self.clone())
    }
}

impl LedgerClient for MemoryLedger {
    fn acquire(&self, repo: &str) -> anyhow::Result<AppliedLock> {
        if self.fail_acquire {
            anyhow::bail!("connection refused");
        }
        Ok(AppliedLock {
            lock: self.blob(repo).unwrap_or_default(),
        })
    }

    fn release(&self, repo: &str, blob: &str) -> anyhow::Result<()> {
        if self.fail_release {
            anyhow::bail!("connection refused");
        }
        self.blobs
            .borrow_mut()
            .insert(repo.to_string(), blob.to_string());
        Ok(())
    }
}

/// Installation source answering from fixed data.
pub struct StaticInstallations {
    pub packages: Option<PackageInstallations>,
}

impl StaticInstallations {
    pub fn with_api_chart() -> Self {
        Self {
            packages: Some(PackageInstallations {
                charts: vec![ChartInstallation {
                    id: "ci-1".to_string(),
                    chart: Chart {
                        id: "chart-1".to_string(),
                        name: "api".to_string(),
                    },
                    version: Version {
                        id: "cv-1".to_string(),
                        version: "0.3.1".to_string(),
                    },
                }],
                terraform: vec![TerraformInstallation {
                    id: "ti-1".to_string(),
                    terraform: Terraform {
                        id: "tf-1".to_string(),
                        name: "aws".to_string(),
                    },
                    version: Version {
                        id: "tv-1".to_string(),
                        version: "0.1.0".to_string(),
                    },
                }],
            }),
        }
    }

    pub fn failing() -> Self {
        Self { packages: None }
    }
}

impl InstallationSource for StaticInstallations {
    fn installation(&self, repo: &str) -> anyhow::Result<Installation> {
        Ok(installation(repo))
    }

    fn package_installations(&self, repository_id: &str) -> anyhow::Result<PackageInstallations> {
        self.packages
            .clone()
            .ok_or_else(|| anyhow::anyhow!("repository {} not found", repository_id))
    }
}

pub fn installation(name: &str) -> Installation {
    Installation {
        id: format!("inst-{name}"),
        repository: Repository {
            id: format!("repo-{name}"),
            name: name.to_string(),
        },
        license: Some("license-key".to_string()),
    }
}

pub fn project_manifest() -> ProjectManifest {
    ProjectManifest {
        cluster: "prod".to_string(),
        bucket: "acme-state".to_string(),
        project: "acme".to_string(),
        provider: "aws".to_string(),
        region: "us-east-1".to_string(),
        ..ProjectManifest::default()
    }
}

/// Deployment repository with project manifest and context, rooted at `root`.
pub fn deployment_repo(root: &Path) -> AppContext {
    deployment_repo_with(root, PluralConfig::default())
}

pub fn deployment_repo_with(root: &Path, config: PluralConfig) -> AppContext {
    project_manifest()
        .write(&root.join("workspace.yaml"))
        .unwrap();
    Context::default().write(&context_path(root)).unwrap();
    AppContext::new(
        root.to_path_buf(),
        root.join(".config"),
        config,
    )
    .with_repo_root(root.to_path_buf())
}
