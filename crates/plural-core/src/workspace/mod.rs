//! Workspace assembly and on-disk preparation.
//!
//! A [`Workspace`] is built once per deployment run from the API, the
//! manifests on disk and the operator configuration. [`Workspace::prepare`]
//! then materializes the repository directory, its manifest and the
//! execution and diff scaffolding.

pub mod minimal;

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use thiserror::Error;
use tracing::{debug, info};

use crate::api::{ChartInstallation, Installation, InstallationSource, TerraformInstallation};
use crate::config::PluralConfig;
use crate::context::AppContext;
use crate::coordination::{Acquired, LockCoordinator, Persisted};
use crate::lockfile::Lockfile;
use crate::manifest::{ComponentManifest, Context, Manifest, ProjectManifest};
use crate::provider::{self, Provider};
use crate::scaffold::{DiffScaffolder, ExecutionScaffolder};

pub use minimal::MinimalWorkspace;

/// Stage of assembly or preparation, reported with failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    ResolveInstallations,
    BootstrapProvider,
    ReadProjectManifest,
    ReadConfig,
    ReadContext,
    ResolveRoot,
    CreateDirectory,
    WriteManifest,
    ScaffoldExecution,
    ScaffoldDiff,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::ResolveInstallations => "resolve installations",
            Stage::BootstrapProvider => "bootstrap provider",
            Stage::ReadProjectManifest => "read project manifest",
            Stage::ReadConfig => "read config",
            Stage::ReadContext => "read context",
            Stage::ResolveRoot => "resolve repository root",
            Stage::CreateDirectory => "create workspace directory",
            Stage::WriteManifest => "write manifest",
            Stage::ScaffoldExecution => "scaffold execution",
            Stage::ScaffoldDiff => "scaffold diff",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error)]
#[error("failed to {stage} for {repo}")]
pub struct WorkspaceError {
    pub stage: Stage,
    pub repo: String,
    #[source]
    pub source: anyhow::Error,
}

trait StageExt<T> {
    fn stage(self, stage: Stage, repo: &str) -> Result<T, WorkspaceError>;
}

impl<T> StageExt<T> for anyhow::Result<T> {
    fn stage(self, stage: Stage, repo: &str) -> Result<T, WorkspaceError> {
        self.map_err(|source| WorkspaceError {
            stage,
            repo: repo.to_string(),
            source,
        })
    }
}

/// Everything needed to prepare and apply one repository.
#[derive(Debug, Clone)]
pub struct Workspace {
    pub provider: Provider,
    pub installation: Installation,
    pub charts: Vec<ChartInstallation>,
    pub terraform: Vec<TerraformInstallation>,
    pub config: PluralConfig,
    pub manifest: ProjectManifest,
    pub context: Context,
    app: AppContext,
}

impl Workspace {
    /// Assemble the workspace for `installation`.
    ///
    /// Fails on the first stage that fails; no partial workspace is returned.
    pub fn new(
        api: &dyn InstallationSource,
        app: &AppContext,
        installation: Installation,
    ) -> Result<Self, WorkspaceError> {
        let repo = installation.repository.name.clone();

        let packages = api
            .package_installations(&installation.repository.id)
            .stage(Stage::ResolveInstallations, &repo)?;

        let project_path = app.project_manifest_path();
        let provider = app
            .manifest_path(&repo)
            .and_then(|manifest_path| provider::bootstrap(&manifest_path, &project_path))
            .stage(Stage::BootstrapProvider, &repo)?;

        let manifest =
            ProjectManifest::read(&project_path).stage(Stage::ReadProjectManifest, &repo)?;

        let config = app
            .config()
            .validate()
            .map(|_| app.config().clone())
            .stage(Stage::ReadConfig, &repo)?;

        let context = app
            .context_path()
            .and_then(|path| Context::read(&path))
            .stage(Stage::ReadContext, &repo)?;

        debug!(
            repo = %repo,
            charts = packages.charts.len(),
            terraform = packages.terraform.len(),
            provider = %provider.kind,
            "assembled workspace"
        );

        Ok(Self {
            provider,
            installation,
            charts: packages.charts,
            terraform: packages.terraform,
            config,
            manifest,
            context,
            app: app.clone(),
        })
    }

    pub fn name(&self) -> &str {
        &self.installation.repository.name
    }

    /// `<repo_root>/<name>/manifest.yaml`
    pub fn manifest_path(&self) -> anyhow::Result<PathBuf> {
        self.app.manifest_path(self.name())
    }

    /// Derive the repository manifest from this workspace.
    ///
    /// `previous` supplies operator-edited fields that are not derived.
    pub fn build_manifest(&self, previous: Option<&Manifest>) -> Manifest {
        let repository = &self.installation.repository;
        Manifest {
            id: repository.id.clone(),
            name: repository.name.clone(),
            cluster: self.provider.cluster.clone(),
            project: self.provider.project.clone(),
            bucket: self.provider.bucket.clone(),
            provider: self.provider.kind.to_string(),
            region: self.provider.region.clone(),
            license: self.installation.license.clone().unwrap_or_default(),
            wait: previous.map(|p| p.wait).unwrap_or(false),
            charts: self
                .charts
                .iter()
                .map(|ci| ComponentManifest {
                    id: ci.chart.id.clone(),
                    name: ci.chart.name.clone(),
                    version_id: ci.version.id.clone(),
                    version: ci.version.version.clone(),
                })
                .collect(),
            terraform: self
                .terraform
                .iter()
                .map(|ti| ComponentManifest {
                    id: ti.terraform.id.clone(),
                    name: ti.terraform.name.clone(),
                    version_id: ti.version.id.clone(),
                    version: ti.version.version.clone(),
                })
                .collect(),
            dependencies: previous.map(|p| p.dependencies.clone()).unwrap_or_default(),
            context: self.manifest.context.clone(),
        }
    }

    /// Materialize the workspace on disk.
    ///
    /// Not transactional: artifacts from earlier stages stay in place when a
    /// later stage fails. Running it again is the recovery path.
    pub fn prepare(&self) -> Result<PathBuf, WorkspaceError> {
        let repo = self.name();

        let repo_root = self.app.repo_root().stage(Stage::ResolveRoot, repo)?;

        let workspace_root = repo_root.join(repo);
        mkdir(&workspace_root).stage(Stage::CreateDirectory, repo)?;

        let manifest_path = workspace_root.join(crate::context::REPO_MANIFEST);
        let previous = manifest_path
            .exists()
            .then(|| Manifest::read(&manifest_path).ok())
            .flatten();
        self.build_manifest(previous.as_ref())
            .write(&manifest_path)
            .stage(Stage::WriteManifest, repo)?;

        ExecutionScaffolder::new(repo_root.clone())
            .scaffold(repo)
            .stage(Stage::ScaffoldExecution, repo)?;

        DiffScaffolder::new(repo_root)
            .scaffold(repo)
            .stage(Stage::ScaffoldDiff, repo)?;

        info!(repo, path = %workspace_root.display(), "prepared workspace");
        Ok(workspace_root)
    }

    /// Prepare while holding the ledger for this repository.
    ///
    /// A coordinated ledger is released whether or not preparation succeeds.
    /// An uncoordinated one is flushed locally on success, unless the remote
    /// was configured but unreachable.
    pub fn prepare_with_ledger(&self, coordinator: &LockCoordinator) -> anyhow::Result<PathBuf> {
        let acquired = self.acquire_ledger(coordinator)?;
        let prepared = self.prepare();

        match &acquired {
            Acquired::Coordinated(lockfile) => {
                self.persist_ledger(coordinator, lockfile)?;
            }
            Acquired::Uncoordinated(lockfile) if prepared.is_ok() && !coordinator.has_remote() => {
                self.persist_ledger(coordinator, lockfile)?;
            }
            Acquired::Uncoordinated(_) => {}
        }
        Ok(prepared?)
    }

    /// Acquire the ledger for this repository through `coordinator`.
    pub fn acquire_ledger(&self, coordinator: &LockCoordinator) -> anyhow::Result<Acquired> {
        let manifest_path = self.manifest_path()?;
        Ok(coordinator.acquire(self.name(), &manifest_path))
    }

    /// Persist the ledger for this repository through `coordinator`.
    pub fn persist_ledger(
        &self,
        coordinator: &LockCoordinator,
        lockfile: &Lockfile,
    ) -> anyhow::Result<Persisted> {
        let manifest_path = self.manifest_path()?;
        Ok(coordinator.persist(self.name(), &manifest_path, lockfile)?)
    }

    /// Reduced view used by diff commands.
    pub fn to_minimal(&self) -> anyhow::Result<MinimalWorkspace> {
        Ok(MinimalWorkspace::new(
            self.name().to_string(),
            self.provider.clone(),
            self.app.repo_root()?,
        ))
    }
}

fn mkdir(path: &Path) -> anyhow::Result<()> {
    fs::create_dir_all(path).with_context(|| format!("Failed to create {}", path.display()))
}
