//! Application context for unified dependency injection.

use std::path::{Path, PathBuf};

use crate::api::LedgerClient;
use crate::config::{ConfigStore, PluralConfig};
use crate::coordination::LockCoordinator;
use crate::git;
use crate::lockfile::LockfileStore;
use crate::manifest::context::context_path;

/// File name of the project manifest in the project root.
pub const PROJECT_MANIFEST: &str = "workspace.yaml";

/// File name of a repository manifest inside its workspace directory.
pub const REPO_MANIFEST: &str = "manifest.yaml";

/// Unified application context for dependency injection.
///
/// Holds the paths and configuration of one invocation. Frontends create it
/// once and pass it to workspace assembly and coordination.
#[derive(Debug, Clone)]
pub struct AppContext {
    project_root: PathBuf,
    repo_root: Option<PathBuf>,
    config_dir: PathBuf,
    config: PluralConfig,
}

impl AppContext {
    /// Create a new context with explicit paths and configuration.
    pub fn new(project_root: PathBuf, config_dir: PathBuf, config: PluralConfig) -> Self {
        Self {
            project_root,
            repo_root: None,
            config_dir,
            config,
        }
    }

    /// Load the configuration from `config_dir` and build a context.
    pub fn load(project_root: PathBuf, config_dir: PathBuf) -> anyhow::Result<Self> {
        let config = ConfigStore::from_dir(&config_dir).load()?;
        Ok(Self::new(project_root, config_dir, config))
    }

    /// Pin the repository root instead of discovering it through git.
    pub fn with_repo_root(mut self, repo_root: PathBuf) -> Self {
        self.repo_root = Some(repo_root);
        self
    }

    /// Override the lock profile from the configuration.
    pub fn with_lock_profile(mut self, profile: Option<String>) -> Self {
        if profile.is_some() {
            self.config.lock_profile = profile;
        }
        self
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn config(&self) -> &PluralConfig {
        &self.config
    }

    /// Root of the deployment repository.
    pub fn repo_root(&self) -> anyhow::Result<PathBuf> {
        match &self.repo_root {
            Some(root) => Ok(root.clone()),
            None => git::repo_root(&self.project_root),
        }
    }

    pub fn project_manifest_path(&self) -> PathBuf {
        self.project_root.join(PROJECT_MANIFEST)
    }

    /// `<repo_root>/<repo>/manifest.yaml`
    pub fn manifest_path(&self, repo: &str) -> anyhow::Result<PathBuf> {
        Ok(self.repo_root()?.join(repo).join(REPO_MANIFEST))
    }

    pub fn context_path(&self) -> anyhow::Result<PathBuf> {
        Ok(context_path(&self.repo_root()?))
    }

    /// Get a ConfigStore for the config directory.
    pub fn config_store(&self) -> ConfigStore {
        ConfigStore::from_dir(&self.config_dir)
    }

    /// Get a LockfileStore for the configured profile.
    pub fn lockfile_store(&self) -> LockfileStore {
        LockfileStore::new(self.config.lock_profile.clone())
    }

    /// Get a LockCoordinator, using `remote` when the configuration allows.
    pub fn coordinator(&self, remote: Option<Box<dyn LedgerClient>>) -> LockCoordinator {
        LockCoordinator::from_config(&self.config, remote)
    }
}
