//! Ledger coordination across the remote authority and the local lockfile.
//!
//! A run acquires the ledger before touching anything and hands it back at
//! the end. Acquisition degrades instead of failing; releasing does not.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{info, warn};

use crate::api::LedgerClient;
use crate::config::{PluralConfig, RemoteFailurePolicy};
use crate::lockfile::{Lockfile, LockfileStore};

/// Ledger obtained for a run, tagged with how it was obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Acquired {
    /// The remote authority granted the ledger to this run.
    Coordinated(Lockfile),
    /// No remote coordination took place; concurrent runs are not excluded.
    Uncoordinated(Lockfile),
}

impl Acquired {
    pub fn is_coordinated(&self) -> bool {
        matches!(self, Acquired::Coordinated(_))
    }

    pub fn lockfile(&self) -> &Lockfile {
        match self {
            Acquired::Coordinated(lockfile) | Acquired::Uncoordinated(lockfile) => lockfile,
        }
    }

    pub fn into_lockfile(self) -> Lockfile {
        match self {
            Acquired::Coordinated(lockfile) | Acquired::Uncoordinated(lockfile) => lockfile,
        }
    }
}

#[derive(Debug, Error)]
pub enum CoordinationError {
    #[error("failed to serialize ledger for {repo}")]
    Serialize {
        repo: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to release ledger for {repo}")]
    Release {
        repo: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("no remote ledger configured for {repo}")]
    NoRemote { repo: String },

    #[error("failed to write local ledger for {repo}")]
    Local {
        repo: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Where the ledger ended up after [`LockCoordinator::persist`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Persisted {
    Remote,
    Local(PathBuf),
}

/// Acquires and persists the ledger for one deployment run.
pub struct LockCoordinator {
    remote: Option<Box<dyn LedgerClient>>,
    store: LockfileStore,
    on_remote_failure: RemoteFailurePolicy,
}

impl LockCoordinator {
    pub fn new(
        remote: Option<Box<dyn LedgerClient>>,
        store: LockfileStore,
        on_remote_failure: RemoteFailurePolicy,
    ) -> Self {
        Self {
            remote,
            store,
            on_remote_failure,
        }
    }

    /// Coordinator driven by the operator's configuration.
    ///
    /// `remote` is dropped when the configuration disables remote coordination.
    pub fn from_config(config: &PluralConfig, remote: Option<Box<dyn LedgerClient>>) -> Self {
        let remote = remote.filter(|_| config.remote_enabled());
        Self::new(
            remote,
            LockfileStore::new(config.lock_profile.clone()),
            config.remote_failure,
        )
    }

    /// Coordinator with no remote authority.
    pub fn local_only(store: LockfileStore) -> Self {
        Self::new(None, store, RemoteFailurePolicy::Local)
    }

    pub fn has_remote(&self) -> bool {
        self.remote.is_some()
    }

    pub fn store(&self) -> &LockfileStore {
        &self.store
    }

    /// Obtain the ledger for `repo`, whose manifest lives at `manifest_path`.
    pub fn acquire(&self, repo: &str, manifest_path: &Path) -> Acquired {
        let Some(remote) = &self.remote else {
            return Acquired::Uncoordinated(self.store.load(manifest_path));
        };

        let applied = match remote.acquire(repo) {
            Ok(applied) => applied,
            Err(err) => {
                let reason = format!("{err:#}");
                warn!(repo, %reason, "ledger coordination unavailable, running uncoordinated");
                let lockfile = match self.on_remote_failure {
                    RemoteFailurePolicy::Empty => Lockfile::new(),
                    RemoteFailurePolicy::Local => self.store.load(manifest_path),
                };
                return Acquired::Uncoordinated(lockfile);
            }
        };

        if applied.lock.trim().is_empty() {
            info!(repo, "acquired empty remote ledger, seeding from local lockfile");
            return Acquired::Coordinated(self.store.load(manifest_path));
        }

        let (lockfile, skipped) = Lockfile::from_yaml_lenient(&applied.lock);
        if skipped > 0 {
            warn!(repo, skipped, "ignored malformed remote ledger entries");
        }
        info!(repo, entries = lockfile.len(), "acquired remote ledger");
        Acquired::Coordinated(lockfile)
    }

    /// Hand the ledger back to the remote authority.
    pub fn release(&self, repo: &str, lockfile: &Lockfile) -> Result<(), CoordinationError> {
        let Some(remote) = &self.remote else {
            return Err(CoordinationError::NoRemote {
                repo: repo.to_string(),
            });
        };

        let blob = lockfile
            .to_yaml()
            .map_err(|source| CoordinationError::Serialize {
                repo: repo.to_string(),
                source,
            })?;
        remote
            .release(repo, &blob)
            .map_err(|source| CoordinationError::Release {
                repo: repo.to_string(),
                source,
            })?;
        info!(repo, entries = lockfile.len(), "released remote ledger");
        Ok(())
    }

    /// Write the ledger to the profile-scoped local lockfile.
    pub fn flush_local(
        &self,
        manifest_path: &Path,
        lockfile: &Lockfile,
    ) -> anyhow::Result<PathBuf> {
        self.store.save(manifest_path, lockfile)
    }

    /// Release remotely when a remote is configured, otherwise flush locally.
    pub fn persist(
        &self,
        repo: &str,
        manifest_path: &Path,
        lockfile: &Lockfile,
    ) -> Result<Persisted, CoordinationError> {
        if self.has_remote() {
            self.release(repo, lockfile)?;
            return Ok(Persisted::Remote);
        }
        self.flush_local(manifest_path, lockfile)
            .map(Persisted::Local)
            .map_err(|source| CoordinationError::Local {
                repo: repo.to_string(),
                source,
            })
    }
}

impl std::fmt::Debug for LockCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockCoordinator")
            .field("remote", &self.remote.is_some())
            .field("store", &self.store)
            .field("on_remote_failure", &self.on_remote_failure)
            .finish()
    }
}
