//! Plural Core Library
//!
//! Coordinates deployment state for installed packages: the fingerprint
//! ledger, its acquisition from the remote authority, and preparation of
//! the on-disk workspace each deployment run executes in.

pub mod api;
pub mod config;
pub mod context;
pub mod coordination;
pub mod diff;
pub mod fs;
pub mod git;
pub mod lockfile;
pub mod manifest;
pub mod provider;
pub mod scaffold;
pub mod types;
pub mod workspace;

/// Re-exports of commonly used types
pub mod prelude {
    // Configuration
    pub use crate::config::{ConfigStore, PluralConfig, RemoteFailurePolicy};
    pub use crate::context::AppContext;

    // Ledger
    pub use crate::coordination::{Acquired, CoordinationError, LockCoordinator, Persisted};
    pub use crate::lockfile::{Lockfile, LockfileStore};
    pub use crate::types::{ComponentKind, UnsupportedKind};

    // API
    pub use crate::api::{ApiClient, Installation, InstallationSource, LedgerClient};

    // Workspace
    pub use crate::scaffold::{DiffScaffolder, ExecutionScaffolder};
    pub use crate::workspace::{MinimalWorkspace, Workspace, WorkspaceError};
}
