//! Package API: installation lookup and the remote ledger.
//!
//! The traits are the seams the rest of the crate depends on; [`ApiClient`]
//! is the HTTP implementation.

pub mod client;
pub mod types;

pub use client::ApiClient;
pub use types::{
    AppliedLock, Chart, ChartInstallation, Installation, PackageInstallations, Repository,
    Terraform, TerraformInstallation, Version,
};

/// Exclusive, remotely held ledger keyed by repository name.
///
/// The remote side guarantees at most one outstanding acquisition per
/// repository; callers only consume the acquire/release pair.
pub trait LedgerClient {
    /// Take the ledger for `repo`. An empty blob means it was never set.
    fn acquire(&self, repo: &str) -> anyhow::Result<AppliedLock>;

    /// Store `blob` and give the ledger back.
    fn release(&self, repo: &str, blob: &str) -> anyhow::Result<()>;
}

/// Lookup of installation records.
pub trait InstallationSource {
    fn installation(&self, repo: &str) -> anyhow::Result<Installation>;

    fn package_installations(&self, repository_id: &str) -> anyhow::Result<PackageInstallations>;
}
