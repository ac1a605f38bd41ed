//! Cloud provider context for a workspace.
//!
//! Credential resolution lives elsewhere; this only determines which
//! provider, cluster and state bucket a repository deploys into.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::manifest::{Manifest, ProjectManifest};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Aws,
    Gcp,
    Azure,
    Equinix,
    Kind,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Aws => "aws",
            ProviderKind::Gcp => "gcp",
            ProviderKind::Azure => "azure",
            ProviderKind::Equinix => "equinix",
            ProviderKind::Kind => "kind",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "aws" => Ok(ProviderKind::Aws),
            "gcp" | "google" => Ok(ProviderKind::Gcp),
            "azure" => Ok(ProviderKind::Azure),
            "equinix" => Ok(ProviderKind::Equinix),
            "kind" => Ok(ProviderKind::Kind),
            other => anyhow::bail!("Unsupported provider '{}'", other),
        }
    }
}

/// Resolved provider handle for one workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provider {
    pub kind: ProviderKind,
    pub cluster: String,
    pub project: String,
    pub region: String,
    pub bucket: String,
}

impl Provider {
    pub fn from_manifest(manifest: &Manifest) -> anyhow::Result<Self> {
        Ok(Self {
            kind: manifest.provider.parse()?,
            cluster: manifest.cluster.clone(),
            project: manifest.project.clone(),
            region: manifest.region.clone(),
            bucket: manifest.bucket.clone(),
        })
    }

    pub fn from_project(project: &ProjectManifest) -> anyhow::Result<Self> {
        Ok(Self {
            kind: project.provider.parse()?,
            cluster: project.cluster.clone(),
            project: project.project.clone(),
            region: project.region.clone(),
            bucket: project.bucket.clone(),
        })
    }
}

/// Load the provider for a repository.
///
/// Uses the repository's own manifest when it already exists, otherwise the
/// project manifest that new repositories inherit from.
pub fn bootstrap(manifest_path: &Path, project_path: &Path) -> anyhow::Result<Provider> {
    if manifest_path.exists() {
        debug!(path = %manifest_path.display(), "bootstrapping provider from repository manifest");
        let manifest = Manifest::read(manifest_path)?;
        return Provider::from_manifest(&manifest)
            .with_context(|| format!("Invalid provider in {}", manifest_path.display()));
    }

    debug!(path = %project_path.display(), "bootstrapping provider from project manifest");
    let project = ProjectManifest::read(project_path)?;
    Provider::from_project(&project)
        .with_context(|| format!("Invalid provider in {}", project_path.display()))
}
