//! Manifests read and written by workspace assembly.
//!
//! - `workspace.yaml`: project manifest describing the target cluster
//! - `<repo>/manifest.yaml`: per-repository component manifest
//! - `context.yaml`: deployment context (see [`context`])
//!
//! All documents share the versioned envelope
//! `apiVersion / kind / metadata / spec`.

pub mod context;

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::Context as _;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_yaml_ng::Value;

pub use context::Context;

pub const API_VERSION: &str = "plural.sh/v1alpha1";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Versioned<T> {
    api_version: String,
    kind: String,
    #[serde(default)]
    metadata: Metadata,
    spec: T,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Metadata {
    #[serde(default)]
    name: String,
}

/// Project-level manifest, one per deployment repository.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectManifest {
    #[serde(default)]
    pub cluster: String,
    #[serde(default)]
    pub bucket: String,
    #[serde(default)]
    pub project: String,
    #[serde(default)]
    pub provider: String,
    #[serde(default)]
    pub region: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<Owner>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub context: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    #[serde(default)]
    pub email: String,
}

/// Per-repository manifest derived from a workspace.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub cluster: String,
    #[serde(default)]
    pub project: String,
    #[serde(default)]
    pub bucket: String,
    #[serde(default)]
    pub provider: String,
    #[serde(default)]
    pub region: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub license: String,
    #[serde(default)]
    pub wait: bool,
    #[serde(default)]
    pub charts: Vec<ComponentManifest>,
    #[serde(default)]
    pub terraform: Vec<ComponentManifest>,
    #[serde(default)]
    pub dependencies: Vec<Dependency>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub context: BTreeMap<String, Value>,
}

/// A chart or Terraform module pinned to an exact version.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentManifest {
    pub id: String,
    pub name: String,
    pub version_id: String,
    pub version: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub repo: String,
}

fn read_versioned<T: DeserializeOwned>(path: &Path, kind: &str) -> anyhow::Result<T> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}: {}", kind, path.display()))?;
    let doc: Versioned<T> = serde_yaml_ng::from_str(&content)
        .with_context(|| format!("Failed to parse {}: {}", kind, path.display()))?;
    if doc.kind != kind {
        anyhow::bail!(
            "Expected kind {} in {}, found {}",
            kind,
            path.display(),
            doc.kind
        );
    }
    Ok(doc.spec)
}

fn write_versioned<T: Serialize + Clone>(
    path: &Path,
    kind: &str,
    name: &str,
    spec: &T,
) -> anyhow::Result<()> {
    let doc = Versioned {
        api_version: API_VERSION.to_string(),
        kind: kind.to_string(),
        metadata: Metadata {
            name: name.to_string(),
        },
        spec: spec.clone(),
    };
    let content = serde_yaml_ng::to_string(&doc)
        .with_context(|| format!("Failed to serialize {}", kind))?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
}

impl ProjectManifest {
    pub const KIND: &'static str = "ProjectManifest";

    pub fn read(path: &Path) -> anyhow::Result<Self> {
        read_versioned(path, Self::KIND)
    }

    pub fn write(&self, path: &Path) -> anyhow::Result<()> {
        write_versioned(path, Self::KIND, &self.cluster, self)
    }
}

impl Manifest {
    pub const KIND: &'static str = "Workspace";

    pub fn read(path: &Path) -> anyhow::Result<Self> {
        read_versioned(path, Self::KIND)
    }

    pub fn write(&self, path: &Path) -> anyhow::Result<()> {
        write_versioned(path, Self::KIND, &self.name, self)
    }
}
