//! Ledger types for applied component state.
//!
//! Tracks, per component kind, the fingerprint of the definition that was
//! last applied successfully.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_yaml_ng::Value;

use crate::types::{ComponentKind, UnsupportedKind};

/// Fingerprint ledger, one independent mapping per component kind.
///
/// An absent key and an empty fingerprint both mean "never applied".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lockfile {
    #[serde(default)]
    pub artifact: BTreeMap<String, String>,
    #[serde(default)]
    pub terraform: BTreeMap<String, String>,
    #[serde(default)]
    pub helm: BTreeMap<String, String>,
    #[serde(default)]
    pub recipe: BTreeMap<String, String>,
    #[serde(default)]
    pub integration: BTreeMap<String, String>,
    #[serde(default)]
    pub crd: BTreeMap<String, String>,
    #[serde(default)]
    pub ird: BTreeMap<String, String>,
    #[serde(default)]
    pub tag: BTreeMap<String, String>,
    #[serde(default)]
    pub attrs: BTreeMap<String, String>,
}

impl Lockfile {
    /// Create a new empty lockfile
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self, kind: ComponentKind) -> &BTreeMap<String, String> {
        match kind {
            ComponentKind::Artifact => &self.artifact,
            ComponentKind::Terraform => &self.terraform,
            ComponentKind::Helm => &self.helm,
            ComponentKind::Recipe => &self.recipe,
            ComponentKind::Integration => &self.integration,
            ComponentKind::Crd => &self.crd,
            ComponentKind::Ird => &self.ird,
            ComponentKind::Tag => &self.tag,
            ComponentKind::RepoAttrs => &self.attrs,
        }
    }

    fn table_mut(&mut self, kind: ComponentKind) -> &mut BTreeMap<String, String> {
        match kind {
            ComponentKind::Artifact => &mut self.artifact,
            ComponentKind::Terraform => &mut self.terraform,
            ComponentKind::Helm => &mut self.helm,
            ComponentKind::Recipe => &mut self.recipe,
            ComponentKind::Integration => &mut self.integration,
            ComponentKind::Crd => &mut self.crd,
            ComponentKind::Ird => &mut self.ird,
            ComponentKind::Tag => &mut self.tag,
            ComponentKind::RepoAttrs => &mut self.attrs,
        }
    }

    /// Recorded fingerprint for a component, or `""` when never applied.
    pub fn get(&self, kind: ComponentKind, key: &str) -> &str {
        self.table(kind).get(key).map(String::as_str).unwrap_or("")
    }

    /// Record the fingerprint of an applied component.
    pub fn set(&mut self, kind: ComponentKind, key: impl Into<String>, sha: impl Into<String>) {
        self.table_mut(kind).insert(key.into(), sha.into());
    }

    /// Lookup by kind name, for callers holding unvalidated input.
    pub fn get_dyn(&self, kind: &str, key: &str) -> Result<&str, UnsupportedKind> {
        let kind: ComponentKind = kind.parse()?;
        Ok(self.get(kind, key))
    }

    /// Update by kind name, for callers holding unvalidated input.
    pub fn set_dyn(&mut self, kind: &str, key: &str, sha: &str) -> Result<(), UnsupportedKind> {
        let kind: ComponentKind = kind.parse()?;
        self.set(kind, key, sha);
        Ok(())
    }

    /// Whether `sha` matches the recorded fingerprint.
    ///
    /// An empty recorded fingerprint never matches, so a component recorded
    /// with `""` is always rebuilt.
    pub fn is_current(&self, kind: ComponentKind, key: &str, sha: &str) -> bool {
        let recorded = self.get(kind, key);
        !recorded.is_empty() && recorded == sha
    }

    /// Entries of a single kind with non-empty fingerprints.
    pub fn iter(&self, kind: ComponentKind) -> impl Iterator<Item = (&str, &str)> {
        self.table(kind)
            .iter()
            .filter(|(_, sha)| !sha.is_empty())
            .map(|(key, sha)| (key.as_str(), sha.as_str()))
    }

    /// Number of recorded (non-empty) fingerprints across all kinds.
    pub fn len(&self) -> usize {
        ComponentKind::ALL
            .iter()
            .map(|kind| self.iter(*kind).count())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Compare two ledgers treating empty fingerprints as absent.
    pub fn same_entries(&self, other: &Lockfile) -> bool {
        ComponentKind::ALL
            .iter()
            .all(|kind| self.iter(*kind).eq(other.iter(*kind)))
    }

    /// Serialize to the YAML ledger document.
    pub fn to_yaml(&self) -> anyhow::Result<String> {
        Ok(serde_yaml_ng::to_string(self)?)
    }

    /// Parse a YAML ledger document, keeping whatever mappings are readable.
    ///
    /// A mapping whose value is not a string-to-string table is skipped, and
    /// non-string fingerprints inside an otherwise valid table are dropped.
    /// Returns the parsed ledger and the number of entries that were skipped.
    pub fn from_yaml_lenient(content: &str) -> (Self, usize) {
        let mut lockfile = Lockfile::new();
        let mut skipped = 0;

        let root = match serde_yaml_ng::from_str::<Value>(content) {
            Ok(Value::Mapping(root)) => root,
            Ok(Value::Null) => return (lockfile, 0),
            _ => return (lockfile, 1),
        };

        for (name, table) in root {
            let kind = match name.as_str().map(yaml_kind) {
                Some(Some(kind)) => kind,
                _ => {
                    skipped += 1;
                    continue;
                }
            };
            match table {
                Value::Mapping(entries) => {
                    for (key, sha) in entries {
                        match (scalar_string(&key), scalar_string(&sha)) {
                            (Some(key), Some(sha)) => lockfile.set(kind, key, sha),
                            (Some(_), None) if sha.is_null() => {}
                            _ => skipped += 1,
                        }
                    }
                }
                Value::Null => {}
                _ => skipped += 1,
            }
        }

        (lockfile, skipped)
    }
}

/// Field names used by the YAML document, which predate `ComponentKind`.
fn yaml_kind(name: &str) -> Option<ComponentKind> {
    match name {
        "attrs" => Some(ComponentKind::RepoAttrs),
        other => other.parse().ok(),
    }
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
