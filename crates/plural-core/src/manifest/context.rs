//! Deployment context: bundles and per-repository configuration.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_yaml_ng::Value;

/// File name of the deployment context at the repository root.
pub const CONTEXT_FILE: &str = "context.yaml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Context {
    #[serde(default)]
    pub bundles: Vec<Bundle>,
    #[serde(default)]
    pub buckets: Vec<String>,
    #[serde(default)]
    pub domains: Vec<String>,
    #[serde(default)]
    pub configuration: BTreeMap<String, BTreeMap<String, Value>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bundle {
    pub repository: String,
    pub name: String,
}

impl Context {
    pub const KIND: &'static str = "Context";

    pub fn read(path: &Path) -> anyhow::Result<Self> {
        super::read_versioned(path, Self::KIND)
    }

    pub fn write(&self, path: &Path) -> anyhow::Result<()> {
        super::write_versioned(path, Self::KIND, "", self)
    }

    /// Configuration values recorded for one repository.
    pub fn repo_configuration(&self, repo: &str) -> Option<&BTreeMap<String, Value>> {
        self.configuration.get(repo)
    }
}

/// Well-known location of the deployment context.
pub fn context_path(repo_root: &Path) -> PathBuf {
    repo_root.join(CONTEXT_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn context_roundtrip_keeps_configuration() {
        let temp = TempDir::new().unwrap();
        let path = context_path(temp.path());

        let mut ctx = Context::default();
        ctx.bundles.push(Bundle {
            repository: "api".to_string(),
            name: "api-aws".to_string(),
        });
        ctx.configuration.insert(
            "api".to_string(),
            BTreeMap::from([("hostname".to_string(), Value::from("api.acme.dev"))]),
        );

        ctx.write(&path).unwrap();
        let loaded = Context::read(&path).unwrap();
        assert_eq!(loaded, ctx);
        assert_eq!(
            loaded.repo_configuration("api").unwrap()["hostname"],
            Value::from("api.acme.dev")
        );
    }

    #[test]
    fn missing_context_is_an_error() {
        let temp = TempDir::new().unwrap();
        assert!(Context::read(&context_path(temp.path())).is_err());
    }
}
