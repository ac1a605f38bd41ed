//! Profile-scoped lockfile persistence beside a workspace manifest.
//!
//! Lockfiles live next to the manifest they describe:
//! - default profile: `<manifest-dir>/plural.lock`
//! - named profile:   `<manifest-dir>/plural.<profile>.lock`

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::{debug, warn};

use crate::lockfile::types::Lockfile;

/// Lockfile storage and persistence for one lock profile.
#[derive(Debug, Clone, Default)]
pub struct LockfileStore {
    profile: Option<String>,
}

impl LockfileStore {
    pub fn new(profile: Option<String>) -> Self {
        let profile = profile.filter(|p| !p.trim().is_empty());
        Self { profile }
    }

    pub fn profile(&self) -> Option<&str> {
        self.profile.as_deref()
    }

    /// Path of the lockfile that sits beside `manifest_path`.
    pub fn lock_path(&self, manifest_path: &Path) -> PathBuf {
        lock_path(manifest_path, self.profile.as_deref())
    }

    /// Load the lockfile for a manifest.
    ///
    /// Never fails: a missing or unreadable file yields an empty lockfile, and
    /// a partially malformed one yields whatever mappings parsed.
    pub fn load(&self, manifest_path: &Path) -> Lockfile {
        let path = self.lock_path(manifest_path);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) => {
                debug!(path = %path.display(), error = %err, "no readable local lockfile");
                return Lockfile::new();
            }
        };

        let (lockfile, skipped) = Lockfile::from_yaml_lenient(&content);
        if skipped > 0 {
            warn!(path = %path.display(), skipped, "ignored malformed lockfile entries");
        }
        lockfile
    }

    /// Save lockfile atomically (tmp + rename)
    pub fn save(&self, manifest_path: &Path, lockfile: &Lockfile) -> anyhow::Result<PathBuf> {
        let path = self.lock_path(manifest_path);
        let dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create lockfile directory: {}", dir.display()))?;

        let content = lockfile.to_yaml().context("Failed to serialize lockfile")?;
        let tmp_path = dir.join(format!(".plural.lock.{}.tmp", std::process::id()));
        fs::write(&tmp_path, content)
            .with_context(|| format!("Failed to write tmp lockfile: {}", tmp_path.display()))?;

        // Remove target first on Windows for replace semantics
        if cfg!(windows) && path.exists() {
            fs::remove_file(&path).with_context(|| {
                format!("Failed to remove existing lockfile: {}", path.display())
            })?;
        }
        fs::rename(&tmp_path, &path)
            .with_context(|| format!("Failed to rename tmp lockfile: {}", tmp_path.display()))?;

        debug!(path = %path.display(), entries = lockfile.len(), "wrote local lockfile");
        Ok(path)
    }
}

/// Resolve the lockfile path for a manifest and optional profile.
pub fn lock_path(manifest_path: &Path, profile: Option<&str>) -> PathBuf {
    let dir = manifest_path.parent().unwrap_or_else(|| Path::new(""));
    match profile.filter(|p| !p.is_empty()) {
        None => dir.join("plural.lock"),
        Some(profile) => dir.join(format!("plural.{profile}.lock")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ComponentKind;
    use tempfile::TempDir;

    #[test]
    fn default_profile_path() {
        let path = lock_path(Path::new("/repo/app/manifest.yaml"), None);
        assert_eq!(path, PathBuf::from("/repo/app/plural.lock"));
    }

    #[test]
    fn named_profile_path() {
        let path = lock_path(Path::new("/repo/app/manifest.yaml"), Some("staging"));
        assert_eq!(path, PathBuf::from("/repo/app/plural.staging.lock"));
    }

    #[test]
    fn blank_profile_selects_default() {
        let store = LockfileStore::new(Some("  ".to_string()));
        assert_eq!(store.profile(), None);
        assert_eq!(
            store.lock_path(Path::new("/repo/manifest.yaml")),
            PathBuf::from("/repo/plural.lock")
        );
    }

    #[test]
    fn load_missing_returns_empty() {
        let temp = TempDir::new().unwrap();
        let store = LockfileStore::default();
        let lockfile = store.load(&temp.path().join("manifest.yaml"));
        assert!(lockfile.is_empty());
    }

    #[test]
    fn save_then_load() {
        let temp = TempDir::new().unwrap();
        let manifest = temp.path().join("app").join("manifest.yaml");
        let store = LockfileStore::new(Some("prod".to_string()));

        let mut lockfile = Lockfile::new();
        lockfile.set(ComponentKind::Terraform, "aws", "111");
        lockfile.set(ComponentKind::Integration, "github", "222");

        let written = store.save(&manifest, &lockfile).unwrap();
        assert_eq!(written, temp.path().join("app").join("plural.prod.lock"));
        assert_eq!(store.load(&manifest), lockfile);

        // other profiles do not see it
        assert!(LockfileStore::default().load(&manifest).is_empty());
    }

    #[test]
    fn load_corrupt_file_returns_empty() {
        let temp = TempDir::new().unwrap();
        let manifest = temp.path().join("manifest.yaml");
        fs::write(temp.path().join("plural.lock"), ":: not yaml [").unwrap();
        assert!(LockfileStore::default().load(&manifest).is_empty());
    }
}
