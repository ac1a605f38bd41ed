//! Content fingerprints for component definitions.
//!
//! A fingerprint is the blake3 hex digest of a file's bytes, or of a
//! directory tree walked in sorted order with each entry hashed as
//! `relative_path || 0x00 || content` (files) or `relative_path || 0xFF`
//! (directories). Equal fingerprints mean an unchanged definition.

use anyhow::Context;
use std::fs;
use std::path::Path;

/// Fingerprint a file or directory.
pub fn fingerprint(path: &Path) -> anyhow::Result<String> {
    let metadata = fs::symlink_metadata(path)
        .with_context(|| format!("Failed to stat: {}", path.display()))?;
    if metadata.is_file() {
        let content =
            fs::read(path).with_context(|| format!("Failed to read file: {}", path.display()))?;
        return Ok(blake3::hash(&content).to_hex().to_string());
    }
    fingerprint_dir(path)
}

/// Fingerprint a directory tree.
pub fn fingerprint_dir(path: &Path) -> anyhow::Result<String> {
    let mut hasher = blake3::Hasher::new();
    hash_dir_recursive(&mut hasher, path, "")?;
    Ok(hasher.finalize().to_hex().to_string())
}

fn hash_dir_recursive(hasher: &mut blake3::Hasher, dir: &Path, base: &str) -> anyhow::Result<()> {
    let entries = fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory: {}", dir.display()))?;

    let mut sorted_entries: Vec<_> = entries
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("Failed to read directory entries: {}", dir.display()))?;
    sorted_entries.sort_by_key(|e| e.file_name());

    for entry in sorted_entries {
        let name = entry.file_name();
        let name_str = name.to_string_lossy();
        let rel_path = if base.is_empty() {
            name_str.to_string()
        } else {
            format!("{}/{}", base, name_str)
        };

        let ty = entry
            .file_type()
            .with_context(|| format!("Failed to stat file: {}", entry.path().display()))?;

        if ty.is_dir() {
            hasher.update(rel_path.as_bytes());
            hasher.update(&[0xFF]);
            hash_dir_recursive(hasher, &entry.path(), &rel_path)?;
        } else if ty.is_file() {
            hasher.update(rel_path.as_bytes());
            hasher.update(&[0x00]);
            let content = fs::read(entry.path())
                .with_context(|| format!("Failed to read file: {}", entry.path().display()))?;
            hasher.update(&content);
        } else if ty.is_symlink() {
            anyhow::bail!("Symlinks are not supported: {}", entry.path().display());
        } else {
            anyhow::bail!(
                "Unsupported filesystem entry type: {}",
                entry.path().display()
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_file(path: &Path, content: &str) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create_dir_all should succeed in test temp dirs");
        }
        fs::write(path, content).expect("write should succeed in test temp dirs");
    }

    #[test]
    fn test_deterministic_order() {
        let tmp1 = TempDir::new().expect("tempdir should succeed");
        write_file(&tmp1.path().join("values.yaml"), "a");
        write_file(&tmp1.path().join("Chart.yaml"), "b");

        let tmp2 = TempDir::new().expect("tempdir should succeed");
        write_file(&tmp2.path().join("Chart.yaml"), "b");
        write_file(&tmp2.path().join("values.yaml"), "a");

        assert_eq!(
            fingerprint_dir(tmp1.path()).unwrap(),
            fingerprint_dir(tmp2.path()).unwrap()
        );
    }

    #[test]
    fn test_changes_with_content_and_name() {
        let tmp = TempDir::new().expect("tempdir should succeed");
        write_file(&tmp.path().join("main.tf"), "original");
        let first = fingerprint_dir(tmp.path()).unwrap();

        write_file(&tmp.path().join("main.tf"), "modified");
        let second = fingerprint_dir(tmp.path()).unwrap();
        assert_ne!(first, second);

        fs::remove_file(tmp.path().join("main.tf")).unwrap();
        write_file(&tmp.path().join("vars.tf"), "modified");
        assert_ne!(second, fingerprint_dir(tmp.path()).unwrap());
    }

    #[test]
    fn test_nested_directories() {
        let tmp = TempDir::new().expect("tempdir should succeed");
        write_file(&tmp.path().join("helm/api/templates/deploy.yaml"), "kind: Deployment");
        let hash = fingerprint(tmp.path()).unwrap();
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_file_fingerprint_is_content_hash() {
        let tmp = TempDir::new().expect("tempdir should succeed");
        let file = tmp.path().join("NONCE");
        write_file(&file, "abc");
        assert_eq!(
            fingerprint(&file).unwrap(),
            blake3::hash(b"abc").to_hex().to_string()
        );
    }

    #[test]
    fn test_nonexistent_path_fails() {
        assert!(fingerprint(Path::new("/nonexistent/path/that/does/not/exist")).is_err());
    }
}
