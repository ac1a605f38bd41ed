//! Config path resolution helpers.

use std::path::{Path, PathBuf};

/// Location of config.toml inside a config directory.
pub fn config_path(config_dir: &Path) -> PathBuf {
    config_dir.join("config.toml")
}

/// Default per-user config directory (`<config_dir>/plural`).
pub fn default_config_dir() -> anyhow::Result<PathBuf> {
    Ok(dirs::config_dir()
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?
        .join("plural"))
}
