//! Configuration schema for config.toml
//!
//! Holds operator identity, the API endpoint and ledger coordination options.

use serde::{Deserialize, Serialize};
use url::Url;

/// Default API endpoint when none is configured.
pub const DEFAULT_ENDPOINT: &str = "https://app.plural.sh";

/// Root configuration structure for config.toml
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct PluralConfig {
    /// Operator email
    #[serde(default)]
    pub email: String,

    /// API access token
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub token: String,

    /// API endpoint (scheme + host), defaults to [`DEFAULT_ENDPOINT`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Selects `plural.<profile>.lock` instead of `plural.lock`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lock_profile: Option<String>,

    /// What to do when the remote ledger cannot be reached
    #[serde(default)]
    pub remote_failure: RemoteFailurePolicy,

    /// Skip remote coordination entirely and use the local lockfile
    #[serde(default)]
    pub offline: bool,
}

/// Ledger source used when acquiring the remote ledger fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemoteFailurePolicy {
    /// Start from an empty ledger
    #[default]
    Empty,
    /// Start from the profile-scoped local lockfile
    Local,
}

impl PluralConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolved API endpoint.
    pub fn endpoint(&self) -> anyhow::Result<Url> {
        let raw = self
            .endpoint
            .as_deref()
            .filter(|e| !e.trim().is_empty())
            .unwrap_or(DEFAULT_ENDPOINT);
        let url =
            Url::parse(raw).map_err(|e| anyhow::anyhow!("Invalid endpoint '{}': {}", raw, e))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            anyhow::bail!("Endpoint must use http or https: {}", raw);
        }
        Ok(url)
    }

    /// Whether a remote ledger should be consulted at all.
    pub fn remote_enabled(&self) -> bool {
        !self.offline && !self.token.is_empty()
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        self.endpoint()?;
        if let Some(profile) = &self.lock_profile {
            if profile.contains(['/', '\\']) || profile.contains("..") {
                anyhow::bail!("Invalid lock profile '{}': must be a plain name", profile);
            }
        }
        Ok(())
    }
}
