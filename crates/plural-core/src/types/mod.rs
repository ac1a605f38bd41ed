//! Shared core types used across the ledger and workspace layers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Category of deployable unit tracked by the ledger.
///
/// Each kind owns an independent namespace of component keys, so a Helm
/// chart and a Terraform module sharing a name never collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    Artifact,
    Terraform,
    Helm,
    Recipe,
    Integration,
    Crd,
    Ird,
    Tag,
    RepoAttrs,
}

impl ComponentKind {
    /// Every kind, in ledger serialization order.
    pub const ALL: [ComponentKind; 9] = [
        ComponentKind::Artifact,
        ComponentKind::Terraform,
        ComponentKind::Helm,
        ComponentKind::Recipe,
        ComponentKind::Integration,
        ComponentKind::Crd,
        ComponentKind::Ird,
        ComponentKind::Tag,
        ComponentKind::RepoAttrs,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentKind::Artifact => "artifact",
            ComponentKind::Terraform => "terraform",
            ComponentKind::Helm => "helm",
            ComponentKind::Recipe => "recipe",
            ComponentKind::Integration => "integration",
            ComponentKind::Crd => "crd",
            ComponentKind::Ird => "ird",
            ComponentKind::Tag => "tag",
            ComponentKind::RepoAttrs => "repo_attrs",
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a dynamic kind name does not match one of the nine kinds.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported component kind '{0}'")]
pub struct UnsupportedKind(pub String);

impl FromStr for ComponentKind {
    type Err = UnsupportedKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "artifact" => Ok(ComponentKind::Artifact),
            "terraform" => Ok(ComponentKind::Terraform),
            "helm" => Ok(ComponentKind::Helm),
            "recipe" => Ok(ComponentKind::Recipe),
            "integration" => Ok(ComponentKind::Integration),
            "crd" => Ok(ComponentKind::Crd),
            "ird" => Ok(ComponentKind::Ird),
            "tag" => Ok(ComponentKind::Tag),
            "repo_attrs" | "attrs" => Ok(ComponentKind::RepoAttrs),
            _ => Err(UnsupportedKind(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_kind_from_its_name() {
        for kind in ComponentKind::ALL {
            assert_eq!(kind.as_str().parse::<ComponentKind>().unwrap(), kind);
        }
    }

    #[test]
    fn parse_is_case_insensitive_and_accepts_aliases() {
        assert_eq!("HELM".parse::<ComponentKind>().unwrap(), ComponentKind::Helm);
        assert_eq!(
            "repo-attrs".parse::<ComponentKind>().unwrap(),
            ComponentKind::RepoAttrs
        );
        assert_eq!(
            "attrs".parse::<ComponentKind>().unwrap(),
            ComponentKind::RepoAttrs
        );
    }

    #[test]
    fn unknown_kind_is_reported() {
        let err = "chart".parse::<ComponentKind>().unwrap_err();
        assert_eq!(err, UnsupportedKind("chart".to_string()));
        assert_eq!(err.to_string(), "unsupported component kind 'chart'");
    }
}
