//! GraphQL client for the package API.

use anyhow::Context;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::debug;
use url::Url;

use super::types::{
    AppliedLock, ChartInstallation, Installation, PackageInstallations, TerraformInstallation,
};
use super::{InstallationSource, LedgerClient};
use crate::config::PluralConfig;

const ACQUIRE_LOCK: &str = "mutation AcquireLock($repo: String!) { acquireLock(repository: $repo) { lock } }";
const RELEASE_LOCK: &str = "mutation ReleaseLock($repo: String!, $attrs: LockAttributes!) { releaseLock(repository: $repo, attributes: $attrs) { lock } }";
const INSTALLATION: &str = "query Installation($name: String!) { installation(name: $name) { id license repository { id name } } }";
const PACKAGE_INSTALLATIONS: &str = "query Packages($id: ID!) { chartInstallations(repositoryId: $id, first: 100) { edges { node { id chart { id name } version { id version } } } } terraformInstallations(repositoryId: $id, first: 100) { edges { node { id terraform { id name } version { id version } } } } }";

/// Blocking GraphQL client.
///
/// Each call drives the async request on a private tokio runtime, so callers
/// stay synchronous.
#[derive(Debug, Clone)]
pub struct ApiClient {
    endpoint: Url,
    token: String,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct GqlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GqlError>,
}

#[derive(Debug, Deserialize)]
struct GqlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct Edges<T> {
    edges: Vec<Edge<T>>,
}

#[derive(Debug, Deserialize)]
struct Edge<T> {
    node: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AcquireLockData {
    acquire_lock: Option<AppliedLock>,
}

impl ApiClient {
    pub fn new(endpoint: Url, token: impl Into<String>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("plural/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            endpoint,
            token: token.into(),
            http,
        })
    }

    pub fn from_config(config: &PluralConfig) -> anyhow::Result<Self> {
        Self::new(config.endpoint()?, config.token.clone())
    }

    pub fn graphql_url(&self) -> anyhow::Result<Url> {
        self.endpoint
            .join("gql")
            .with_context(|| format!("Invalid endpoint: {}", self.endpoint))
    }

    fn query<T: DeserializeOwned>(&self, query: &str, variables: Value) -> anyhow::Result<T> {
        let url = self.graphql_url()?;
        let body = json!({ "query": query, "variables": variables });
        debug!(url = %url, "graphql request");

        let runtime = tokio::runtime::Runtime::new()
            .map_err(|e| anyhow::anyhow!("Failed to create tokio runtime: {}", e))?;

        let response: GqlResponse<T> = runtime.block_on(async {
            let response = self
                .http
                .post(url.clone())
                .bearer_auth(&self.token)
                .json(&body)
                .send()
                .await
                .with_context(|| format!("Failed to reach {}", url))?;

            if !response.status().is_success() {
                anyhow::bail!("Request failed: HTTP {} from {}", response.status(), url);
            }

            response
                .json::<GqlResponse<T>>()
                .await
                .context("Failed to parse API response")
        })?;

        decode_response(response)
    }
}

fn decode_response<T>(response: GqlResponse<T>) -> anyhow::Result<T> {
    if !response.errors.is_empty() {
        let messages: Vec<&str> = response.errors.iter().map(|e| e.message.as_str()).collect();
        anyhow::bail!("API error: {}", messages.join("; "));
    }
    response
        .data
        .ok_or_else(|| anyhow::anyhow!("API response contained no data"))
}

impl LedgerClient for ApiClient {
    fn acquire(&self, repo: &str) -> anyhow::Result<AppliedLock> {
        let data: AcquireLockData = self
            .query(ACQUIRE_LOCK, json!({ "repo": repo }))
            .with_context(|| format!("Failed to acquire lock for {}", repo))?;
        Ok(data.acquire_lock.unwrap_or_default())
    }

    fn release(&self, repo: &str, blob: &str) -> anyhow::Result<()> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Data {
            #[allow(dead_code)]
            release_lock: Option<AppliedLock>,
        }

        let _: Data = self
            .query(
                RELEASE_LOCK,
                json!({ "repo": repo, "attrs": { "lock": blob } }),
            )
            .with_context(|| format!("Failed to release lock for {}", repo))?;
        Ok(())
    }
}

impl InstallationSource for ApiClient {
    fn installation(&self, repo: &str) -> anyhow::Result<Installation> {
        #[derive(Deserialize)]
        struct Data {
            installation: Option<Installation>,
        }

        let data: Data = self.query(INSTALLATION, json!({ "name": repo }))?;
        data.installation
            .ok_or_else(|| anyhow::anyhow!("No installation found for {}", repo))
    }

    fn package_installations(&self, repository_id: &str) -> anyhow::Result<PackageInstallations> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Data {
            chart_installations: Edges<ChartInstallation>,
            terraform_installations: Edges<TerraformInstallation>,
        }

        let data: Data = self
            .query(PACKAGE_INSTALLATIONS, json!({ "id": repository_id }))
            .with_context(|| format!("Failed to list installations for {}", repository_id))?;
        Ok(PackageInstallations {
            charts: data
                .chart_installations
                .edges
                .into_iter()
                .map(|e| e.node)
                .collect(),
            terraform: data
                .terraform_installations
                .edges
                .into_iter()
                .map(|e| e.node)
                .collect(),
        })
    }
}
