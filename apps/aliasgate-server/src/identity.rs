//! Identity service client for the `keystone` locator strategy.

use std::time::Duration;

use aliasgate_core::AliasGateConfig;
use aliasgate_model::{AliasGateError, AliasGateResult, IdentityClient};
use async_trait::async_trait;
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use serde::Deserialize;

const IDENTITY_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct ProjectList {
    #[serde(default)]
    projects: Vec<Project>,
}

#[derive(Debug, Deserialize)]
struct Project {
    id: String,
}

/// Looks up projects by name through the identity v3 API.
#[derive(Debug, Clone)]
pub struct KeystoneClient {
    client: reqwest::Client,
    auth_url: String,
    admin_token: String,
}

impl KeystoneClient {
    /// Create a client from `KEYSTONE_AUTH_URL` and `KEYSTONE_ADMIN_TOKEN`.
    pub fn from_config(config: &AliasGateConfig) -> AliasGateResult<Self> {
        let auth_url = config
            .keystone_auth_url
            .as_deref()
            .ok_or_else(|| AliasGateError::Identity("KEYSTONE_AUTH_URL is not set".to_owned()))?;
        let admin_token = config
            .keystone_admin_token
            .clone()
            .ok_or_else(|| AliasGateError::Identity("KEYSTONE_ADMIN_TOKEN is not set".to_owned()))?;
        let client = reqwest::Client::builder()
            .timeout(IDENTITY_TIMEOUT)
            .build()
            .map_err(|err| {
                AliasGateError::Identity(format!("cannot build identity client: {err}"))
            })?;

        Ok(Self {
            client,
            auth_url: auth_url.trim_end_matches('/').to_owned(),
            admin_token,
        })
    }

    fn projects_url(&self, name: &str) -> String {
        format!(
            "{}/v3/projects?name={}",
            self.auth_url,
            utf8_percent_encode(name, NON_ALPHANUMERIC)
        )
    }
}

#[async_trait]
impl IdentityClient for KeystoneClient {
    async fn find_tenant_id(&self, name: &str) -> AliasGateResult<Option<String>> {
        let resp = self
            .client
            .get(self.projects_url(name))
            .header("x-auth-token", &self.admin_token)
            .send()
            .await
            .map_err(|err| AliasGateError::Identity(err.to_string()))?;

        let status = resp.status();
        if status == http::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(AliasGateError::Identity(format!(
                "project lookup for {name} returned {status}"
            )));
        }

        let list: ProjectList = resp
            .json()
            .await
            .map_err(|err| AliasGateError::Identity(err.to_string()))?;
        Ok(list.projects.into_iter().next().map(|project| project.id))
    }
}
