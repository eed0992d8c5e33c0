//! AliasGate configuration.
//!
//! Provides [`AliasGateConfig`], loaded once at startup. Values come from
//! environment variables and fall back to the defaults of the storage
//! proxy filter this gateway replaces (`SHARED_` prefix, `AUTH` reseller
//! prefix, `tempauth` account resolution).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;
use typed_builder::TypedBuilder;

/// How an account is resolved to its storage endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocatorStrategy {
    /// `/<version>/<reseller>_<account>`, no lookup.
    #[default]
    Tempauth,
    /// Per-account service catalog stored in the cluster.
    Swauth,
    /// Tenant lookup in an identity service.
    Keystone,
}

impl LocatorStrategy {
    /// Configuration name of the strategy.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tempauth => "tempauth",
            Self::Swauth => "swauth",
            Self::Keystone => "keystone",
        }
    }
}

impl fmt::Display for LocatorStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LocatorStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tempauth" | "static" => Ok(Self::Tempauth),
            "swauth" | "catalog" => Ok(Self::Swauth),
            "keystone" | "identity" => Ok(Self::Keystone),
            other => Err(format!("unknown auth method: {other}")),
        }
    }
}

/// AliasGate configuration.
///
/// # Examples
///
/// ```
/// use aliasgate_core::config::{AliasGateConfig, LocatorStrategy};
///
/// let config = AliasGateConfig::default();
/// assert_eq!(config.shadow_prefix, "SHARED_");
/// assert_eq!(config.auth_method, LocatorStrategy::Tempauth);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct AliasGateConfig {
    /// Bind address for the gateway.
    #[builder(default = String::from("0.0.0.0:8090"))]
    pub gateway_listen: String,

    /// Base URL of the storage proxy requests are forwarded to.
    #[builder(default = String::from("http://127.0.0.1:8080"))]
    pub upstream_url: String,

    /// Token attached to internal requests (shadow containers, catalog lookups).
    #[builder(default)]
    pub upstream_auth_token: Option<String>,

    /// Name prefix of shadow containers.
    #[builder(default = String::from("SHARED_"))]
    pub shadow_prefix: String,

    /// Account resolution strategy.
    #[builder(default)]
    pub auth_method: LocatorStrategy,

    /// Reseller prefix prepended to account names.
    #[builder(default = String::from("AUTH"))]
    pub reseller_prefix: String,

    /// API version segment used for paths built by the gateway.
    #[builder(default = String::from("v1"))]
    pub api_version: String,

    /// Header carrying the authenticated remote user.
    #[builder(default = String::from("x-remote-user"))]
    pub remote_user_header: String,

    /// Whether a trusted layer in front of the gateway sets the remote user
    /// header. When unset, clients' values are stripped.
    #[builder(default)]
    pub trust_remote_user: bool,

    /// Identity service base URL, for the `keystone` strategy.
    #[builder(default)]
    pub keystone_auth_url: Option<String>,

    /// Identity service admin token, for the `keystone` strategy.
    #[builder(default)]
    pub keystone_admin_token: Option<String>,

    /// Log level filter string.
    #[builder(default = String::from("info"))]
    pub log_level: String,
}

impl Default for AliasGateConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl AliasGateConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `GATEWAY_LISTEN` | `0.0.0.0:8090` |
    /// | `UPSTREAM_URL` | `http://127.0.0.1:8080` |
    /// | `UPSTREAM_AUTH_TOKEN` | *(unset)* |
    /// | `SHADOW_PREFIX` | `SHARED_` |
    /// | `AUTH_METHOD` | `tempauth` |
    /// | `RESELLER_PREFIX` | `AUTH` |
    /// | `API_VERSION` | `v1` |
    /// | `REMOTE_USER_HEADER` | `x-remote-user` |
    /// | `TRUST_REMOTE_USER` | `false` |
    /// | `KEYSTONE_AUTH_URL` | *(unset)* |
    /// | `KEYSTONE_ADMIN_TOKEN` | *(unset)* |
    /// | `LOG_LEVEL` | `info` |
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(v) = lookup("GATEWAY_LISTEN") {
            config.gateway_listen = v;
        }
        if let Some(v) = lookup("UPSTREAM_URL") {
            config.upstream_url = v.trim_end_matches('/').to_owned();
        }
        config.upstream_auth_token = non_empty(lookup("UPSTREAM_AUTH_TOKEN"));
        if let Some(v) = lookup("SHADOW_PREFIX") {
            config.shadow_prefix = v;
        }
        if let Some(v) = lookup("AUTH_METHOD") {
            match v.parse() {
                Ok(strategy) => config.auth_method = strategy,
                Err(err) => warn!(error = %err, "falling back to tempauth account resolution"),
            }
        }
        if let Some(v) = lookup("RESELLER_PREFIX") {
            config.reseller_prefix = v;
        }
        if let Some(v) = non_empty(lookup("API_VERSION")) {
            config.api_version = v;
        }
        if let Some(v) = non_empty(lookup("REMOTE_USER_HEADER")) {
            config.remote_user_header = v;
        }
        if let Some(v) = lookup("TRUST_REMOTE_USER") {
            config.trust_remote_user = parse_flag(&v);
        }
        config.keystone_auth_url = non_empty(lookup("KEYSTONE_AUTH_URL"));
        config.keystone_admin_token = non_empty(lookup("KEYSTONE_ADMIN_TOKEN"));
        if let Some(v) = lookup("LOG_LEVEL") {
            config.log_level = v;
        }

        config
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
