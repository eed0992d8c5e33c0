use std::fmt;
use std::sync::Arc;

use aliasgate_model::{AccountId, InternalClient};
use async_trait::async_trait;
use tracing::{debug, warn};

use super::StorageLocator;
use crate::config::LocatorStrategy;

/// Resolves accounts through the per-account service catalog kept in the
/// cluster's auth account (`/<version>/<reseller>_.auth/<account>/.services`).
///
/// The catalog is a JSON document; the endpoint is the path component of its
/// `storage.cluster_name` URL.
pub struct CatalogLocator {
    version: String,
    reseller_prefix: String,
    client: Arc<dyn InternalClient>,
}

impl fmt::Debug for CatalogLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CatalogLocator")
            .field("version", &self.version)
            .field("reseller_prefix", &self.reseller_prefix)
            .finish_non_exhaustive()
    }
}

impl CatalogLocator {
    /// Create a locator issuing catalog lookups through `client`.
    #[must_use]
    pub fn new(
        version: impl Into<String>,
        reseller_prefix: impl Into<String>,
        client: Arc<dyn InternalClient>,
    ) -> Self {
        Self {
            version: version.into(),
            reseller_prefix: reseller_prefix.into(),
            client,
        }
    }

    /// Path of the service catalog for `account`.
    #[must_use]
    pub fn catalog_path(&self, account: &AccountId) -> String {
        format!(
            "/{}/{}_.auth/{}/.services",
            self.version, self.reseller_prefix, account
        )
    }
}

/// Extract the endpoint path from a service catalog body.
fn endpoint_from_catalog(body: &[u8]) -> Option<String> {
    let catalog: serde_json::Value = serde_json::from_slice(body).ok()?;
    let url = catalog.get("storage")?.get("cluster_name")?.as_str()?;
    let uri: http::Uri = url.parse().ok()?;
    let path = uri.path().trim_end_matches('/');
    (!path.is_empty()).then(|| path.to_owned())
}

#[async_trait]
impl StorageLocator for CatalogLocator {
    async fn locate(&self, account: &AccountId) -> Option<String> {
        let path = self.catalog_path(account);
        let response = match self
            .client
            .send_internal_request(http::Method::GET, &path, http::HeaderMap::new())
            .await
        {
            Ok(response) => response,
            Err(err) => {
                warn!(%account, error = %err, "service catalog lookup failed");
                return None;
            }
        };

        if !response.status.is_success() {
            debug!(%account, status = %response.status, "no service catalog for account");
            return None;
        }

        let endpoint = endpoint_from_catalog(&response.body);
        if endpoint.is_none() {
            debug!(%account, "service catalog has no storage cluster_name");
        }
        endpoint
    }

    fn strategy(&self) -> LocatorStrategy {
        LocatorStrategy::Swauth
    }
}
