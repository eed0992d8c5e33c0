use std::fmt;
use std::sync::Arc;

use aliasgate_model::{AccountId, IdentityClient};
use async_trait::async_trait;
use tracing::{debug, warn};

use super::StorageLocator;
use crate::config::LocatorStrategy;

/// Resolves accounts by looking up the identity-service tenant of the same name.
///
/// The identity client is owned by the locator for its whole lifetime. A
/// client that failed to initialize is kept as the failure reason; such a
/// locator resolves nothing and stays quiet per request.
pub struct IdentityLocator {
    version: String,
    reseller_prefix: String,
    client: Result<Arc<dyn IdentityClient>, String>,
}

impl fmt::Debug for IdentityLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityLocator")
            .field("version", &self.version)
            .field("reseller_prefix", &self.reseller_prefix)
            .field("client", &self.client.as_ref().map(|_| "..."))
            .finish()
    }
}

impl IdentityLocator {
    /// Create a locator around an initialized (or failed) identity client.
    #[must_use]
    pub fn new(
        version: impl Into<String>,
        reseller_prefix: impl Into<String>,
        client: Result<Arc<dyn IdentityClient>, String>,
    ) -> Self {
        Self {
            version: version.into(),
            reseller_prefix: reseller_prefix.into(),
            client,
        }
    }

    /// Whether the identity client initialized successfully.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.client.is_ok()
    }
}

#[async_trait]
impl StorageLocator for IdentityLocator {
    async fn locate(&self, account: &AccountId) -> Option<String> {
        let client = self.client.as_ref().ok()?;
        match client.find_tenant_id(account.as_str()).await {
            Ok(Some(tenant_id)) => Some(format!(
                "/{}/{}_{}",
                self.version, self.reseller_prefix, tenant_id
            )),
            Ok(None) => {
                debug!(%account, "no identity tenant matches account");
                None
            }
            Err(err) => {
                warn!(%account, error = %err, "identity tenant lookup failed");
                None
            }
        }
    }

    fn strategy(&self) -> LocatorStrategy {
        LocatorStrategy::Keystone
    }
}
