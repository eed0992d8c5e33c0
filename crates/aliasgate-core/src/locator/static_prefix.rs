use aliasgate_model::AccountId;
use async_trait::async_trait;

use super::StorageLocator;
use crate::config::LocatorStrategy;

/// Derives the endpoint from the account name alone.
///
/// # Examples
///
/// ```
/// use aliasgate_core::locator::{StaticLocator, StorageLocator};
/// use aliasgate_model::AccountId;
///
/// let locator = StaticLocator::new("v1", "AUTH");
/// let endpoint = tokio_test::block_on(locator.locate(&AccountId::new("u1")));
/// assert_eq!(endpoint.as_deref(), Some("/v1/AUTH_u1"));
/// ```
#[derive(Debug, Clone)]
pub struct StaticLocator {
    version: String,
    reseller_prefix: String,
}

impl StaticLocator {
    /// Create a locator for the given API version and reseller prefix.
    #[must_use]
    pub fn new(version: impl Into<String>, reseller_prefix: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            reseller_prefix: reseller_prefix.into(),
        }
    }
}

#[async_trait]
impl StorageLocator for StaticLocator {
    async fn locate(&self, account: &AccountId) -> Option<String> {
        Some(format!(
            "/{}/{}_{}",
            self.version, self.reseller_prefix, account
        ))
    }

    fn strategy(&self) -> LocatorStrategy {
        LocatorStrategy::Tempauth
    }
}
