//! Account to storage-endpoint resolution.
//!
//! A [`StorageLocator`] turns an account identifier into the base path under
//! which that account's containers are addressable. Three strategies share the
//! contract:
//!
//! | Strategy | Type | Endpoint |
//! |----------|------|----------|
//! | `tempauth` | [`StaticLocator`] | `/<version>/<reseller>_<account>` |
//! | `swauth` | [`CatalogLocator`] | path of the catalog's `storage.cluster_name` |
//! | `keystone` | [`IdentityLocator`] | `/<version>/<reseller>_<tenant-id>` |
//!
//! The strategy is chosen once by [`build_locator`]. Resolution failures are
//! never errors: the locator answers `None` and the caller skips the account.

mod catalog;
mod identity;
mod static_prefix;

use std::fmt;
use std::sync::Arc;

use aliasgate_model::{AccountId, AliasGateError, IdentityClient, InternalClient};
use async_trait::async_trait;
use tracing::{error, info};

pub use catalog::CatalogLocator;
pub use identity::IdentityLocator;
pub use static_prefix::StaticLocator;

use crate::config::{AliasGateConfig, LocatorStrategy};

/// Resolves an account to the base path of its storage endpoint.
#[async_trait]
pub trait StorageLocator: Send + Sync + fmt::Debug {
    /// The endpoint path for `account`, or `None` if it cannot be resolved.
    async fn locate(&self, account: &AccountId) -> Option<String>;

    /// The strategy implemented by this locator.
    fn strategy(&self) -> LocatorStrategy;
}

/// Build the locator selected by `config.auth_method`.
///
/// `identity` is only consulted for the `keystone` strategy. If it failed to
/// initialize, the failure is logged here, once, and the resulting locator
/// resolves nothing.
pub fn build_locator(
    config: &AliasGateConfig,
    internal: Arc<dyn InternalClient>,
    identity: Result<Arc<dyn IdentityClient>, AliasGateError>,
) -> Arc<dyn StorageLocator> {
    let version = config.api_version.clone();
    let reseller = config.reseller_prefix.clone();

    let locator: Arc<dyn StorageLocator> = match config.auth_method {
        LocatorStrategy::Tempauth => Arc::new(StaticLocator::new(version, reseller)),
        LocatorStrategy::Swauth => Arc::new(CatalogLocator::new(version, reseller, internal)),
        LocatorStrategy::Keystone => {
            let identity = identity.map_err(|err| {
                error!(
                    error = %err,
                    "identity client unavailable, shadow containers will not be propagated"
                );
                err.to_string()
            });
            Arc::new(IdentityLocator::new(version, reseller, identity))
        }
    };

    info!(strategy = %locator.strategy(), "initialized storage locator");
    locator
}
