//! Collaborator traits the core is written against.
//!
//! The core owns no state. Metadata lives in the storage cluster and is read
//! through [`MetadataStore`]; shadow containers are created through
//! [`InternalClient`], which already carries whatever credentials authorize
//! cross-account operations.
//!
//! # Object safety
//!
//! The async traits use `#[async_trait]` so they can be held as
//! `Arc<dyn Trait>` and swapped for in-memory fakes in tests.

use async_trait::async_trait;

use crate::error::AliasGateResult;
use crate::info::{ContainerInfo, InternalResponse, ObjectInfo};
use crate::types::{AccountId, ContainerRef, ObjectRef};

/// Source of container and object metadata.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Fetch container metadata. A missing container yields `ContainerInfo::default()`.
    async fn get_container_info(&self, container: &ContainerRef) -> AliasGateResult<ContainerInfo>;

    /// Fetch object metadata. A missing object yields `ObjectInfo::default()`.
    async fn get_object_info(&self, object: &ObjectRef) -> AliasGateResult<ObjectInfo>;
}

/// Issues pre-authorized requests to the storage cluster.
#[async_trait]
pub trait InternalClient: Send + Sync {
    /// Send a request and buffer its response.
    ///
    /// Only transport failures are errors; any HTTP status is returned as a response.
    async fn send_internal_request(
        &self,
        method: http::Method,
        path: &str,
        headers: http::HeaderMap,
    ) -> AliasGateResult<InternalResponse>;
}

/// Looks up tenants in an identity service.
#[async_trait]
pub trait IdentityClient: Send + Sync {
    /// Return the id of the tenant named `name`, if one exists.
    async fn find_tenant_id(&self, name: &str) -> AliasGateResult<Option<String>>;
}

/// Extracts the account on whose behalf a request is made.
pub trait AccountIdentity: Send + Sync {
    /// The acting account, or `None` for anonymous or pre-authorized requests.
    fn acting_account(&self, parts: &http::request::Parts) -> Option<AccountId>;
}

/// Reads the acting account from a header set by the authentication layer.
///
/// The header is only meaningful when a trusted layer in front of the gateway
/// sets it; otherwise the service strips it from inbound requests.
///
/// The header carries the remote user as `account:user[,group...]`; the
/// account is the part of the first group before its first `:`.
///
/// ```
/// use aliasgate_model::{AccountIdentity, RemoteUserIdentity};
///
/// let identity = RemoteUserIdentity::new("x-remote-user");
/// let (parts, ()) = http::Request::builder()
///     .header("x-remote-user", "test:tester,test")
///     .body(())
///     .unwrap()
///     .into_parts();
/// assert_eq!(identity.acting_account(&parts).unwrap().as_str(), "test");
/// ```
#[derive(Debug, Clone)]
pub struct RemoteUserIdentity {
    header: http::HeaderName,
}

impl RemoteUserIdentity {
    /// Header used when none is configured.
    pub const DEFAULT_HEADER: &str = "x-remote-user";

    /// Create an extractor reading `header`. Falls back to
    /// [`Self::DEFAULT_HEADER`] if the name is not a valid header name.
    #[must_use]
    pub fn new(header: &str) -> Self {
        let header = http::HeaderName::try_from(header.to_ascii_lowercase())
            .unwrap_or_else(|_| http::HeaderName::from_static(Self::DEFAULT_HEADER));
        Self { header }
    }

    /// The header the acting account is read from.
    #[must_use]
    pub fn header_name(&self) -> &http::HeaderName {
        &self.header
    }
}

impl Default for RemoteUserIdentity {
    fn default() -> Self {
        Self::new(Self::DEFAULT_HEADER)
    }
}

impl AccountIdentity for RemoteUserIdentity {
    fn acting_account(&self, parts: &http::request::Parts) -> Option<AccountId> {
        let remote_user = parts.headers.get(&self.header)?.to_str().ok()?;
        let first_group = remote_user.split(',').next().unwrap_or_default();
        Some(AccountId::from_acl_entry(first_group.trim()))
    }
}
