//! Payloads exchanged with the metadata and internal-request collaborators.

use std::collections::BTreeMap;

use bytes::Bytes;

/// Metadata key holding a container redirect written as `X-Container-Meta-Storage-Path`.
pub const META_STORAGE_PATH: &str = "storage-path";

/// Metadata key holding a redirect written as `X-Container-Meta-Alias` or
/// `X-Object-Meta-Alias`.
pub const META_ALIAS: &str = "alias";

/// Container metadata as reported by the storage layer.
///
/// A container that does not exist is reported as `ContainerInfo::default()`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerInfo {
    /// User metadata, keyed by lower-case name without the `x-container-meta-` prefix.
    pub meta: BTreeMap<String, String>,
    /// Read ACL (`account[:user]` entries, comma separated).
    pub read_acl: String,
    /// Write ACL.
    pub write_acl: String,
    /// Number of objects stored in the container.
    pub object_count: u64,
}

impl ContainerInfo {
    /// The redirect target stored on this container, if any.
    ///
    /// `storage-path` takes precedence over `alias`. Empty values count as absent.
    #[must_use]
    pub fn alias(&self) -> Option<&str> {
        [META_STORAGE_PATH, META_ALIAS]
            .into_iter()
            .filter_map(|key| self.meta.get(key))
            .map(String::as_str)
            .find(|value| !value.is_empty())
    }
}

/// Object metadata as reported by the storage layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectInfo {
    /// User metadata, keyed by lower-case name without the `x-object-meta-` prefix.
    pub meta: BTreeMap<String, String>,
}

impl ObjectInfo {
    /// The redirect target stored on this object, if any.
    #[must_use]
    pub fn alias(&self) -> Option<&str> {
        self.meta
            .get(META_ALIAS)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }
}

/// Response to an internal request.
#[derive(Debug, Clone)]
pub struct InternalResponse {
    /// HTTP status.
    pub status: http::StatusCode,
    /// Fully buffered response body.
    pub body: Bytes,
}

impl InternalResponse {
    /// Create a response with the given status and body.
    #[must_use]
    pub fn new(status: http::StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}
