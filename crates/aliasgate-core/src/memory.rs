//! In-memory storage cluster.
//!
//! [`MemoryCluster`] implements every collaborator trait over a handful of
//! concurrent maps so the interceptor can be exercised without a real storage
//! proxy. It records each internal request it receives.
//!
//! # Examples
//!
//! ```
//! use aliasgate_core::memory::MemoryCluster;
//! use aliasgate_model::{ContainerInfo, ContainerRef, MetadataStore};
//!
//! let cluster = MemoryCluster::new();
//! cluster.put_container(&ContainerRef::new("a", "c"), ContainerInfo::default());
//! let info = tokio_test::block_on(cluster.get_container_info(&ContainerRef::new("a", "c")));
//! assert_eq!(info.unwrap().object_count, 0);
//! ```

use std::sync::atomic::{AtomicBool, Ordering};

use aliasgate_model::{
    AliasGateError, AliasGateResult, ContainerInfo, ContainerRef, IdentityClient, InternalClient,
    InternalResponse, MetadataStore, ObjectInfo, ObjectRef, RequestPath,
};
use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use parking_lot::Mutex;

/// A request received by the cluster through [`InternalClient`] or [`MemoryCluster::apply`].
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// Request method.
    pub method: http::Method,
    /// Decoded request path.
    pub path: String,
    /// Request headers.
    pub headers: http::HeaderMap,
}

impl RecordedRequest {
    /// A header value as a string, if present.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// In-memory cluster holding containers, object metadata, raw documents, and
/// identity tenants.
///
/// Containers are keyed by account and name; the version segment of paths is
/// ignored. [`set_unreachable`](Self::set_unreachable) makes internal requests
/// and identity lookups fail while metadata stays readable.
#[derive(Debug, Default)]
pub struct MemoryCluster {
    containers: DashMap<ContainerRef, ContainerInfo>,
    objects: DashMap<ObjectRef, ObjectInfo>,
    documents: DashMap<String, Bytes>,
    tenants: DashMap<String, String>,
    failing_prefixes: Mutex<Vec<String>>,
    requests: Mutex<Vec<RecordedRequest>>,
    unreachable: AtomicBool,
}

impl MemoryCluster {
    /// Create an empty cluster.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or replace a container.
    pub fn put_container(&self, container: &ContainerRef, info: ContainerInfo) {
        self.containers.insert(container.clone(), info);
    }

    /// Current state of a container.
    #[must_use]
    pub fn container(&self, container: &ContainerRef) -> Option<ContainerInfo> {
        self.containers.get(container).map(|info| info.clone())
    }

    /// Number of containers held by the cluster.
    #[must_use]
    pub fn container_count(&self) -> usize {
        self.containers.len()
    }

    /// Create or replace an object's metadata.
    pub fn put_object(&self, object: &ObjectRef, info: ObjectInfo) {
        self.objects.insert(object.clone(), info);
    }

    /// Serve `body` for `GET path`.
    pub fn put_raw(&self, path: impl Into<String>, body: impl Into<Bytes>) {
        self.documents.insert(path.into(), body.into());
    }

    /// Register an identity tenant.
    pub fn add_tenant(&self, name: impl Into<String>, id: impl Into<String>) {
        self.tenants.insert(name.into(), id.into());
    }

    /// Make internal requests and identity lookups fail with a transport error.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    /// Answer `503` to every internal request whose path starts with `prefix`.
    pub fn fail_path_prefix(&self, prefix: impl Into<String>) {
        self.failing_prefixes.lock().push(prefix.into());
    }

    /// All recorded requests, oldest first.
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }

    /// Forget recorded requests.
    pub fn clear_requests(&self) {
        self.requests.lock().clear();
    }

    /// Apply a request to the cluster state, the way the storage proxy would.
    ///
    /// Supports `GET` of raw documents and containers, `PUT`/`POST`/`DELETE` of
    /// containers, and `PUT`/`POST`/`DELETE` of objects. Container and object
    /// metadata headers (`X-Container-Meta-*`, `X-Object-Meta-*`) and ACL
    /// headers are stored; empty values remove the entry.
    pub fn apply(
        &self,
        method: &http::Method,
        path: &str,
        headers: &http::HeaderMap,
    ) -> InternalResponse {
        self.requests.lock().push(RecordedRequest {
            method: method.clone(),
            path: path.to_owned(),
            headers: headers.clone(),
        });

        if self
            .failing_prefixes
            .lock()
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
        {
            return empty(http::StatusCode::SERVICE_UNAVAILABLE);
        }

        if *method == http::Method::GET {
            if let Some(body) = self.documents.get(path) {
                return InternalResponse::new(http::StatusCode::OK, body.clone());
            }
        }

        let Ok(parsed) = RequestPath::parse(path) else {
            return empty(http::StatusCode::BAD_REQUEST);
        };

        if let Some(object) = parsed.object_ref() {
            return self.apply_object(method, &object, headers);
        }
        match parsed.container_ref() {
            Some(container) => self.apply_container(method, &container, headers),
            None => empty(http::StatusCode::NOT_FOUND),
        }
    }

    fn apply_container(
        &self,
        method: &http::Method,
        container: &ContainerRef,
        headers: &http::HeaderMap,
    ) -> InternalResponse {
        match *method {
            http::Method::GET | http::Method::HEAD => {
                if self.containers.contains_key(container) {
                    empty(http::StatusCode::NO_CONTENT)
                } else {
                    empty(http::StatusCode::NOT_FOUND)
                }
            }
            http::Method::PUT => {
                let created = !self.containers.contains_key(container);
                let mut info = self.containers.entry(container.clone()).or_default();
                update_container(&mut info, headers);
                if created {
                    empty(http::StatusCode::CREATED)
                } else {
                    empty(http::StatusCode::ACCEPTED)
                }
            }
            http::Method::POST => match self.containers.get_mut(container) {
                Some(mut info) => {
                    update_container(&mut info, headers);
                    empty(http::StatusCode::NO_CONTENT)
                }
                None => empty(http::StatusCode::NOT_FOUND),
            },
            http::Method::DELETE => {
                let object_count = self.containers.get(container).map(|info| info.object_count);
                match object_count {
                    None => empty(http::StatusCode::NOT_FOUND),
                    Some(count) if count > 0 => empty(http::StatusCode::CONFLICT),
                    Some(_) => {
                        self.containers.remove(container);
                        empty(http::StatusCode::NO_CONTENT)
                    }
                }
            }
            _ => empty(http::StatusCode::METHOD_NOT_ALLOWED),
        }
    }

    fn apply_object(
        &self,
        method: &http::Method,
        object: &ObjectRef,
        headers: &http::HeaderMap,
    ) -> InternalResponse {
        if !self.containers.contains_key(&object.container) {
            return empty(http::StatusCode::NOT_FOUND);
        }
        match *method {
            http::Method::GET | http::Method::HEAD => {
                if self.objects.contains_key(object) {
                    empty(http::StatusCode::OK)
                } else {
                    empty(http::StatusCode::NOT_FOUND)
                }
            }
            http::Method::PUT => {
                let mut info = ObjectInfo::default();
                update_meta(&mut info.meta, headers, "x-object-meta-");
                if self.objects.insert(object.clone(), info).is_none() {
                    if let Some(mut container) = self.containers.get_mut(&object.container) {
                        container.object_count += 1;
                    }
                }
                empty(http::StatusCode::CREATED)
            }
            http::Method::POST => match self.objects.get_mut(object) {
                Some(mut info) => {
                    update_meta(&mut info.meta, headers, "x-object-meta-");
                    empty(http::StatusCode::ACCEPTED)
                }
                None => empty(http::StatusCode::NOT_FOUND),
            },
            http::Method::DELETE => {
                if self.objects.remove(object).is_some() {
                    if let Some(mut container) = self.containers.get_mut(&object.container) {
                        container.object_count = container.object_count.saturating_sub(1);
                    }
                    empty(http::StatusCode::NO_CONTENT)
                } else {
                    empty(http::StatusCode::NOT_FOUND)
                }
            }
            _ => empty(http::StatusCode::METHOD_NOT_ALLOWED),
        }
    }
}

fn empty(status: http::StatusCode) -> InternalResponse {
    InternalResponse::new(status, Bytes::new())
}

fn update_container(info: &mut ContainerInfo, headers: &http::HeaderMap) {
    update_meta(&mut info.meta, headers, "x-container-meta-");
    if let Some(acl) = headers.get("x-container-read").and_then(|v| v.to_str().ok()) {
        info.read_acl = acl.to_owned();
    }
    if let Some(acl) = headers.get("x-container-write").and_then(|v| v.to_str().ok()) {
        info.write_acl = acl.to_owned();
    }
}

fn update_meta(
    meta: &mut std::collections::BTreeMap<String, String>,
    headers: &http::HeaderMap,
    prefix: &str,
) {
    for (name, value) in headers {
        let Some(key) = name.as_str().strip_prefix(prefix) else {
            continue;
        };
        let value = value.to_str().unwrap_or_default();
        if value.is_empty() {
            meta.remove(key);
        } else {
            meta.insert(key.to_owned(), value.to_owned());
        }
    }
}

#[async_trait]
impl MetadataStore for MemoryCluster {
    async fn get_container_info(&self, container: &ContainerRef) -> AliasGateResult<ContainerInfo> {
        Ok(self.container(container).unwrap_or_default())
    }

    async fn get_object_info(&self, object: &ObjectRef) -> AliasGateResult<ObjectInfo> {
        Ok(self
            .objects
            .get(object)
            .map(|info| info.clone())
            .unwrap_or_default())
    }
}

#[async_trait]
impl InternalClient for MemoryCluster {
    async fn send_internal_request(
        &self,
        method: http::Method,
        path: &str,
        headers: http::HeaderMap,
    ) -> AliasGateResult<InternalResponse> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(AliasGateError::Upstream("cluster unreachable".to_owned()));
        }
        Ok(self.apply(&method, path, &headers))
    }
}

#[async_trait]
impl IdentityClient for MemoryCluster {
    async fn find_tenant_id(&self, name: &str) -> AliasGateResult<Option<String>> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(AliasGateError::Identity("identity service unreachable".to_owned()));
        }
        Ok(self.tenants.get(name).map(|id| id.clone()))
    }
}
