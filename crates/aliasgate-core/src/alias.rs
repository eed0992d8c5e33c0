//! Alias resolution.
//!
//! A container carrying `storage-path` (or `alias`) metadata redirects
//! requests to the named container; an object carrying `alias` metadata
//! redirects to the named object. `DELETE` and `HEAD` act on the literal
//! resource so the alias pointer itself stays manageable:
//!
//! | Request | Container alias | Object alias |
//! |---------|-----------------|--------------|
//! | container, GET/PUT/POST/COPY | followed | n/a |
//! | container, DELETE/HEAD | ignored | n/a |
//! | object, GET/PUT/POST/COPY | followed | followed |
//! | object, DELETE/HEAD | followed | ignored |
//!
//! Exactly one hop is taken per level; chains are prevented when aliases are
//! written, not here. A `POST` writing alias metadata addresses the pointer
//! itself and is resolved with [`AliasResolver::resolve_pointer`].

use std::fmt;
use std::sync::Arc;

use aliasgate_model::{AliasGateResult, MetadataStore, ObjectRef, RequestPath, StoragePath};
use tracing::{debug, warn};

/// Whether `method` follows aliases on the level it addresses.
#[must_use]
pub fn follows_alias(method: &http::Method) -> bool {
    !matches!(*method, http::Method::DELETE | http::Method::HEAD)
}

/// Looks up alias metadata and produces the rewritten request path.
pub struct AliasResolver {
    metadata: Arc<dyn MetadataStore>,
}

impl fmt::Debug for AliasResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AliasResolver").finish_non_exhaustive()
    }
}

impl AliasResolver {
    /// Create a resolver reading metadata from `metadata`.
    #[must_use]
    pub fn new(metadata: Arc<dyn MetadataStore>) -> Self {
        Self { metadata }
    }

    /// Resolve `path` for `method`.
    ///
    /// Returns the target, or `None` when no alias applies.
    pub async fn resolve(
        &self,
        path: &RequestPath,
        method: &http::Method,
    ) -> AliasGateResult<Option<StoragePath>> {
        self.resolve_levels(path, follows_alias(method)).await
    }

    /// Resolve `path` for a write of its own alias metadata.
    ///
    /// The addressed level's alias is not followed, so the write lands on the
    /// alias pointer itself. An object still follows its container's alias.
    pub async fn resolve_pointer(
        &self,
        path: &RequestPath,
    ) -> AliasGateResult<Option<StoragePath>> {
        self.resolve_levels(path, false).await
    }

    async fn resolve_levels(
        &self,
        path: &RequestPath,
        follow_leaf: bool,
    ) -> AliasGateResult<Option<StoragePath>> {
        let Some(container) = path.container_ref() else {
            return Ok(None);
        };

        let mut rewritten = None;
        let mut object = path.object_ref();

        if path.object.is_some() || follow_leaf {
            let info = self.metadata.get_container_info(&container).await?;
            if let Some(target) = info.alias().and_then(parse_container_alias) {
                let target = StoragePath {
                    object: path.object.clone(),
                    ..target
                };
                object = target.object_ref();
                debug!(%container, to = %target.path(), "followed container alias");
                rewritten = Some(target);
            }
        }

        if follow_leaf {
            if let Some(object) = object {
                if let Some(target) = self.object_alias(&object).await? {
                    debug!(%object, to = %target.path(), "followed object alias");
                    rewritten = Some(target);
                }
            }
        }

        Ok(rewritten)
    }

    async fn object_alias(&self, object: &ObjectRef) -> AliasGateResult<Option<StoragePath>> {
        let info = self.metadata.get_object_info(object).await?;
        let Some(alias) = info.alias() else {
            return Ok(None);
        };
        match StoragePath::object_target(alias) {
            Ok(target) => Ok(Some(target)),
            Err(err) => {
                warn!(%object, error = %err, "ignoring invalid object alias");
                Ok(None)
            }
        }
    }
}

fn parse_container_alias(alias: &str) -> Option<StoragePath> {
    StoragePath::container_target(alias)
        .inspect_err(|err| warn!(error = %err, "ignoring invalid container alias"))
        .ok()
}
