//! Per-request entry point.
//!
//! [`RequestInterceptor::intercept`] runs before a request is forwarded:
//!
//! 1. Path split. Malformed paths pass through untouched.
//! 2. Container `DELETE`: the current read ACL is captured for teardown and
//!    the request is forwarded unmodified. Container `HEAD` is forwarded
//!    unmodified.
//! 3. Alias resolution. A `POST` writing alias metadata addresses the pointer
//!    itself; every other request follows aliases.
//! 4. `POST` validation and planning against the container or object the
//!    write lands on: invalid alias writes are rejected, and a read-ACL change
//!    is diffed into a [`ShadowPlan`].
//! 5. URI rewrite.
//!
//! [`RequestInterceptor::propagate`] runs after the downstream has answered
//! and applies the plan only if the request succeeded. Propagation outcomes
//! never fail the request; neither does a metadata lookup failure outside
//! alias validation, which degrades to forwarding the request unchanged.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use aliasgate_model::path::encode_path;
use aliasgate_model::{
    AccountId, AccountIdentity, AliasGateError, AliasGateResult, ContainerInfo, ContainerRef,
    InternalClient, MetadataStore, ObjectRef, RequestPath, StoragePath,
};
use tracing::{debug, info, warn};

use crate::acl::{AclDiff, parse_acl_accounts};
use crate::alias::AliasResolver;
use crate::locator::StorageLocator;
use crate::sync::{ShadowContainerSynchronizer, TargetOutcome};

/// Header setting a container alias.
pub const CONTAINER_ALIAS_HEADER: &str = "x-container-meta-alias";
/// Header setting a container storage path.
pub const CONTAINER_STORAGE_PATH_HEADER: &str = "x-container-meta-storage-path";
/// Header setting an object alias.
pub const OBJECT_ALIAS_HEADER: &str = "x-object-meta-alias";
/// Header carrying a container's read ACL.
pub const CONTAINER_READ_HEADER: &str = "x-container-read";
/// Header recording the path a rewritten request was addressed to.
pub const ORIGINAL_PATH_HEADER: &str = "x-aliasgate-original-path";

/// Shadow container changes to make once the request has succeeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShadowPlan {
    /// API version written into shadow storage paths.
    pub version: String,
    /// The container whose read ACL changes or which is being deleted.
    pub source: ContainerRef,
    /// Account performing the change, never targeted.
    pub acting_account: Option<AccountId>,
    /// Accounts whose shadow is deleted.
    pub revoke: BTreeSet<AccountId>,
    /// Accounts that get a shadow.
    pub grant: BTreeSet<AccountId>,
}

/// What the interceptor did to a request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterceptOutcome {
    /// Decoded path the request was rewritten to, if any.
    pub rewritten_path: Option<String>,
    /// Shadow changes to apply after a successful response.
    pub shadow_plan: Option<ShadowPlan>,
}

impl InterceptOutcome {
    /// Whether the request URI was rewritten.
    #[must_use]
    pub fn is_rewritten(&self) -> bool {
        self.rewritten_path.is_some()
    }
}

/// Per-target outcomes of an applied [`ShadowPlan`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Propagation {
    /// Shadow deletions, issued first.
    pub revoked: Vec<TargetOutcome>,
    /// Shadow creations.
    pub granted: Vec<TargetOutcome>,
}

/// Sequences alias validation, alias rewriting, and ACL synchronization.
pub struct RequestInterceptor {
    metadata: Arc<dyn MetadataStore>,
    identity: Arc<dyn AccountIdentity>,
    synchronizer: ShadowContainerSynchronizer,
    resolver: AliasResolver,
}

impl fmt::Debug for RequestInterceptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestInterceptor")
            .field("synchronizer", &self.synchronizer)
            .finish_non_exhaustive()
    }
}

impl RequestInterceptor {
    /// Create an interceptor.
    ///
    /// `shadow_prefix` names shadow containers; `locator` resolves the
    /// endpoints they are created in.
    #[must_use]
    pub fn new(
        shadow_prefix: impl Into<String>,
        metadata: Arc<dyn MetadataStore>,
        internal: Arc<dyn InternalClient>,
        locator: Arc<dyn StorageLocator>,
        identity: Arc<dyn AccountIdentity>,
    ) -> Self {
        Self {
            resolver: AliasResolver::new(Arc::clone(&metadata)),
            synchronizer: ShadowContainerSynchronizer::new(shadow_prefix, locator, internal),
            metadata,
            identity,
        }
    }

    /// Process a request in place.
    ///
    /// On success the request may have a rewritten URI and is ready to be
    /// forwarded. A client error means the request must be rejected. Nothing
    /// is written to the cluster here.
    pub async fn intercept(
        &self,
        parts: &mut http::request::Parts,
    ) -> AliasGateResult<InterceptOutcome> {
        let mut outcome = InterceptOutcome::default();

        let raw_path = parts.uri.path().to_owned();
        let path = match RequestPath::parse(&raw_path) {
            Ok(path) => path,
            Err(err) => {
                debug!(error = %err, "passing through unparseable path");
                return Ok(outcome);
            }
        };
        let Some(literal) = path.storage_path() else {
            return Ok(outcome);
        };

        if path.is_container_only() {
            match parts.method {
                http::Method::DELETE => {
                    outcome.shadow_plan = self.plan_teardown(&literal, parts).await;
                    return Ok(outcome);
                }
                http::Method::HEAD => return Ok(outcome),
                _ => {}
            }
        }

        let is_post = parts.method == http::Method::POST;
        let resolved = if is_post && writes_alias(&path, &parts.headers) {
            self.resolver.resolve_pointer(&path).await
        } else {
            self.resolver.resolve(&path, &parts.method).await
        };
        let target = resolved.unwrap_or_else(|err| {
            warn!(path = %raw_path, error = %err, "alias lookup failed, forwarding unchanged");
            None
        });

        if is_post {
            let landing = target.as_ref().unwrap_or(&literal);
            match landing.object_ref() {
                None => {
                    self.validate_container_alias(&landing.container, &parts.headers)
                        .await?;
                    outcome.shadow_plan = self.plan_acl_change(landing, parts).await;
                }
                Some(object) => self.validate_object_alias(&object, &parts.headers).await?,
            }
        }

        if let Some(target) = target {
            let target = target.path();
            rewrite_uri(parts, &raw_path, &target)?;
            info!(
                method = %parts.method,
                from = %raw_path,
                to = %target,
                "rewrote aliased request"
            );
            outcome.rewritten_path = Some(target);
        }

        Ok(outcome)
    }

    /// Apply `plan` if the forwarded request answered `status` with success.
    ///
    /// Revocations are issued before grants.
    pub async fn propagate(&self, plan: &ShadowPlan, status: http::StatusCode) -> Propagation {
        if !status.is_success() {
            info!(
                source = %plan.source,
                %status,
                "request did not succeed, leaving shadow containers unchanged"
            );
            return Propagation::default();
        }

        let acting = plan.acting_account.as_ref();
        let revoked = self
            .synchronizer
            .delete_targets(&plan.version, &plan.source, acting, &plan.revoke)
            .await;
        let granted = self
            .synchronizer
            .create_targets(&plan.version, &plan.source, acting, &plan.grant)
            .await;
        Propagation { revoked, granted }
    }

    /// Capture every reader of a container about to be deleted.
    async fn plan_teardown(
        &self,
        source: &StoragePath,
        parts: &http::request::Parts,
    ) -> Option<ShadowPlan> {
        let info = match self.metadata.get_container_info(&source.container).await {
            Ok(info) => info,
            Err(err) => {
                let container = &source.container;
                warn!(%container, error = %err, "cannot read ACL, skipping shadow teardown");
                return None;
            }
        };
        let accounts = parse_acl_accounts(&info.read_acl);
        debug!(
            container = %source.container,
            accounts = accounts.len(),
            "planning shadow teardown"
        );
        Some(ShadowPlan {
            version: source.version.clone(),
            source: source.container.clone(),
            acting_account: self.identity.acting_account(parts),
            revoke: accounts,
            grant: BTreeSet::new(),
        })
    }

    /// Diff a read-ACL change carried by a container POST.
    async fn plan_acl_change(
        &self,
        source: &StoragePath,
        parts: &http::request::Parts,
    ) -> Option<ShadowPlan> {
        let container = &source.container;
        let new_acl = parts.headers.get(CONTAINER_READ_HEADER)?;
        let Ok(new_acl) = new_acl.to_str() else {
            warn!(%container, "ignoring non-UTF-8 read ACL");
            return None;
        };

        let info = match self.metadata.get_container_info(container).await {
            Ok(info) => info,
            Err(err) => {
                warn!(%container, error = %err, "cannot read ACL, skipping shadow propagation");
                return None;
            }
        };
        let diff = AclDiff::between(&info.read_acl, new_acl);
        if diff.is_empty() {
            return None;
        }

        debug!(
            %container,
            added = ?diff.added,
            removed = ?diff.removed,
            "read ACL changed"
        );
        Some(ShadowPlan {
            version: source.version.clone(),
            source: container.clone(),
            acting_account: self.identity.acting_account(parts),
            revoke: diff.removed,
            grant: diff.added,
        })
    }

    /// Reject container alias writes that would hide objects, name an invalid
    /// target, or chain aliases.
    async fn validate_container_alias(
        &self,
        container: &ContainerRef,
        headers: &http::HeaderMap,
    ) -> AliasGateResult<()> {
        let mut source_info: Option<ContainerInfo> = None;

        for header in [CONTAINER_STORAGE_PATH_HEADER, CONTAINER_ALIAS_HEADER] {
            let Some(value) = alias_header(headers, header)? else {
                continue;
            };

            let info = match source_info.take() {
                Some(info) => info,
                None => self.metadata.get_container_info(container).await?,
            };
            if info.object_count > 0 {
                warn!(
                    %container,
                    object_count = info.object_count,
                    "rejecting alias on non-empty container"
                );
                return Err(AliasGateError::ContainerNotEmpty {
                    container: container.to_string(),
                    object_count: info.object_count,
                });
            }
            source_info = Some(info);

            let target = StoragePath::container_target(value)?;
            if target.container == *container {
                return Err(AliasGateError::AliasLoop(value.to_owned()));
            }
            let target_info = self.metadata.get_container_info(&target.container).await?;
            if target_info.alias().is_some() {
                warn!(%container, target = %value, "rejecting alias to an alias");
                return Err(AliasGateError::AliasLoop(value.to_owned()));
            }
        }
        Ok(())
    }

    /// Reject object alias writes naming an invalid target or an alias.
    async fn validate_object_alias(
        &self,
        object: &ObjectRef,
        headers: &http::HeaderMap,
    ) -> AliasGateResult<()> {
        let Some(value) = alias_header(headers, OBJECT_ALIAS_HEADER)? else {
            return Ok(());
        };
        let target = StoragePath::object_target(value)?;
        let Some(target_object) = target.object_ref() else {
            return Err(AliasGateError::InvalidAliasTarget(value.to_owned()));
        };
        if target_object == *object {
            return Err(AliasGateError::AliasLoop(value.to_owned()));
        }
        if self
            .metadata
            .get_object_info(&target_object)
            .await?
            .alias()
            .is_some()
        {
            warn!(%object, target = %value, "rejecting alias to an alias");
            return Err(AliasGateError::AliasLoop(value.to_owned()));
        }
        Ok(())
    }
}

/// Whether the request writes the alias metadata of the level it addresses.
/// Empty values count: removing an alias writes the pointer too.
fn writes_alias(path: &RequestPath, headers: &http::HeaderMap) -> bool {
    if path.is_container_only() {
        headers.contains_key(CONTAINER_ALIAS_HEADER)
            || headers.contains_key(CONTAINER_STORAGE_PATH_HEADER)
    } else {
        headers.contains_key(OBJECT_ALIAS_HEADER)
    }
}

/// A non-empty alias header value. Empty values remove the alias and are
/// never validated.
fn alias_header<'a>(
    headers: &'a http::HeaderMap,
    name: &str,
) -> AliasGateResult<Option<&'a str>> {
    let Some(value) = headers.get(name) else {
        return Ok(None);
    };
    let Ok(text) = value.to_str() else {
        let lossy = String::from_utf8_lossy(value.as_bytes()).into_owned();
        return Err(AliasGateError::InvalidAliasTarget(lossy));
    };
    let text = text.trim();
    Ok((!text.is_empty()).then_some(text))
}

/// Point the request URI at `target`, keeping the query string.
fn rewrite_uri(
    parts: &mut http::request::Parts,
    original: &str,
    target: &str,
) -> AliasGateResult<()> {
    let encoded = encode_path(target);
    let path_and_query = match parts.uri.query() {
        Some(query) => format!("{encoded}?{query}"),
        None => encoded,
    };

    let mut uri_parts = parts.uri.clone().into_parts();
    uri_parts.path_and_query = Some(
        http::uri::PathAndQuery::try_from(path_and_query)
            .map_err(|_| AliasGateError::InvalidAliasTarget(target.to_owned()))?,
    );
    parts.uri = http::Uri::from_parts(uri_parts)
        .map_err(|_| AliasGateError::InvalidAliasTarget(target.to_owned()))?;

    if let Ok(value) = http::HeaderValue::from_str(original) {
        parts.headers.insert(ORIGINAL_PATH_HEADER, value);
    }
    Ok(())
}
