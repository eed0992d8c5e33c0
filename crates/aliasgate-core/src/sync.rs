//! Shadow container synchronization.
//!
//! When a container's read ACL grants an account, that account gets a shadow
//! container named `<prefix><source_account>_<source_container>` in its own
//! storage endpoint, carrying `X-Container-Meta-Storage-Path` pointing back at
//! the source. Revoking the grant or deleting the source removes it again.
//!
//! Fan-out is best effort: each target is attempted independently and its
//! outcome reported, but nothing is retried and no outcome affects the
//! originating request.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use aliasgate_model::{AccountId, ContainerRef, InternalClient};
use tracing::{info, warn};

use crate::locator::StorageLocator;

/// Header carrying the back-pointer on a shadow container.
pub const STORAGE_PATH_HEADER: &str = "x-container-meta-storage-path";

/// Why a target account was skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The target is the account performing the change.
    ActingAccount,
    /// The target resolves to the source container's own account.
    SourceAccount,
    /// The ACL entry had no account part.
    EmptyAccount,
    /// The locator could not resolve the account.
    Unresolved,
}

/// Result of propagating to one target account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetResult {
    /// The request was accepted by the target endpoint.
    Applied {
        /// Shadow container path.
        path: String,
        /// Response status.
        status: http::StatusCode,
    },
    /// No request was issued.
    Skipped(SkipReason),
    /// The request was issued and failed.
    Failed {
        /// Shadow container path.
        path: String,
        /// Failure description.
        reason: String,
    },
}

/// Outcome for a single target account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetOutcome {
    /// The target account.
    pub account: AccountId,
    /// What happened.
    pub result: TargetResult,
}

impl TargetOutcome {
    /// Whether a request was issued and succeeded.
    #[must_use]
    pub fn is_applied(&self) -> bool {
        matches!(self.result, TargetResult::Applied { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Create,
    Delete,
}

impl Operation {
    fn method(self) -> http::Method {
        match self {
            Self::Create => http::Method::PUT,
            Self::Delete => http::Method::DELETE,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Delete => "delete",
        }
    }
}

/// Creates and deletes shadow containers in granted accounts.
pub struct ShadowContainerSynchronizer {
    prefix: String,
    locator: Arc<dyn StorageLocator>,
    client: Arc<dyn InternalClient>,
}

impl fmt::Debug for ShadowContainerSynchronizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShadowContainerSynchronizer")
            .field("prefix", &self.prefix)
            .field("locator", &self.locator)
            .finish_non_exhaustive()
    }
}

impl ShadowContainerSynchronizer {
    /// Create a synchronizer naming shadows with `prefix`.
    #[must_use]
    pub fn new(
        prefix: impl Into<String>,
        locator: Arc<dyn StorageLocator>,
        client: Arc<dyn InternalClient>,
    ) -> Self {
        Self {
            prefix: prefix.into(),
            locator,
            client,
        }
    }

    /// Name of the shadow container mirroring `source`.
    #[must_use]
    pub fn shadow_name(&self, source: &ContainerRef) -> String {
        format!("{}{}_{}", self.prefix, source.account, source.container)
    }

    /// Create a shadow of `source` in every account of `accounts`.
    ///
    /// `version` is the API version of the source path written into the
    /// shadow's storage-path metadata.
    pub async fn create_targets(
        &self,
        version: &str,
        source: &ContainerRef,
        acting_account: Option<&AccountId>,
        accounts: &BTreeSet<AccountId>,
    ) -> Vec<TargetOutcome> {
        self.fan_out(Operation::Create, version, source, acting_account, accounts)
            .await
    }

    /// Delete the shadow of `source` from every account of `accounts`.
    ///
    /// A shadow that does not exist counts as deleted.
    pub async fn delete_targets(
        &self,
        version: &str,
        source: &ContainerRef,
        acting_account: Option<&AccountId>,
        accounts: &BTreeSet<AccountId>,
    ) -> Vec<TargetOutcome> {
        self.fan_out(Operation::Delete, version, source, acting_account, accounts)
            .await
    }

    async fn fan_out(
        &self,
        op: Operation,
        version: &str,
        source: &ContainerRef,
        acting_account: Option<&AccountId>,
        accounts: &BTreeSet<AccountId>,
    ) -> Vec<TargetOutcome> {
        let mut outcomes = Vec::with_capacity(accounts.len());
        for account in accounts {
            let result = self
                .sync_target(op, version, source, acting_account, account)
                .await;
            log_outcome(op, source, account, &result);
            outcomes.push(TargetOutcome {
                account: account.clone(),
                result,
            });
        }
        outcomes
    }

    async fn sync_target(
        &self,
        op: Operation,
        version: &str,
        source: &ContainerRef,
        acting_account: Option<&AccountId>,
        account: &AccountId,
    ) -> TargetResult {
        if acting_account == Some(account) {
            return TargetResult::Skipped(SkipReason::ActingAccount);
        }
        if account.is_empty() {
            return TargetResult::Skipped(SkipReason::EmptyAccount);
        }
        let Some(endpoint) = self.locator.locate(account).await else {
            return TargetResult::Skipped(SkipReason::Unresolved);
        };
        if is_source_endpoint(&endpoint, source) {
            return TargetResult::Skipped(SkipReason::SourceAccount);
        }

        let path = format!("{endpoint}/{}", self.shadow_name(source));
        let mut headers = http::HeaderMap::new();
        if op == Operation::Create {
            match http::HeaderValue::from_str(&source.path(version)) {
                Ok(value) => {
                    headers.insert(STORAGE_PATH_HEADER, value);
                }
                Err(err) => {
                    return TargetResult::Failed {
                        path,
                        reason: err.to_string(),
                    };
                }
            }
        }

        match self
            .client
            .send_internal_request(op.method(), &path, headers)
            .await
        {
            Ok(resp)
                if resp.status.is_success()
                    || (op == Operation::Delete && resp.status == http::StatusCode::NOT_FOUND) =>
            {
                TargetResult::Applied {
                    path,
                    status: resp.status,
                }
            }
            Ok(resp) => TargetResult::Failed {
                path,
                reason: format!("unexpected status {}", resp.status),
            },
            Err(err) => TargetResult::Failed {
                path,
                reason: err.to_string(),
            },
        }
    }
}

fn is_source_endpoint(endpoint: &str, source: &ContainerRef) -> bool {
    endpoint.trim_end_matches('/').rsplit('/').next() == Some(source.account.as_str())
}

fn log_outcome(op: Operation, source: &ContainerRef, account: &AccountId, result: &TargetResult) {
    let op = op.as_str();
    match result {
        TargetResult::Applied { path, status } => {
            info!(op, %source, %account, %path, %status, "synchronized shadow container");
        }
        TargetResult::Skipped(SkipReason::Unresolved) => {
            warn!(op, %source, %account, "skipping shadow container, account unresolved");
        }
        TargetResult::Skipped(reason) => {
            tracing::debug!(op, %source, %account, ?reason, "skipping shadow container");
        }
        TargetResult::Failed { path, reason } => {
            warn!(op, %source, %account, %path, %reason, "shadow container propagation failed");
        }
    }
}
