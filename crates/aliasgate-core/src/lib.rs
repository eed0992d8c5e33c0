//! Alias resolution and ACL-driven shadow container synchronization.
//!
//! The pieces compose as follows:
//!
//! ```text
//! request parts
//!   -> RequestInterceptor::intercept
//!     -> container DELETE: capture every reader for teardown
//!     -> AliasResolver (one hop per level; alias writes hit the pointer)
//!     -> POST where it lands: alias write validation, read-ACL diff
//!     -> URI rewrite
//!   => ShadowPlan
//! downstream response
//!   -> RequestInterceptor::propagate (2xx only)
//!     -> ShadowContainerSynchronizer (revoke, then grant)
//!          -> StorageLocator (account -> endpoint)
//!          -> InternalClient (PUT/DELETE shadow)
//! ```
//!
//! [`memory::MemoryCluster`] implements every collaborator in memory and is
//! what the tests run against.

pub mod acl;
pub mod alias;
pub mod config;
pub mod interceptor;
pub mod locator;
pub mod memory;
pub mod sync;

pub use acl::{AclDiff, parse_acl_accounts};
pub use alias::AliasResolver;
pub use config::{AliasGateConfig, LocatorStrategy};
pub use interceptor::{InterceptOutcome, Propagation, RequestInterceptor, ShadowPlan};
pub use locator::{StorageLocator, build_locator};
pub use sync::{ShadowContainerSynchronizer, SkipReason, TargetOutcome, TargetResult};
