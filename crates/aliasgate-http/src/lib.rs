//! HTTP layer for AliasGate.
//!
//! - **Service** ([`service`]): [`AliasGateService`](service::AliasGateService)
//!   implements hyper's `Service` trait and runs each request through the
//!   [`RequestInterceptor`](aliasgate_core::RequestInterceptor) before handing
//!   it on.
//! - **Dispatch** ([`dispatch`]): the [`Downstream`](dispatch::Downstream)
//!   trait the service forwards to, and the
//!   [`GatewayBody`](dispatch::GatewayBody) response type.
//!
//! # Architecture
//!
//! ```text
//! HTTP Request
//!   -> AliasGateService (hyper Service)
//!     -> Health check interception
//!     -> Body collection
//!     -> Untrusted header stripping
//!     -> RequestInterceptor::intercept (alias validation, rewrite, ACL diff)
//!     -> Downstream::forward
//!     -> RequestInterceptor::propagate (shadow sync, 2xx only)
//!     -> Common response headers (x-aliasgate-request-id)
//!   <- HTTP Response
//! ```

pub mod dispatch;
pub mod service;

pub use dispatch::{Downstream, ForwardFuture, GatewayBody, NotFoundDownstream};
pub use service::AliasGateService;
