//! The boundary between the gateway and the storage proxy it fronts.
//!
//! After interception a request is handed, possibly rewritten, to a
//! [`Downstream`]. The server binary forwards over HTTP; tests apply requests
//! to an in-memory cluster.

use std::future::Future;
use std::pin::Pin;

use aliasgate_model::AliasGateError;
use bytes::Bytes;
use http_body_util::Full;

/// Response body relayed to clients. Upstream responses are buffered before
/// they are relayed, so a single full body covers every response.
pub type GatewayBody = Full<Bytes>;

/// Future returned by [`Downstream::forward`].
pub type ForwardFuture =
    Pin<Box<dyn Future<Output = Result<http::Response<GatewayBody>, AliasGateError>> + Send>>;

/// The next stage in the request pipeline.
///
/// # Object Safety
///
/// The returned future is boxed so the service can hold any implementation
/// behind a shared pointer.
pub trait Downstream: Send + Sync + 'static {
    /// Forward a request and produce the response to relay to the client.
    fn forward(&self, parts: http::request::Parts, body: Bytes) -> ForwardFuture;
}

/// A downstream that answers every request with `404 Not Found`.
///
/// Useful for exercising interception in isolation.
#[derive(Debug, Clone, Default)]
pub struct NotFoundDownstream;

impl Downstream for NotFoundDownstream {
    fn forward(&self, _parts: http::request::Parts, _body: Bytes) -> ForwardFuture {
        Box::pin(async move {
            Ok(http::Response::builder()
                .status(http::StatusCode::NOT_FOUND)
                .body(GatewayBody::default())
                .map_err(|err| AliasGateError::Internal(err.into()))?)
        })
    }
}
