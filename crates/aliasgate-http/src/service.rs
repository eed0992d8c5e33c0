//! The gateway HTTP service implementing hyper's `Service` trait.
//!
//! [`AliasGateService`] runs every request through:
//!
//! 1. Health check interception (`GET /healthcheck`)
//! 2. Request body collection
//! 3. Removal of headers clients must not set (see
//!    [`AliasGateService::with_stripped_header`])
//! 4. [`RequestInterceptor::intercept`]: alias validation, URI rewrite, ACL diff
//! 5. Forwarding to the [`Downstream`]
//! 6. [`RequestInterceptor::propagate`]: shadow containers, on success only
//! 7. Common response headers (`x-aliasgate-request-id`)
//! 8. Error response formatting

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use aliasgate_core::RequestInterceptor;
use aliasgate_model::AliasGateError;
use bytes::Bytes;
use http_body_util::BodyExt;
use hyper::body::Incoming;
use hyper::service::Service;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::dispatch::{Downstream, GatewayBody};

/// Header carrying the per-request identifier, on both the forwarded request
/// and the response.
pub const REQUEST_ID_HEADER: &str = "x-aliasgate-request-id";

/// Path answered by the gateway itself.
pub const HEALTH_CHECK_PATH: &str = "/healthcheck";

/// Body of a healthy health check response.
pub const HEALTH_CHECK_BODY: &str = "OK";

/// The gateway HTTP service.
///
/// # Type Parameters
///
/// - `D`: The next stage implementing [`Downstream`].
pub struct AliasGateService<D: Downstream> {
    downstream: Arc<D>,
    interceptor: Arc<RequestInterceptor>,
    stripped_headers: Arc<[http::HeaderName]>,
}

impl<D: Downstream> std::fmt::Debug for AliasGateService<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AliasGateService")
            .field("interceptor", &self.interceptor)
            .field("stripped_headers", &self.stripped_headers)
            .finish_non_exhaustive()
    }
}

impl<D: Downstream> AliasGateService<D> {
    /// Create a new service.
    #[must_use]
    pub fn new(downstream: D, interceptor: RequestInterceptor) -> Self {
        Self::from_shared(Arc::new(downstream), Arc::new(interceptor))
    }

    /// Create a new service from shared parts.
    #[must_use]
    pub fn from_shared(downstream: Arc<D>, interceptor: Arc<RequestInterceptor>) -> Self {
        Self {
            downstream,
            interceptor,
            stripped_headers: Arc::from(Vec::new()),
        }
    }

    /// Remove `name` from every inbound request before interception.
    ///
    /// Used for the acting-user header when no trusted layer in front of the
    /// gateway sets it. The header is neither consulted nor forwarded.
    #[must_use]
    pub fn with_stripped_header(mut self, name: http::HeaderName) -> Self {
        let mut names = self.stripped_headers.to_vec();
        names.push(name);
        self.stripped_headers = names.into();
        self
    }

    /// Run a fully buffered request through the pipeline.
    pub async fn handle(&self, req: http::Request<Bytes>) -> http::Response<GatewayBody> {
        let request_id = Uuid::new_v4().to_string();
        let (parts, body) = req.into_parts();
        let response = self.process_request(parts, body, &request_id).await;
        add_common_headers(response, &request_id)
    }

    async fn process_request(
        &self,
        mut parts: http::request::Parts,
        body: Bytes,
        request_id: &str,
    ) -> http::Response<GatewayBody> {
        debug!(method = %parts.method, uri = %parts.uri, request_id, "processing request");

        if is_health_check(&parts.method, parts.uri.path()) {
            return health_check_response();
        }

        for name in self.stripped_headers.iter() {
            if parts.headers.remove(name).is_some() {
                debug!(header = %name, request_id, "stripped client-supplied header");
            }
        }

        let shadow_plan = match self.interceptor.intercept(&mut parts).await {
            Ok(outcome) => {
                if outcome.is_rewritten() {
                    debug!(uri = %parts.uri, request_id, "forwarding rewritten request");
                }
                outcome.shadow_plan
            }
            Err(err) if err.is_client_error() => {
                info!(
                    method = %parts.method,
                    uri = %parts.uri,
                    error = %err,
                    request_id,
                    "rejected request"
                );
                return error_response(&err);
            }
            Err(err) => {
                warn!(
                    method = %parts.method,
                    uri = %parts.uri,
                    error = %err,
                    request_id,
                    "interception failed"
                );
                return error_response(&err);
            }
        };

        if let Ok(value) = http::HeaderValue::from_str(request_id) {
            parts.headers.insert(REQUEST_ID_HEADER, value);
        }

        let response = match self.downstream.forward(parts, body).await {
            Ok(response) => response,
            Err(err) => {
                warn!(error = %err, request_id, "downstream request failed");
                return error_response(&err);
            }
        };

        if let Some(plan) = shadow_plan {
            let propagation = self.interceptor.propagate(&plan, response.status()).await;
            debug!(
                request_id,
                source = %plan.source,
                revoked = propagation.revoked.len(),
                granted = propagation.granted.len(),
                "shadow propagation finished"
            );
        }

        response
    }
}

impl<D: Downstream> Clone for AliasGateService<D> {
    fn clone(&self) -> Self {
        Self {
            downstream: Arc::clone(&self.downstream),
            interceptor: Arc::clone(&self.interceptor),
            stripped_headers: Arc::clone(&self.stripped_headers),
        }
    }
}

impl<D: Downstream> Service<http::Request<Incoming>> for AliasGateService<D> {
    type Response = http::Response<GatewayBody>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: http::Request<Incoming>) -> Self::Future {
        let service = self.clone();

        Box::pin(async move {
            let request_id = Uuid::new_v4().to_string();
            let (parts, incoming) = req.into_parts();

            let response = match collect_body(incoming).await {
                Ok(body) => service.process_request(parts, body, &request_id).await,
                Err(err) => {
                    error!(error = %err, request_id, "failed to collect request body");
                    error_response(&AliasGateError::Internal(err.into()))
                }
            };

            Ok(add_common_headers(response, &request_id))
        })
    }
}

async fn collect_body(incoming: Incoming) -> Result<Bytes, hyper::Error> {
    let collected = incoming.collect().await?;
    Ok(collected.to_bytes())
}

fn is_health_check(method: &http::Method, path: &str) -> bool {
    *method == http::Method::GET && path == HEALTH_CHECK_PATH
}

fn health_check_response() -> http::Response<GatewayBody> {
    plain_text(http::StatusCode::OK, HEALTH_CHECK_BODY.to_owned())
}

/// Render an error as a plain-text response with the error's status code.
#[must_use]
pub fn error_response(err: &AliasGateError) -> http::Response<GatewayBody> {
    plain_text(err.status_code(), err.to_string())
}

fn plain_text(status: http::StatusCode, text: String) -> http::Response<GatewayBody> {
    let mut response = http::Response::new(GatewayBody::from(text));
    *response.status_mut() = status;
    response.headers_mut().insert(
        http::header::CONTENT_TYPE,
        http::HeaderValue::from_static("text/plain"),
    );
    response
}

fn add_common_headers(
    mut response: http::Response<GatewayBody>,
    request_id: &str,
) -> http::Response<GatewayBody> {
    if let Ok(value) = http::HeaderValue::from_str(request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}
