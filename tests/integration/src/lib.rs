//! Integration tests for AliasGate.
//!
//! Most tests drive [`AliasGateService`] end to end against an in-memory
//! cluster and run with a plain `cargo test`. Tests marked `#[ignore]` need a
//! running gateway in front of a real Swift proxy at `localhost:8090`.
//!
//! Run them with:
//! ```text
//! cargo test -p aliasgate-integration -- --ignored
//! ```

use std::sync::{Arc, Once};

use aliasgate_core::memory::MemoryCluster;
use aliasgate_core::{AliasGateConfig, RequestInterceptor, build_locator};
use aliasgate_http::{AliasGateService, Downstream, ForwardFuture, GatewayBody};
use aliasgate_model::{IdentityClient, RemoteUserIdentity};
use bytes::Bytes;
use http_body_util::BodyExt;

static INIT: Once = Once::new();

/// Initialize tracing (once).
fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .init();
    });
}

/// A downstream that applies forwarded requests to a [`MemoryCluster`].
#[derive(Debug, Clone)]
pub struct ClusterDownstream(pub Arc<MemoryCluster>);

impl Downstream for ClusterDownstream {
    fn forward(&self, parts: http::request::Parts, _body: Bytes) -> ForwardFuture {
        let resp = self.0.apply(&parts.method, parts.uri.path(), &parts.headers);
        Box::pin(async move {
            let mut response = http::Response::new(GatewayBody::new(resp.body));
            *response.status_mut() = resp.status;
            Ok(response)
        })
    }
}

/// A gateway wired to an in-memory cluster.
#[derive(Debug)]
pub struct Gateway {
    /// The cluster behind the gateway.
    pub cluster: Arc<MemoryCluster>,
    service: AliasGateService<ClusterDownstream>,
}

impl Gateway {
    /// A gateway with the default configuration (`tempauth`, `AUTH` reseller).
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(&AliasGateConfig::default())
    }

    /// A gateway built from `config`, the way the server binary builds one.
    #[must_use]
    pub fn with_config(config: &AliasGateConfig) -> Self {
        init_tracing();

        let cluster = Arc::new(MemoryCluster::new());
        let identity: Arc<dyn IdentityClient> = cluster.clone();
        let locator = build_locator(config, cluster.clone(), Ok(identity));
        let remote_user = RemoteUserIdentity::new(&config.remote_user_header);
        let remote_user_header = remote_user.header_name().clone();
        let interceptor = RequestInterceptor::new(
            config.shadow_prefix.clone(),
            cluster.clone(),
            cluster.clone(),
            locator,
            Arc::new(remote_user),
        );

        let mut service = AliasGateService::new(ClusterDownstream(cluster.clone()), interceptor);
        if !config.trust_remote_user {
            service = service.with_stripped_header(remote_user_header);
        }
        Self { cluster, service }
    }

    /// Send a request through the gateway.
    pub async fn send(
        &self,
        method: http::Method,
        uri: &str,
        headers: &[(&str, &str)],
    ) -> http::Response<GatewayBody> {
        let mut builder = http::Request::builder().method(method).uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let req = builder
            .body(Bytes::new())
            .unwrap_or_else(|e| panic!("invalid request {uri}: {e}"));
        self.service.handle(req).await
    }
}

impl Default for Gateway {
    fn default() -> Self {
        Self::new()
    }
}

/// Collect a response body as text.
pub async fn body_text(resp: http::Response<GatewayBody>) -> String {
    let bytes = resp
        .into_body()
        .collect()
        .await
        .map(http_body_util::Collected::to_bytes)
        .unwrap_or_default();
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Endpoint URL of a running gateway.
#[must_use]
pub fn endpoint_url() -> String {
    std::env::var("ALIASGATE_ENDPOINT_URL").unwrap_or_else(|_| "http://localhost:8090".to_owned())
}

/// Generate a unique container name for a test.
#[must_use]
pub fn test_container_name(prefix: &str) -> String {
    let id = uuid::Uuid::new_v4().to_string()[..8].to_owned();
    format!("test-{prefix}-{id}")
}

mod test_alias;
mod test_live;
mod test_locator;
mod test_shadow;
