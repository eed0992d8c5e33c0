//! AliasGate Server - alias redirection and shared-container sync for Swift.
//!
//! This binary sits in front of a Swift proxy. It rewrites requests addressed
//! to aliased containers and objects, rejects alias writes that would hide data
//! or chain aliases, and keeps a shadow container in every account granted read
//! access to a container.
//!
//! # Usage
//!
//! ```text
//! UPSTREAM_URL=http://127.0.0.1:8080 GATEWAY_LISTEN=0.0.0.0:8090 aliasgate-server
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `GATEWAY_LISTEN` | `0.0.0.0:8090` | Bind address |
//! | `UPSTREAM_URL` | `http://127.0.0.1:8080` | Swift proxy base URL |
//! | `UPSTREAM_AUTH_TOKEN` | *(unset)* | Token for internal requests |
//! | `SHADOW_PREFIX` | `SHARED_` | Shadow container name prefix |
//! | `AUTH_METHOD` | `tempauth` | `tempauth`, `swauth`, or `keystone` |
//! | `RESELLER_PREFIX` | `AUTH` | Account reseller prefix |
//! | `API_VERSION` | `v1` | API version for gateway-built paths |
//! | `REMOTE_USER_HEADER` | `x-remote-user` | Header naming the acting user |
//! | `TRUST_REMOTE_USER` | `false` | Honor client-visible `REMOTE_USER_HEADER` values |
//! | `KEYSTONE_AUTH_URL` | *(unset)* | Identity service URL |
//! | `KEYSTONE_ADMIN_TOKEN` | *(unset)* | Identity service token |
//! | `LOG_LEVEL` | `info` | Log level filter |
//! | `RUST_LOG` | *(unset)* | Fine-grained tracing filter (overrides `LOG_LEVEL`) |

mod identity;
mod upstream;

use std::net::SocketAddr;
use std::sync::Arc;

use aliasgate_core::{AliasGateConfig, LocatorStrategy, RequestInterceptor, build_locator};
use aliasgate_http::AliasGateService;
use aliasgate_http::service::{HEALTH_CHECK_BODY, HEALTH_CHECK_PATH};
use aliasgate_model::{AliasGateError, IdentityClient, RemoteUserIdentity};
use anyhow::{Context, Result};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as HttpConnBuilder;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::identity::KeystoneClient;
use crate::upstream::UpstreamClient;

/// Server version reported at startup.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the tracing subscriber.
///
/// Uses `RUST_LOG` if set, otherwise falls back to the `LOG_LEVEL` config value.
fn init_tracing(log_level: &str) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level filter: {log_level}"))?
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    Ok(())
}

/// Build the identity client, which only the `keystone` strategy needs.
fn build_identity(config: &AliasGateConfig) -> Result<Arc<dyn IdentityClient>, AliasGateError> {
    if config.auth_method != LocatorStrategy::Keystone {
        return Err(AliasGateError::Identity(format!(
            "not used by the {} strategy",
            config.auth_method
        )));
    }
    let client: Arc<dyn IdentityClient> = Arc::new(KeystoneClient::from_config(config)?);
    Ok(client)
}

/// Wire the upstream client, locator, and interceptor into the service.
fn build_service(config: &AliasGateConfig) -> Result<AliasGateService<UpstreamClient>> {
    let upstream = Arc::new(UpstreamClient::new(config)?);
    let locator = build_locator(config, upstream.clone(), build_identity(config));
    let identity = RemoteUserIdentity::new(&config.remote_user_header);
    let remote_user_header = identity.header_name().clone();
    let interceptor = RequestInterceptor::new(
        config.shadow_prefix.clone(),
        upstream.clone(),
        upstream.clone(),
        locator,
        Arc::new(identity),
    );

    let service = AliasGateService::from_shared(upstream, Arc::new(interceptor));
    if config.trust_remote_user {
        Ok(service)
    } else {
        info!(header = %remote_user_header, "stripping client-supplied remote user header");
        Ok(service.with_stripped_header(remote_user_header))
    }
}

/// Run the accept loop, serving connections until a shutdown signal is received.
async fn serve(listener: TcpListener, service: AliasGateService<UpstreamClient>) -> Result<()> {
    let graceful = hyper_util::server::graceful::GracefulShutdown::new();
    let http = HttpConnBuilder::new(TokioExecutor::new());

    let shutdown = async {
        tokio::signal::ctrl_c().await.ok();
        info!("received shutdown signal, draining connections");
    };

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = listener.accept() => {
                let (stream, peer_addr) = match result {
                    Ok(conn) => conn,
                    Err(e) => {
                        warn!(error = %e, "failed to accept connection");
                        continue;
                    }
                };

                let svc = service.clone();
                let conn = http.serve_connection(TokioIo::new(stream), svc);
                let conn = graceful.watch(conn.into_owned());

                tokio::spawn(async move {
                    if let Err(e) = conn.await {
                        error!(peer_addr = %peer_addr, error = %e, "connection error");
                    }
                });
            }

            () = &mut shutdown => {
                info!("shutting down gracefully");
                break;
            }
        }
    }

    graceful.shutdown().await;
    info!("all connections drained, exiting");

    Ok(())
}

/// Perform a health check by connecting to the gateway and requesting the health endpoint.
///
/// Exits with code 0 if healthy, 1 otherwise.
async fn run_health_check(addr: &str) -> Result<()> {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    let stream = TcpStream::connect(addr)
        .await
        .with_context(|| format!("cannot connect to {addr}"))?;

    let (mut reader, mut writer) = stream.into_split();

    let request =
        format!("GET {HEALTH_CHECK_PATH} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n");
    writer.write_all(request.as_bytes()).await?;
    writer.shutdown().await?;

    let mut response = String::new();
    reader.read_to_string(&mut response).await?;

    if is_healthy_response(&response) {
        Ok(())
    } else {
        anyhow::bail!("unhealthy response from {addr}")
    }
}

/// Whether a raw HTTP/1.1 response is a `200` carrying the health check body.
fn is_healthy_response(response: &str) -> bool {
    let Some((head, body)) = response.split_once("\r\n\r\n") else {
        return false;
    };
    let status_ok = head
        .lines()
        .next()
        .and_then(|status_line| status_line.split_whitespace().nth(1))
        == Some("200");
    status_ok && body.trim() == HEALTH_CHECK_BODY
}

#[tokio::main]
async fn main() -> Result<()> {
    // Handle --health-check flag for container HEALTHCHECK.
    if std::env::args().any(|a| a == "--health-check") {
        let config = AliasGateConfig::from_env();
        let addr = config.gateway_listen.replace("0.0.0.0", "127.0.0.1");
        let healthy = run_health_check(&addr).await.is_ok();
        std::process::exit(i32::from(!healthy));
    }

    let config = AliasGateConfig::from_env();

    init_tracing(&config.log_level)?;

    info!(
        gateway_listen = %config.gateway_listen,
        upstream_url = %config.upstream_url,
        auth_method = %config.auth_method,
        shadow_prefix = %config.shadow_prefix,
        version = VERSION,
        "starting AliasGate Server",
    );

    let service = build_service(&config)?;

    let addr: SocketAddr = config
        .gateway_listen
        .parse()
        .with_context(|| format!("invalid bind address: {}", config.gateway_listen))?;

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;

    info!(%addr, "listening for connections");

    serve(listener, service).await
}
