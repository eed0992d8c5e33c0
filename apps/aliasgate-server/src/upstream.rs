//! HTTP client for the storage proxy the gateway fronts.
//!
//! [`UpstreamClient`] plays three roles:
//!
//! - [`MetadataStore`]: `HEAD` requests mapped onto [`ContainerInfo`] and [`ObjectInfo`].
//! - [`InternalClient`]: shadow container and catalog requests, authorized with
//!   the configured service token.
//! - [`Downstream`]: relays client requests after interception, with the
//!   client's own credentials.

use std::time::Duration;

use aliasgate_core::AliasGateConfig;
use aliasgate_http::{Downstream, ForwardFuture, GatewayBody};
use aliasgate_model::path::encode_path;
use aliasgate_model::{
    AliasGateError, AliasGateResult, ContainerInfo, ContainerRef, InternalClient,
    InternalResponse, MetadataStore, ObjectInfo, ObjectRef,
};
use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;

const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(30);
const AUTH_TOKEN_HEADER: &str = "x-auth-token";

/// Client for the upstream storage proxy.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    client: reqwest::Client,
    base_url: String,
    api_version: String,
    auth_token: Option<String>,
}

impl UpstreamClient {
    /// Create a client for `config.upstream_url`.
    pub fn new(config: &AliasGateConfig) -> AliasGateResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(UPSTREAM_TIMEOUT)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|err| AliasGateError::Config(format!("cannot build upstream client: {err}")))?;
        Ok(Self {
            client,
            base_url: config.upstream_url.trim_end_matches('/').to_owned(),
            api_version: config.api_version.clone(),
            auth_token: config.upstream_auth_token.clone(),
        })
    }

    fn url(&self, encoded_path: &str) -> String {
        format!("{}{encoded_path}", self.base_url)
    }

    async fn head(&self, decoded_path: &str) -> AliasGateResult<Option<http::HeaderMap>> {
        let mut request = self.client.head(self.url(&encode_path(decoded_path)));
        if let Some(token) = &self.auth_token {
            request = request.header(AUTH_TOKEN_HEADER, token);
        }
        let resp = request
            .send()
            .await
            .map_err(|err| AliasGateError::Upstream(err.to_string()))?;

        let status = resp.status();
        if status == http::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(AliasGateError::Upstream(format!(
                "metadata request for {decoded_path} returned {status}"
            )));
        }
        Ok(Some(resp.headers().clone()))
    }
}

#[async_trait]
impl MetadataStore for UpstreamClient {
    async fn get_container_info(&self, container: &ContainerRef) -> AliasGateResult<ContainerInfo> {
        let Some(headers) = self.head(&container.path(&self.api_version)).await? else {
            return Ok(ContainerInfo::default());
        };
        Ok(container_info_from_headers(&headers))
    }

    async fn get_object_info(&self, object: &ObjectRef) -> AliasGateResult<ObjectInfo> {
        let Some(headers) = self.head(&object.path(&self.api_version)).await? else {
            return Ok(ObjectInfo::default());
        };
        Ok(ObjectInfo {
            meta: collect_meta(&headers, "x-object-meta-"),
        })
    }
}

#[async_trait]
impl InternalClient for UpstreamClient {
    async fn send_internal_request(
        &self,
        method: http::Method,
        path: &str,
        mut headers: http::HeaderMap,
    ) -> AliasGateResult<InternalResponse> {
        if let Some(token) = &self.auth_token {
            if let Ok(value) = http::HeaderValue::from_str(token) {
                headers.insert(AUTH_TOKEN_HEADER, value);
            }
        }
        debug!(%method, path, "sending internal request");

        let resp = self
            .client
            .request(method, self.url(&encode_path(path)))
            .headers(headers)
            .send()
            .await
            .map_err(|err| AliasGateError::Upstream(err.to_string()))?;
        let status = resp.status();
        let body = resp
            .bytes()
            .await
            .map_err(|err| AliasGateError::Upstream(err.to_string()))?;
        Ok(InternalResponse::new(status, body))
    }
}

impl Downstream for UpstreamClient {
    fn forward(&self, parts: http::request::Parts, body: Bytes) -> ForwardFuture {
        let client = self.client.clone();
        let path_and_query = parts
            .uri
            .path_and_query()
            .map_or_else(|| parts.uri.path().to_owned(), ToString::to_string);
        let url = self.url(&path_and_query);

        Box::pin(async move {
            let mut headers = parts.headers;
            for name in [
                http::header::CONNECTION,
                http::header::HOST,
                http::header::TRANSFER_ENCODING,
                http::header::CONTENT_LENGTH,
            ] {
                headers.remove(name);
            }

            let resp = client
                .request(parts.method, url)
                .headers(headers)
                .body(body)
                .send()
                .await
                .map_err(|err| AliasGateError::Upstream(err.to_string()))?;

            let status = resp.status();
            let mut resp_headers = resp.headers().clone();
            resp_headers.remove(http::header::CONNECTION);
            resp_headers.remove(http::header::TRANSFER_ENCODING);
            let body = resp
                .bytes()
                .await
                .map_err(|err| AliasGateError::Upstream(err.to_string()))?;

            let mut response = http::Response::new(GatewayBody::new(body));
            *response.status_mut() = status;
            *response.headers_mut() = resp_headers;
            Ok(response)
        })
    }
}

fn container_info_from_headers(headers: &http::HeaderMap) -> ContainerInfo {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_owned()
    };
    ContainerInfo {
        meta: collect_meta(headers, "x-container-meta-"),
        read_acl: header("x-container-read"),
        write_acl: header("x-container-write"),
        object_count: header("x-container-object-count").parse().unwrap_or(0),
    }
}

fn collect_meta(
    headers: &http::HeaderMap,
    prefix: &str,
) -> std::collections::BTreeMap<String, String> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            let key = name.as_str().strip_prefix(prefix)?;
            let value = value.to_str().ok()?;
            Some((key.to_owned(), value.to_owned()))
        })
        .collect()
}
