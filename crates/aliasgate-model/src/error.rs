//! Error types for AliasGate.
//!
//! Only the client errors ([`AliasGateError::is_client_error`]) ever reach the
//! end user. Resolution and propagation failures are absorbed by the core and
//! merely logged.

/// Errors raised while resolving aliases or maintaining shadow containers.
#[derive(Debug, thiserror::Error)]
pub enum AliasGateError {
    /// The request path does not decompose into storage segments.
    #[error("malformed request path: {0}")]
    MalformedPath(String),

    /// An alias or storage-path value is not a valid target path.
    #[error("invalid alias target: {0}")]
    InvalidAliasTarget(String),

    /// An alias was set on a container that still holds objects.
    #[error("container {container} holds {object_count} object(s) and cannot be aliased")]
    ContainerNotEmpty {
        /// The container being aliased.
        container: String,
        /// Its current object count.
        object_count: u64,
    },

    /// The alias target is itself an alias.
    #[error("alias target {0} is itself an alias")]
    AliasLoop(String),

    /// An account could not be resolved to a storage endpoint.
    #[error("cannot resolve storage endpoint for account {0}")]
    Unresolved(String),

    /// A shadow container request failed.
    #[error("shadow container propagation failed: {0}")]
    Propagation(String),

    /// The identity service failed or is not configured.
    #[error("identity service error: {0}")]
    Identity(String),

    /// The upstream storage cluster returned an error or could not be reached.
    #[error("upstream error: {0}")]
    Upstream(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal error with context.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AliasGateError {
    /// Whether the error is attributable to the caller and rejects the request.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidAliasTarget(_) | Self::ContainerNotEmpty { .. } | Self::AliasLoop(_)
        )
    }

    /// HTTP status reported for this error.
    #[must_use]
    pub fn status_code(&self) -> http::StatusCode {
        if self.is_client_error() {
            http::StatusCode::BAD_REQUEST
        } else if matches!(self, Self::Upstream(_)) {
            http::StatusCode::BAD_GATEWAY
        } else {
            http::StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// Convenience result type for AliasGate operations.
pub type AliasGateResult<T> = Result<T, AliasGateError>;
