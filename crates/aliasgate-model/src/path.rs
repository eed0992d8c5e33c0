//! Request path decomposition and alias target parsing.
//!
//! Request paths follow the storage layout `/<version>/<account>/<container>/<object>`
//! where the object name keeps any further `/`. [`RequestPath::parse`] accepts
//! one to four segments; anything else is malformed and the caller passes the
//! request through untouched.

use percent_encoding::{AsciiSet, CONTROLS, percent_decode_str, utf8_percent_encode};

use crate::error::AliasGateError;
use crate::types::{AccountId, ContainerRef, ObjectRef};

/// Characters that must be escaped when a decoded path is put back into a URI.
/// `/` is kept so the path structure survives.
const PATH_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Percent-encode a decoded storage path for use in a request URI.
///
/// ```
/// use aliasgate_model::path::encode_path;
///
/// assert_eq!(encode_path("/v1/a/c/my file"), "/v1/a/c/my%20file");
/// ```
#[must_use]
pub fn encode_path(path: &str) -> String {
    utf8_percent_encode(path, PATH_ENCODE_SET).to_string()
}

/// A request path split into its storage segments. Segments are decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestPath {
    /// API version segment (e.g. `v1`). Never empty.
    pub version: String,
    /// Account segment.
    pub account: Option<String>,
    /// Container segment.
    pub container: Option<String>,
    /// Object segment, including any nested `/`.
    pub object: Option<String>,
}

impl RequestPath {
    /// Split a raw (percent-encoded) URI path.
    ///
    /// Empty trailing segments count as absent (`/v1/a/` addresses the
    /// account). An empty segment followed by a non-empty one is malformed.
    pub fn parse(path: &str) -> Result<Self, AliasGateError> {
        let malformed = || AliasGateError::MalformedPath(path.to_owned());

        let rest = path.strip_prefix('/').ok_or_else(malformed)?;
        let mut segments = Vec::with_capacity(4);
        for raw in rest.splitn(4, '/') {
            let decoded = percent_decode_str(raw)
                .decode_utf8()
                .map_err(|_| malformed())?;
            segments.push((!decoded.is_empty()).then(|| decoded.into_owned()));
        }

        let mut seen_gap = false;
        for segment in &segments {
            match segment {
                None => seen_gap = true,
                Some(_) if seen_gap => return Err(malformed()),
                Some(_) => {}
            }
        }

        let mut segments = segments.into_iter();
        let version = segments.next().flatten().ok_or_else(malformed)?;
        Ok(Self {
            version,
            account: segments.next().flatten(),
            container: segments.next().flatten(),
            object: segments.next().flatten(),
        })
    }

    /// The addressed container, if the path reaches container depth.
    #[must_use]
    pub fn container_ref(&self) -> Option<ContainerRef> {
        match (&self.account, &self.container) {
            (Some(account), Some(container)) => {
                Some(ContainerRef::new(account.as_str(), container.as_str()))
            }
            _ => None,
        }
    }

    /// The addressed object, if the path reaches object depth.
    #[must_use]
    pub fn object_ref(&self) -> Option<ObjectRef> {
        let object = self.object.as_ref()?;
        Some(self.container_ref()?.object(object.as_str()))
    }

    /// Whether the path addresses a container and stops there.
    #[must_use]
    pub fn is_container_only(&self) -> bool {
        self.container.is_some() && self.object.is_none()
    }

    /// The addressed container or object, if the path reaches container depth.
    #[must_use]
    pub fn storage_path(&self) -> Option<StoragePath> {
        Some(StoragePath {
            version: self.version.clone(),
            container: self.container_ref()?,
            object: self.object.clone(),
        })
    }

    /// Rebuild the decoded path.
    #[must_use]
    pub fn to_path(&self) -> String {
        let mut path = format!("/{}", self.version);
        for segment in [&self.account, &self.container, &self.object]
            .into_iter()
            .flatten()
        {
            path.push('/');
            path.push_str(segment);
        }
        path
    }
}

/// A parsed alias target `/<version>/<account>/<container>[/<object>]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoragePath {
    /// API version of the target.
    pub version: String,
    /// Target container.
    pub container: ContainerRef,
    /// Target object, for object aliases.
    pub object: Option<String>,
}

impl StoragePath {
    /// Parse an alias value that must name a container.
    pub fn container_target(value: &str) -> Result<Self, AliasGateError> {
        let target = Self::parse(value)?;
        if target.object.is_some() {
            return Err(AliasGateError::InvalidAliasTarget(value.to_owned()));
        }
        Ok(target)
    }

    /// Parse an alias value that must name an object.
    pub fn object_target(value: &str) -> Result<Self, AliasGateError> {
        let target = Self::parse(value)?;
        if target.object.is_none() {
            return Err(AliasGateError::InvalidAliasTarget(value.to_owned()));
        }
        Ok(target)
    }

    fn parse(value: &str) -> Result<Self, AliasGateError> {
        let invalid = || AliasGateError::InvalidAliasTarget(value.to_owned());

        let rest = value.strip_prefix('/').ok_or_else(invalid)?;
        let mut parts = rest.splitn(4, '/');
        let mut next = || parts.next().filter(|s| !s.is_empty()).map(str::to_owned);

        let version = next().ok_or_else(invalid)?;
        let account = next().ok_or_else(invalid)?;
        let container = next().ok_or_else(invalid)?;
        // A trailing slash on a container target leaves an empty fourth segment.
        let object = next();

        Ok(Self {
            version,
            container: ContainerRef::new(AccountId::new(account), container),
            object,
        })
    }

    /// The target object, for object aliases.
    #[must_use]
    pub fn object_ref(&self) -> Option<ObjectRef> {
        self.object
            .as_ref()
            .map(|name| self.container.object(name.as_str()))
    }

    /// Decoded path of the target, e.g. `/v1/a2/c2/o`.
    #[must_use]
    pub fn path(&self) -> String {
        match self.object_ref() {
            Some(object) => object.path(&self.version),
            None => self.container.path(&self.version),
        }
    }
}
