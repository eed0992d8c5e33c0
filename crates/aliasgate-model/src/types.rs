//! Account, container, and object identifiers.

use std::fmt;

/// Opaque storage account identifier, possibly carrying a reseller prefix
/// (e.g. `AUTH_test`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AccountId(String);

impl AccountId {
    /// Create an account ID from a string. No validation is performed.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Extract the account from an ACL grant entry of the form `account[:user]`.
    ///
    /// ```
    /// use aliasgate_model::AccountId;
    ///
    /// assert_eq!(AccountId::from_acl_entry("a1:u1").as_str(), "a1");
    /// assert_eq!(AccountId::from_acl_entry("a2").as_str(), "a2");
    /// ```
    #[must_use]
    pub fn from_acl_entry(entry: &str) -> Self {
        let account = entry.split(':').next().unwrap_or_default();
        Self(account.to_owned())
    }

    /// Get the account ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the identifier is the empty string.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AccountId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// A container within an account.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContainerRef {
    /// Owning account.
    pub account: AccountId,
    /// Container name, unique within the account.
    pub container: String,
}

impl ContainerRef {
    /// Create a container reference.
    #[must_use]
    pub fn new(account: impl Into<AccountId>, container: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            container: container.into(),
        }
    }

    /// Storage path of the container under the given API version, e.g. `/v1/a/c`.
    #[must_use]
    pub fn path(&self, version: &str) -> String {
        format!("/{version}/{}/{}", self.account, self.container)
    }

    /// Reference an object inside this container.
    #[must_use]
    pub fn object(&self, name: impl Into<String>) -> ObjectRef {
        ObjectRef {
            container: self.clone(),
            object: name.into(),
        }
    }
}

impl fmt::Display for ContainerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.account, self.container)
    }
}

/// An object within a container.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectRef {
    /// Container holding the object.
    pub container: ContainerRef,
    /// Object name; may contain `/`.
    pub object: String,
}

impl ObjectRef {
    /// Storage path of the object under the given API version, e.g. `/v1/a/c/o`.
    #[must_use]
    pub fn path(&self, version: &str) -> String {
        format!("{}/{}", self.container.path(version), self.object)
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.container, self.object)
    }
}
