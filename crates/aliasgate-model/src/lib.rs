//! Data model, collaborator traits, and error types for AliasGate.
//!
//! This crate holds everything the alias and shadow-container logic shares
//! with the outside world:
//!
//! - **Types** ([`types`]): account, container, and object identifiers.
//! - **Paths** ([`path`]): request path decomposition and alias target parsing.
//! - **Info** ([`info`]): payloads returned by the metadata and internal-request
//!   collaborators.
//! - **Collaborators** ([`collab`]): the object-safe traits the core is written
//!   against (`MetadataStore`, `InternalClient`, `IdentityClient`,
//!   `AccountIdentity`).
//! - **Errors** ([`error`]): the [`AliasGateError`] taxonomy.

pub mod collab;
pub mod error;
pub mod info;
pub mod path;
pub mod types;

pub use collab::{
    AccountIdentity, IdentityClient, InternalClient, MetadataStore, RemoteUserIdentity,
};
pub use error::{AliasGateError, AliasGateResult};
pub use info::{ContainerInfo, InternalResponse, ObjectInfo};
pub use path::{RequestPath, StoragePath};
pub use types::{AccountId, ContainerRef, ObjectRef};
