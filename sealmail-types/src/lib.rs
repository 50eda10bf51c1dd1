//! Core type definitions for Sealmail.
//!
//! This crate defines the types shared by the crypto and
//! REST layers:
//! - [`TypeRef`]: application namespace + type name
//! - [`TypeModel`]: schema descriptor, resolved through [`TypeModelRegistry`]
//! - [`EntityId`] and [`Entity`]: identity and decrypted instances
//! - [`EntityUpdate`]: server-pushed change notifications
//!
//! Nothing here performs I/O or cryptography.

mod entity;
mod event;
mod ids;
mod model;
mod registry;
mod type_ref;

pub use entity::{Entity, WireInstance, ERRORS_FIELD, ID_FIELD};
pub use event::{EntityUpdate, OperationType};
pub use ids::EntityId;
pub use model::{
    AssociationModel, AssociationType, Cardinality, Shape, TypeKind, TypeModel, ValueModel,
    ValueType,
};
pub use registry::{AppModel, TypeModelRegistry};
pub use type_ref::TypeRef;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, TypeError>;

/// Errors that can occur while resolving type models.
#[derive(Debug, thiserror::Error)]
pub enum TypeError {
    #[error("unknown application: {0}")]
    UnknownApp(String),

    #[error("unknown type: {0}")]
    UnknownType(TypeRef),

    #[error("malformed type model for {app}: {source}")]
    MalformedModel {
        app: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("type {type_ref} with kind {kind:?} cannot be addressed over REST")]
    NotAddressable { type_ref: TypeRef, kind: TypeKind },
}
