//! Session key resolution seam.

use crate::error::CryptoResult;
use crate::key::SessionKey;
use async_trait::async_trait;
use sealmail_types::{Entity, TypeModel, TypeRef, WireInstance};
use serde_json::{Map, Value};

/// Outcome of looking up the session key of an instance.
///
/// Hard failures are reported through the surrounding `Result`; this type
/// only distinguishes the non-fatal cases.
#[derive(Debug, Clone)]
pub enum SessionKeyLookup {
    /// The key protecting the instance.
    Resolved(SessionKey),
    /// The type has no encrypted values, so no key exists.
    Unencrypted,
    /// No key could be found. The instance can still be decrypted in a
    /// degraded form.
    NotFound(String),
}

impl SessionKeyLookup {
    /// The resolved key, if any.
    pub fn into_key(self) -> Option<SessionKey> {
        match self {
            Self::Resolved(key) => Some(key),
            Self::Unencrypted | Self::NotFound(_) => None,
        }
    }
}

/// Resolves and mints session keys, and migrates payloads across schema
/// versions.
#[async_trait]
pub trait CryptoResolver: Send + Sync {
    /// Migrates a raw, still encrypted payload. Runs before key resolution
    /// because field layouts can move between versions.
    async fn apply_migrations(
        &self,
        type_ref: &TypeRef,
        instance: WireInstance,
    ) -> CryptoResult<WireInstance>;

    /// Looks up the session key protecting `instance`, which is either a
    /// wire payload or the fields of a decrypted entity.
    async fn resolve_session_key(
        &self,
        type_model: &TypeModel,
        instance: &Map<String, Value>,
    ) -> CryptoResult<SessionKeyLookup>;

    /// Migrates a decrypted instance.
    async fn apply_migrations_for_instance(&self, instance: Entity) -> CryptoResult<Entity>;

    /// Mints a fresh session key for a new instance and records it,
    /// encrypted with the owner group key, on the instance.
    ///
    /// Returns `None` for types without encrypted values.
    async fn set_new_owner_enc_session_key(
        &self,
        type_model: &TypeModel,
        instance: &mut Entity,
    ) -> CryptoResult<Option<SessionKey>>;
}
