//! Owner-group based session key resolution.

use crate::cipher;
use crate::error::{CryptoError, CryptoResult};
use crate::key::{generate_session_key, GroupKey, SessionKey};
use crate::migration::MigrationRegistry;
use crate::resolver::{CryptoResolver, SessionKeyLookup};
use async_trait::async_trait;
use sealmail_types::{Entity, TypeModel, TypeRef, WireInstance};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use tracing::debug;

/// Field naming the group that owns an instance.
pub const OWNER_GROUP_FIELD: &str = "_ownerGroup";

/// Field carrying the session key wrapped with the owner group key.
pub const OWNER_ENC_SESSION_KEY_FIELD: &str = "_ownerEncSessionKey";

/// Resolves session keys by unwrapping `_ownerEncSessionKey` with the key
/// of the instance's `_ownerGroup`.
///
/// Group keys are held in memory and can be added once the user's
/// memberships are known.
#[derive(Debug, Default)]
pub struct OwnerKeyResolver {
    group_keys: RwLock<HashMap<String, GroupKey>>,
    migrations: MigrationRegistry,
}

impl OwnerKeyResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_migrations(migrations: MigrationRegistry) -> Self {
        Self {
            group_keys: RwLock::default(),
            migrations,
        }
    }

    /// Makes the key of `group_id` available for wrapping and unwrapping.
    pub fn add_group_key(&self, group_id: impl Into<String>, key: GroupKey) {
        self.group_keys
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(group_id.into(), key);
    }

    fn group_key(&self, group_id: &str) -> Option<GroupKey> {
        self.group_keys
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(group_id)
            .cloned()
    }
}

#[async_trait]
impl CryptoResolver for OwnerKeyResolver {
    async fn apply_migrations(
        &self,
        type_ref: &TypeRef,
        instance: WireInstance,
    ) -> CryptoResult<WireInstance> {
        self.migrations.migrate_raw(type_ref, instance)
    }

    async fn resolve_session_key(
        &self,
        type_model: &TypeModel,
        instance: &Map<String, Value>,
    ) -> CryptoResult<SessionKeyLookup> {
        if !type_model.encrypted {
            return Ok(SessionKeyLookup::Unencrypted);
        }

        let Some(group_id) = instance.get(OWNER_GROUP_FIELD).and_then(Value::as_str) else {
            return Ok(SessionKeyLookup::NotFound("instance has no owner group".into()));
        };
        let Some(wrapped) = instance
            .get(OWNER_ENC_SESSION_KEY_FIELD)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
        else {
            return Ok(SessionKeyLookup::NotFound(
                "instance has no owner encrypted session key".into(),
            ));
        };
        let Some(group_key) = self.group_key(group_id) else {
            return Ok(SessionKeyLookup::NotFound(format!(
                "no key for group {group_id}"
            )));
        };

        cipher::unwrap_key(&group_key, wrapped).map(SessionKeyLookup::Resolved)
    }

    async fn apply_migrations_for_instance(&self, instance: Entity) -> CryptoResult<Entity> {
        self.migrations.migrate_instance(instance)
    }

    async fn set_new_owner_enc_session_key(
        &self,
        type_model: &TypeModel,
        instance: &mut Entity,
    ) -> CryptoResult<Option<SessionKey>> {
        if !type_model.encrypted {
            return Ok(None);
        }

        let group_id = instance
            .owner_group()
            .ok_or_else(|| CryptoError::MissingOwnerGroup(instance.type_ref.to_string()))?
            .to_string();
        let group_key = self
            .group_key(&group_id)
            .ok_or_else(|| CryptoError::MissingOwnerGroup(format!("no key for group {group_id}")))?;

        let session_key = generate_session_key();
        let wrapped = cipher::wrap_key(&group_key, &session_key)?;
        instance.set(OWNER_ENC_SESSION_KEY_FIELD, wrapped);
        debug!(type_ref = %instance.type_ref, group = %group_id, "minted owner session key");

        Ok(Some(session_key))
    }
}
