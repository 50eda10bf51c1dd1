//! Per-type schema migrations.

use crate::error::CryptoResult;
use sealmail_types::{Entity, TypeRef, WireInstance};
use std::collections::HashMap;
use std::sync::Arc;

/// Rewrites a raw wire payload before decryption.
pub type RawMigration = Arc<dyn Fn(WireInstance) -> CryptoResult<WireInstance> + Send + Sync>;

/// Rewrites a decrypted instance.
pub type InstanceMigration = Arc<dyn Fn(Entity) -> CryptoResult<Entity> + Send + Sync>;

/// Migrations keyed by type, applied in registration order.
#[derive(Default, Clone)]
pub struct MigrationRegistry {
    raw: HashMap<TypeRef, Vec<RawMigration>>,
    instance: HashMap<TypeRef, Vec<InstanceMigration>>,
}

impl MigrationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a pre-decryption migration for `type_ref`.
    pub fn add_raw<F>(&mut self, type_ref: TypeRef, migration: F)
    where
        F: Fn(WireInstance) -> CryptoResult<WireInstance> + Send + Sync + 'static,
    {
        self.raw.entry(type_ref).or_default().push(Arc::new(migration));
    }

    /// Adds a post-decryption migration for `type_ref`.
    pub fn add_instance<F>(&mut self, type_ref: TypeRef, migration: F)
    where
        F: Fn(Entity) -> CryptoResult<Entity> + Send + Sync + 'static,
    {
        self.instance
            .entry(type_ref)
            .or_default()
            .push(Arc::new(migration));
    }

    pub fn migrate_raw(
        &self,
        type_ref: &TypeRef,
        instance: WireInstance,
    ) -> CryptoResult<WireInstance> {
        self.raw
            .get(type_ref)
            .into_iter()
            .flatten()
            .try_fold(instance, |instance, migration| migration(instance))
    }

    pub fn migrate_instance(&self, instance: Entity) -> CryptoResult<Entity> {
        let Some(migrations) = self.instance.get(&instance.type_ref) else {
            return Ok(instance);
        };
        migrations
            .iter()
            .try_fold(instance, |instance, migration| migration(instance))
    }
}

impl std::fmt::Debug for MigrationRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MigrationRegistry")
            .field("raw_types", &self.raw.keys().collect::<Vec<_>>())
            .field("instance_types", &self.instance.keys().collect::<Vec<_>>())
            .finish()
    }
}
