use crate::error::EntityRestResult;
use async_trait::async_trait;
use sealmail_types::{Entity, EntityId, EntityUpdate, TypeRef};
use std::collections::HashMap;

/// Operations on server-held entities.
///
/// Implemented by [`EntityRestClient`](crate::EntityRestClient); a caching
/// layer implements it too, wrapping the client and overriding
/// [`entity_events_received`](Self::entity_events_received).
#[async_trait]
pub trait EntityRestInterface: Send + Sync {
    /// Loads and decrypts a single instance.
    async fn load(
        &self,
        type_ref: &TypeRef,
        id: &EntityId,
        query_params: Option<HashMap<String, String>>,
        extra_headers: Option<HashMap<String, String>>,
    ) -> EntityRestResult<Entity>;

    /// Loads up to `count` list elements starting after `start`, in server order.
    async fn load_range(
        &self,
        type_ref: &TypeRef,
        list_id: &str,
        start: &str,
        count: usize,
        reverse: bool,
    ) -> EntityRestResult<Vec<Entity>>;

    /// Loads the given elements in chunks.
    async fn load_multiple(
        &self,
        type_ref: &TypeRef,
        list_id: Option<&str>,
        element_ids: &[String],
    ) -> EntityRestResult<Vec<Entity>>;

    /// Encrypts and creates an instance, returning the generated element id.
    async fn setup(
        &self,
        list_id: Option<&str>,
        instance: &Entity,
        extra_headers: Option<HashMap<String, String>>,
    ) -> EntityRestResult<String>;

    /// Creates many instances of one type, returning ids in input order.
    async fn setup_multiple(
        &self,
        list_id: Option<&str>,
        instances: &[Entity],
    ) -> EntityRestResult<Vec<String>>;

    /// Re-encrypts and writes an existing instance.
    async fn update(&self, instance: &Entity) -> EntityRestResult<()>;

    /// Deletes an existing instance.
    async fn erase(&self, instance: &Entity) -> EntityRestResult<()>;

    /// Called with server-pushed updates. Without a cache there is nothing
    /// to reconcile and the batch is returned unchanged.
    async fn entity_events_received(&self, batch: Vec<EntityUpdate>) -> Vec<EntityUpdate> {
        batch
    }
}
