//! The entity REST client.
//!
//! Loads go transport → raw migrations → session key → decrypt → instance
//! migrations. Writes go session key → encrypt → transport. Bulk calls run
//! their per-instance crypto steps with bounded concurrency.

use crate::auth::AuthHeadersProvider;
use crate::config::EntityRestConfig;
use crate::error::{EntityRestError, EntityRestResult, RestError, SetupMultipleError};
use crate::interface::EntityRestInterface;
use crate::lazy::LazyCrypto;
use crate::transport::{HttpMethod, MediaType, RestRequest, Transport};
use async_trait::async_trait;
use futures::future::{join_all, try_join_all};
use futures::stream::{self, StreamExt, TryStreamExt};
use sealmail_crypto::{CryptoResolver, InstanceMapper, SessionKey, SessionKeyLookup};
use sealmail_types::{
    Entity, EntityId, Shape, TypeModel, TypeModelRegistry, TypeRef, WireInstance,
};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

/// Header carrying the model version the request was built against.
pub const MODEL_VERSION_HEADER: &str = "v";

/// Path, query and headers shared by every request of one operation.
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    pub path: String,
    pub query_params: HashMap<String, String>,
    pub headers: HashMap<String, String>,
    pub type_model: Arc<TypeModel>,
}

impl PreparedRequest {
    /// Builds a transport request, adding `extra_query` to the prepared parameters.
    pub fn request(
        &self,
        method: HttpMethod,
        extra_query: &[(&str, String)],
        body: Option<String>,
    ) -> RestRequest {
        let mut query_params = self.query_params.clone();
        query_params.extend(
            extra_query
                .iter()
                .map(|(name, value)| (name.to_string(), value.clone())),
        );
        RestRequest {
            path: self.path.clone(),
            method,
            query_params,
            headers: self.headers.clone(),
            body,
            media_type: MediaType::Json,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GeneratedIdEnvelope {
    #[serde(rename = "generatedId")]
    generated_id: String,
}

/// Result of creating one chunk of a bulk create.
enum ChunkOutcome {
    Created(Vec<String>),
    Failed {
        errors: Vec<EntityRestError>,
        failed: Vec<Entity>,
    },
}

/// Fetches, decrypts, encrypts and uploads entities.
///
/// Holds no mutable state besides the lazily built crypto resolver and is
/// safe to share between tasks.
pub struct EntityRestClient {
    auth: Arc<dyn AuthHeadersProvider>,
    transport: Arc<dyn Transport>,
    registry: Arc<TypeModelRegistry>,
    mapper: Arc<dyn InstanceMapper>,
    crypto: LazyCrypto,
    config: EntityRestConfig,
}

impl EntityRestClient {
    /// Creates a client. `crypto` is called once, on the first operation
    /// that needs a resolver.
    pub fn new<F>(
        auth: Arc<dyn AuthHeadersProvider>,
        transport: Arc<dyn Transport>,
        registry: Arc<TypeModelRegistry>,
        mapper: Arc<dyn InstanceMapper>,
        crypto: F,
    ) -> Self
    where
        F: Fn() -> Arc<dyn CryptoResolver> + Send + Sync + 'static,
    {
        Self {
            auth,
            transport,
            registry,
            mapper,
            crypto: LazyCrypto::new(crypto),
            config: EntityRestConfig::default(),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: EntityRestConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &EntityRestConfig {
        &self.config
    }

    /// Whether the crypto resolver has been built yet.
    pub fn crypto_initialized(&self) -> bool {
        self.crypto.is_initialized()
    }

    /// Resolves the model and builds path, query and headers for a request.
    ///
    /// Fails before touching the network if the type is unknown or not
    /// addressable, or if no authentication headers are available.
    pub fn prepare_request(
        &self,
        type_ref: &TypeRef,
        list_id: Option<&str>,
        element_id: Option<&str>,
        query_params: Option<HashMap<String, String>>,
        extra_headers: Option<HashMap<String, String>>,
    ) -> EntityRestResult<PreparedRequest> {
        let type_model = self.registry.resolve(type_ref)?;
        self.prepare_for_model(type_model, list_id, element_id, query_params, extra_headers)
    }

    /// Same as [`prepare_request`](Self::prepare_request) for an already resolved model.
    fn prepare_for_model(
        &self,
        type_model: Arc<TypeModel>,
        list_id: Option<&str>,
        element_id: Option<&str>,
        query_params: Option<HashMap<String, String>>,
        extra_headers: Option<HashMap<String, String>>,
    ) -> EntityRestResult<PreparedRequest> {
        type_model.shape()?;

        let mut path = type_model.type_ref().resource_path();
        for segment in [list_id, element_id].into_iter().flatten() {
            path.push('/');
            path.push_str(segment);
        }

        let mut headers = self.auth.create_auth_headers();
        headers.extend(extra_headers.unwrap_or_default());
        if headers.is_empty() {
            return Err(RestError::NotAuthenticated("auth headers are empty".into()).into());
        }
        headers.insert(MODEL_VERSION_HEADER.to_string(), type_model.version.clone());

        Ok(PreparedRequest {
            path,
            query_params: query_params.unwrap_or_default(),
            headers,
            type_model,
        })
    }

    fn split_id<'a>(
        type_model: &TypeModel,
        id: &'a EntityId,
    ) -> EntityRestResult<(Option<&'a str>, &'a str)> {
        let shape = type_model.shape()?;
        shape.split_id(id).ok_or_else(|| {
            EntityRestError::Usage(format!(
                "id {id} does not fit {shape:?} type {}",
                type_model.type_ref()
            ))
        })
    }

    fn instance_id(instance: &Entity) -> EntityRestResult<&EntityId> {
        instance.id.as_ref().ok_or_else(|| {
            EntityRestError::Usage(format!("id must be defined on {} instance", instance.type_ref))
        })
    }

    fn check_list_id(type_model: &TypeModel, list_id: Option<&str>) -> EntityRestResult<()> {
        match (type_model.shape()?.requires_list_id(), list_id) {
            (true, None) => Err(EntityRestError::Usage(format!(
                "list id must be defined for list element type {}",
                type_model.type_ref()
            ))),
            (false, Some(list_id)) => Err(EntityRestError::Usage(format!(
                "list id {list_id} must not be defined for element type {}",
                type_model.type_ref()
            ))),
            (true, Some(_)) | (false, None) => Ok(()),
        }
    }

    /// Looks up a session key, turning "not found" into an absent key.
    async fn resolve_session_key(
        crypto: &dyn CryptoResolver,
        type_model: &TypeModel,
        instance: &Map<String, Value>,
    ) -> EntityRestResult<Option<SessionKey>> {
        match crypto.resolve_session_key(type_model, instance).await? {
            SessionKeyLookup::Resolved(key) => Ok(Some(key)),
            SessionKeyLookup::Unencrypted => Ok(None),
            SessionKeyLookup::NotFound(reason) => {
                warn!(
                    type_ref = %type_model.type_ref(),
                    %reason,
                    "could not resolve session key, returning degraded instance"
                );
                Ok(None)
            }
        }
    }

    async fn decrypt_map_and_migrate(
        &self,
        crypto: &dyn CryptoResolver,
        type_model: &TypeModel,
        raw: WireInstance,
    ) -> EntityRestResult<Entity> {
        let key = Self::resolve_session_key(crypto, type_model, &raw).await?;
        let instance = self
            .mapper
            .decrypt_and_map_to_instance(type_model, raw, key.as_ref())
            .await?;
        Ok(crypto.apply_migrations_for_instance(instance).await?)
    }

    /// Decrypts a batch, preserving server order.
    async fn handle_load_multiple_result(
        &self,
        type_ref: &TypeRef,
        type_model: &TypeModel,
        raws: Vec<WireInstance>,
    ) -> EntityRestResult<Vec<Entity>> {
        let crypto = self.crypto.get();
        let concurrency = self.config.concurrency();

        let raws = if self.config.legacy_migration_type.as_ref() == Some(type_ref) {
            stream::iter(raws)
                .map(|raw| crypto.apply_migrations(type_ref, raw))
                .buffered(concurrency)
                .try_collect::<Vec<_>>()
                .await?
        } else {
            raws
        };

        stream::iter(raws)
            .map(|raw| self.decrypt_map_and_migrate(&*crypto, type_model, raw))
            .buffered(concurrency)
            .try_collect()
            .await
    }

    /// Mints a session key for a copy of `instance` and encrypts it.
    async fn encrypt_new(
        &self,
        crypto: &dyn CryptoResolver,
        type_model: &TypeModel,
        instance: &Entity,
    ) -> EntityRestResult<WireInstance> {
        let mut instance = instance.clone();
        let key = crypto
            .set_new_owner_enc_session_key(type_model, &mut instance)
            .await?;
        Ok(self
            .mapper
            .encrypt_and_map_to_literal(type_model, &instance, key.as_ref())
            .await?)
    }

    async fn post_chunk(
        &self,
        prepared: &PreparedRequest,
        crypto: &dyn CryptoResolver,
        permits: &Semaphore,
        chunk: &[Entity],
    ) -> EntityRestResult<Vec<String>> {
        let type_model = &prepared.type_model;
        let literals = try_join_all(chunk.iter().map(|instance| async move {
            let _permit = permits.acquire().await.ok();
            self.encrypt_new(crypto, type_model, instance).await
        }))
        .await?;

        debug!(path = %prepared.path, count = chunk.len(), "creating chunk");
        // `count` tells the server this is a multi-create.
        let request = prepared.request(
            HttpMethod::Post,
            &[("count", chunk.len().to_string())],
            Some(serde_json::to_string(&literals)?),
        );
        let response = self.transport.request(request).await?;
        let envelopes: Vec<GeneratedIdEnvelope> = serde_json::from_str(&response)?;
        if envelopes.len() != chunk.len() {
            return Err(EntityRestError::InvalidResponse(format!(
                "{} generated ids for {} instances posted to {}",
                envelopes.len(),
                chunk.len(),
                prepared.path
            )));
        }
        Ok(envelopes.into_iter().map(|e| e.generated_id).collect())
    }

    async fn setup_chunk(
        &self,
        prepared: &PreparedRequest,
        crypto: &dyn CryptoResolver,
        permits: &Semaphore,
        list_id: Option<&str>,
        chunk: &[Entity],
    ) -> ChunkOutcome {
        let error = match self.post_chunk(prepared, crypto, permits, chunk).await {
            Ok(ids) => return ChunkOutcome::Created(ids),
            Err(error) => error,
        };

        if !error.is_payload_too_large() {
            return ChunkOutcome::Failed {
                errors: vec![error],
                failed: chunk.to_vec(),
            };
        }

        info!(
            path = %prepared.path,
            count = chunk.len(),
            "chunk too large, creating instances one by one"
        );
        let results = join_all(chunk.iter().map(|instance| async move {
            let _permit = permits.acquire().await.ok();
            self.setup(list_id, instance, None)
                .await
                .map_err(|e| (e, instance.clone()))
        }))
        .await;

        let (ids, errors, failed) = results.into_iter().fold(
            (Vec::new(), Vec::new(), Vec::new()),
            |(mut ids, mut errors, mut failed), result| {
                match result {
                    Ok(id) => ids.push(id),
                    Err((error, instance)) => {
                        errors.push(error);
                        failed.push(instance);
                    }
                }
                (ids, errors, failed)
            },
        );
        if errors.is_empty() {
            ChunkOutcome::Created(ids)
        } else {
            ChunkOutcome::Failed { errors, failed }
        }
    }
}

#[async_trait]
impl EntityRestInterface for EntityRestClient {
    async fn load(
        &self,
        type_ref: &TypeRef,
        id: &EntityId,
        query_params: Option<HashMap<String, String>>,
        extra_headers: Option<HashMap<String, String>>,
    ) -> EntityRestResult<Entity> {
        let type_model = self.registry.resolve(type_ref)?;
        let (list_id, element_id) = Self::split_id(&type_model, id)?;
        let prepared = self.prepare_for_model(
            type_model,
            list_id,
            Some(element_id),
            query_params,
            extra_headers,
        )?;

        debug!(path = %prepared.path, "loading instance");
        let response = self
            .transport
            .request(prepared.request(HttpMethod::Get, &[], None))
            .await?;
        let raw: WireInstance = serde_json::from_str(&response)?;

        let crypto = self.crypto.get();
        let migrated = crypto.apply_migrations(type_ref, raw).await?;
        self.decrypt_map_and_migrate(&*crypto, &prepared.type_model, migrated)
            .await
    }

    async fn load_range(
        &self,
        type_ref: &TypeRef,
        list_id: &str,
        start: &str,
        count: usize,
        reverse: bool,
    ) -> EntityRestResult<Vec<Entity>> {
        let type_model = self.registry.resolve(type_ref)?;
        match type_model.shape()? {
            Shape::ListElement => {}
            Shape::Element => {
                return Err(EntityRestError::Usage(format!(
                    "only list element types are permitted, {type_ref} is an element type"
                )));
            }
        }

        let query = HashMap::from([
            ("start".to_string(), start.to_string()),
            ("count".to_string(), count.to_string()),
            ("reverse".to_string(), reverse.to_string()),
        ]);
        let prepared =
            self.prepare_for_model(type_model, Some(list_id), None, Some(query), None)?;

        debug!(path = %prepared.path, start, count, reverse, "loading range");
        let response = self
            .transport
            .request(prepared.request(HttpMethod::Get, &[], None))
            .await?;
        let raws: Vec<WireInstance> = serde_json::from_str(&response)?;
        self.handle_load_multiple_result(type_ref, &prepared.type_model, raws)
            .await
    }

    async fn load_multiple(
        &self,
        type_ref: &TypeRef,
        list_id: Option<&str>,
        element_ids: &[String],
    ) -> EntityRestResult<Vec<Entity>> {
        let prepared = self.prepare_request(type_ref, list_id, None, None, None)?;
        let chunk_size = self.config.load_chunk_size();

        debug!(
            path = %prepared.path,
            ids = element_ids.len(),
            chunk_size,
            "loading multiple"
        );
        let chunks = try_join_all(element_ids.chunks(chunk_size).map(|ids| {
            let request = prepared.request(HttpMethod::Get, &[("ids", ids.join(","))], None);
            async move {
                let response = self.transport.request(request).await?;
                Ok::<_, EntityRestError>(serde_json::from_str::<Vec<WireInstance>>(&response)?)
            }
        }))
        .await?;

        let raws = chunks.into_iter().flatten().collect();
        self.handle_load_multiple_result(type_ref, &prepared.type_model, raws)
            .await
    }

    async fn setup(
        &self,
        list_id: Option<&str>,
        instance: &Entity,
        extra_headers: Option<HashMap<String, String>>,
    ) -> EntityRestResult<String> {
        let type_model = self.registry.resolve(&instance.type_ref)?;
        Self::check_list_id(&type_model, list_id)?;
        let prepared = self.prepare_for_model(type_model, list_id, None, None, extra_headers)?;

        let crypto = self.crypto.get();
        let literal = self
            .encrypt_new(&*crypto, &prepared.type_model, instance)
            .await?;

        debug!(path = %prepared.path, "creating instance");
        let response = self
            .transport
            .request(prepared.request(
                HttpMethod::Post,
                &[],
                Some(serde_json::to_string(&literal)?),
            ))
            .await?;
        let envelope: GeneratedIdEnvelope = serde_json::from_str(&response)?;
        Ok(envelope.generated_id)
    }

    async fn setup_multiple(
        &self,
        list_id: Option<&str>,
        instances: &[Entity],
    ) -> EntityRestResult<Vec<String>> {
        let Some(first) = instances.first() else {
            return Ok(Vec::new());
        };
        let type_ref = &first.type_ref;
        let type_model = self.registry.resolve(type_ref)?;
        Self::check_list_id(&type_model, list_id)?;
        let prepared = self.prepare_for_model(type_model, list_id, None, None, None)?;

        let crypto = self.crypto.get();
        let permits = Semaphore::new(self.config.concurrency());
        let outcomes = join_all(
            instances
                .chunks(self.config.post_chunk_size())
                .map(|chunk| self.setup_chunk(&prepared, &*crypto, &permits, list_id, chunk)),
        )
        .await;

        let (ids, errors, failed_instances) = outcomes.into_iter().fold(
            (Vec::with_capacity(instances.len()), Vec::new(), Vec::new()),
            |(mut ids, mut errors, mut failed_instances), outcome| {
                match outcome {
                    ChunkOutcome::Created(created) => ids.extend(created),
                    ChunkOutcome::Failed {
                        errors: chunk_errors,
                        failed,
                    } => {
                        errors.extend(chunk_errors);
                        failed_instances.extend(failed);
                    }
                }
                (ids, errors, failed_instances)
            },
        );

        if errors.is_empty() {
            return Ok(ids);
        }
        warn!(
            type_ref = %type_ref,
            errors = errors.len(),
            failed = failed_instances.len(),
            "setup multiple failed"
        );
        Err(SetupMultipleError {
            errors,
            failed_instances,
        }
        .into())
    }

    async fn update(&self, instance: &Entity) -> EntityRestResult<()> {
        let id = Self::instance_id(instance)?;
        let type_model = self.registry.resolve(&instance.type_ref)?;
        let (list_id, element_id) = Self::split_id(&type_model, id)?;
        let prepared =
            self.prepare_for_model(type_model, list_id, Some(element_id), None, None)?;

        let crypto = self.crypto.get();
        let key =
            Self::resolve_session_key(&*crypto, &prepared.type_model, &instance.fields).await?;
        let literal = self
            .mapper
            .encrypt_and_map_to_literal(&prepared.type_model, instance, key.as_ref())
            .await?;

        debug!(path = %prepared.path, "updating instance");
        self.transport
            .request(prepared.request(
                HttpMethod::Put,
                &[],
                Some(serde_json::to_string(&literal)?),
            ))
            .await?;
        Ok(())
    }

    async fn erase(&self, instance: &Entity) -> EntityRestResult<()> {
        let id = Self::instance_id(instance)?;
        let type_model = self.registry.resolve(&instance.type_ref)?;
        let (list_id, element_id) = Self::split_id(&type_model, id)?;
        let prepared =
            self.prepare_for_model(type_model, list_id, Some(element_id), None, None)?;

        debug!(path = %prepared.path, "erasing instance");
        self.transport
            .request(prepared.request(HttpMethod::Delete, &[], None))
            .await?;
        Ok(())
    }
}
