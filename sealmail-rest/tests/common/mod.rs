#![allow(dead_code)]

use async_trait::async_trait;
use sealmail_crypto::cipher::{seal_string, wrap_key};
use sealmail_crypto::{
    generate_session_key, CryptoResolver, CryptoResult, FieldCipherMapper, GroupKey,
    OwnerKeyResolver, SessionKey, SessionKeyLookup,
};
use sealmail_rest::{
    EntityRestClient, HttpMethod, RestError, RestRequest, RestResult, StaticAuthHeaders,
    Transport,
};
use sealmail_types::{Entity, TypeModel, TypeModelRegistry, TypeRef, WireInstance};
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const GROUP: &str = "group-1";
pub const MIN_ID: &str = "------------";
pub const MAX_ID: &str = "zzzzzzzzzzzz";

pub const TUTANOTA_MODEL: &str = r#"{
    "version": "62",
    "types": {
        "Contact": {
            "id": 64,
            "type": "LIST_ELEMENT_TYPE",
            "encrypted": true,
            "values": {
                "firstName": { "id": 65, "type": "String", "cardinality": "One", "encrypted": true },
                "lastName": { "id": 66, "type": "String", "cardinality": "One", "encrypted": true },
                "oldBirthday": { "id": 67, "type": "Date", "cardinality": "ZeroOrOne" }
            }
        },
        "MailboxProperties": {
            "id": 1195,
            "type": "ELEMENT_TYPE",
            "encrypted": true,
            "values": {
                "reportMovedMails": { "id": 1199, "type": "Number", "cardinality": "One", "encrypted": true }
            }
        },
        "EncryptedMailAddress": {
            "id": 612,
            "type": "AGGREGATED_TYPE",
            "encrypted": true
        }
    }
}"#;

pub const SYS_MODEL: &str = r#"{
    "version": "91",
    "types": {
        "PushIdentifier": {
            "id": 625,
            "type": "LIST_ELEMENT_TYPE",
            "encrypted": true,
            "values": {
                "displayName": { "id": 1497, "type": "String", "cardinality": "One", "encrypted": true },
                "identifier": { "id": 634, "type": "String", "cardinality": "One" }
            }
        }
    }
}"#;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn registry() -> Arc<TypeModelRegistry> {
    let mut registry = TypeModelRegistry::new();
    registry.register_json("tutanota", TUTANOTA_MODEL);
    registry.register_json("sys", SYS_MODEL);
    Arc::new(registry)
}

pub fn contact_ref() -> TypeRef {
    TypeRef::new("tutanota", "Contact")
}

pub fn properties_ref() -> TypeRef {
    TypeRef::new("tutanota", "MailboxProperties")
}

pub fn push_identifier_ref() -> TypeRef {
    TypeRef::new("sys", "PushIdentifier")
}

pub fn contact_model() -> Arc<TypeModel> {
    registry().resolve(&contact_ref()).unwrap()
}

/// A new, unsaved contact owned by [`GROUP`].
pub fn new_contact(first_name: &str) -> Entity {
    Entity::new(contact_ref())
        .with_field("_ownerGroup", GROUP)
        .with_field("firstName", first_name)
        .with_field("lastName", "Lovelace")
        .with_field("oldBirthday", 0)
}

pub fn new_properties() -> Entity {
    Entity::new(properties_ref())
        .with_field("_ownerGroup", GROUP)
        .with_field("reportMovedMails", 1)
}

pub fn as_wire(value: Value) -> WireInstance {
    match value {
        Value::Object(map) => map,
        other => panic!("expected JSON object, got {other}"),
    }
}

/// Keys of one test user: a group key and a session key wrapped with it.
pub struct Keys {
    pub group_key: GroupKey,
    pub session_key: SessionKey,
    pub wrapped: String,
}

impl Keys {
    pub fn new() -> Self {
        let group_key = generate_session_key();
        let session_key = generate_session_key();
        let wrapped = wrap_key(&group_key, &session_key).unwrap();
        Self {
            group_key,
            session_key,
            wrapped,
        }
    }

    pub fn resolver(&self) -> OwnerKeyResolver {
        let resolver = OwnerKeyResolver::new();
        resolver.add_group_key(GROUP, self.group_key.clone());
        resolver
    }

    pub fn seal(&self, value: Value) -> String {
        seal_string(&self.session_key, &value.to_string()).unwrap()
    }

    /// A contact as the server would send it.
    pub fn wire_contact(&self, list_id: &str, element_id: &str, first_name: &str) -> WireInstance {
        as_wire(json!({
            "_id": [list_id, element_id],
            "_ownerGroup": GROUP,
            "_ownerEncSessionKey": self.wrapped,
            "firstName": self.seal(json!(first_name)),
            "lastName": self.seal(json!("Lovelace")),
            "oldBirthday": 0,
        }))
    }
}

pub fn client_with(
    transport: Arc<dyn Transport>,
    resolver: Arc<dyn CryptoResolver>,
) -> EntityRestClient {
    EntityRestClient::new(
        Arc::new(StaticAuthHeaders::access_token("token")),
        transport,
        registry(),
        Arc::new(FieldCipherMapper::new()),
        move || resolver.clone(),
    )
}

/// Answers `ids` multi-loads with contacts named after their ids.
pub fn contacts_by_ids(keys: Arc<Keys>) -> impl Fn(&RestRequest) -> RestResult<String> {
    move |request| {
        let list_id = request.path.rsplit('/').next().unwrap_or_default().to_string();
        let ids = request.query_params.get("ids").cloned().unwrap_or_default();
        let instances: Vec<WireInstance> = ids
            .split(',')
            .filter(|id| !id.is_empty())
            .map(|id| keys.wire_contact(&list_id, id, id))
            .collect();
        Ok(serde_json::to_string(&instances).unwrap())
    }
}

// ── Counting resolver ───────────────────────────────────────────

/// Wraps a resolver and records how many key operations overlap.
pub struct CountingResolver {
    inner: OwnerKeyResolver,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    calls: AtomicUsize,
}

impl CountingResolver {
    pub fn new(inner: OwnerKeyResolver) -> Self {
        Self {
            inner,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn tracked<T>(&self, work: impl std::future::Future<Output = T>) -> T {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        for _ in 0..3 {
            tokio::task::yield_now().await;
        }
        let result = work.await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

#[async_trait]
impl CryptoResolver for CountingResolver {
    async fn apply_migrations(
        &self,
        type_ref: &TypeRef,
        instance: WireInstance,
    ) -> CryptoResult<WireInstance> {
        self.inner.apply_migrations(type_ref, instance).await
    }

    async fn resolve_session_key(
        &self,
        type_model: &TypeModel,
        instance: &Map<String, Value>,
    ) -> CryptoResult<SessionKeyLookup> {
        self.tracked(self.inner.resolve_session_key(type_model, instance))
            .await
    }

    async fn apply_migrations_for_instance(&self, instance: Entity) -> CryptoResult<Entity> {
        self.inner.apply_migrations_for_instance(instance).await
    }

    async fn set_new_owner_enc_session_key(
        &self,
        type_model: &TypeModel,
        instance: &mut Entity,
    ) -> CryptoResult<Option<SessionKey>> {
        self.tracked(self.inner.set_new_owner_enc_session_key(type_model, instance))
            .await
    }
}

// ── In-memory entity server ─────────────────────────────────────

type Rejection = Box<dyn Fn(&WireInstance) -> bool + Send + Sync>;

#[derive(Default)]
struct ServerState {
    next_id: u64,
    collections: BTreeMap<String, BTreeMap<String, WireInstance>>,
}

/// Serves the entity REST contract from memory.
///
/// List element resources are `/<app>/<type>/<listId>[/<elementId>]`,
/// element resources `/<app>/<type>[/<elementId>]`.
pub struct InMemoryServer {
    list_resources: HashSet<String>,
    max_multi_create: Option<usize>,
    reject: Option<Rejection>,
    state: Mutex<ServerState>,
    requests: Mutex<Vec<RestRequest>>,
}

impl InMemoryServer {
    pub fn new() -> Self {
        Self {
            list_resources: HashSet::from([
                contact_ref().resource_path(),
                push_identifier_ref().resource_path(),
            ]),
            max_multi_create: None,
            reject: None,
            state: Mutex::new(ServerState::default()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Multi-creates with more instances than `max` fail with 413.
    pub fn with_max_multi_create(mut self, max: usize) -> Self {
        self.max_multi_create = Some(max);
        self
    }

    /// Single creates of matching literals fail with 400.
    pub fn rejecting<F>(mut self, reject: F) -> Self
    where
        F: Fn(&WireInstance) -> bool + Send + Sync + 'static,
    {
        self.reject = Some(Box::new(reject));
        self
    }

    pub fn requests(&self) -> Vec<RestRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn stored(&self, collection: &str) -> Vec<WireInstance> {
        self.state
            .lock()
            .unwrap()
            .collections
            .get(collection)
            .map(|c| c.values().cloned().collect())
            .unwrap_or_default()
    }

    fn locate(&self, path: &str) -> RestResult<(String, bool, Option<String>, Option<String>)> {
        let segments: Vec<&str> = path.trim_start_matches('/').split('/').collect();
        if segments.len() < 2 {
            return Err(RestError::NotFound(path.to_string()));
        }
        let resource = format!("/{}/{}", segments[0], segments[1]);
        let rest = &segments[2..];
        if self.list_resources.contains(&resource) {
            let list_id = rest
                .first()
                .ok_or_else(|| RestError::BadRequest("missing list id".into()))?;
            Ok((
                format!("{resource}/{list_id}"),
                true,
                Some(list_id.to_string()),
                rest.get(1).map(|s| s.to_string()),
            ))
        } else {
            Ok((resource, false, None, rest.first().map(|s| s.to_string())))
        }
    }

    fn insert(
        state: &mut ServerState,
        collection: &str,
        list_id: Option<&str>,
        mut literal: WireInstance,
    ) -> String {
        state.next_id += 1;
        let id = format!("{:012}", state.next_id);
        let wire_id = match list_id {
            Some(list_id) => json!([list_id, id]),
            None => json!(id),
        };
        literal.insert("_id".into(), wire_id);
        state
            .collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.clone(), literal);
        id
    }

    fn handle(&self, request: &RestRequest) -> RestResult<String> {
        let (collection, _, list_id, element_id) = self.locate(&request.path)?;
        let mut state = self.state.lock().unwrap();
        let body = request.body.as_deref().unwrap_or("null");
        let bad = |e: serde_json::Error| RestError::BadRequest(e.to_string());

        match (request.method, element_id) {
            (HttpMethod::Post, None) if request.query_params.contains_key("count") => {
                let literals: Vec<WireInstance> = serde_json::from_str(body).map_err(bad)?;
                if self.max_multi_create.is_some_and(|max| literals.len() > max) {
                    return Err(RestError::PayloadTooLarge(format!(
                        "{} instances",
                        literals.len()
                    )));
                }
                let ids: Vec<Value> = literals
                    .into_iter()
                    .map(|l| {
                        json!({"generatedId": Self::insert(&mut state, &collection, list_id.as_deref(), l)})
                    })
                    .collect();
                Ok(Value::Array(ids).to_string())
            }
            (HttpMethod::Post, None) => {
                let literal: WireInstance = serde_json::from_str(body).map_err(bad)?;
                if self.reject.as_ref().is_some_and(|reject| reject(&literal)) {
                    return Err(RestError::BadRequest("rejected".into()));
                }
                let id = Self::insert(&mut state, &collection, list_id.as_deref(), literal);
                Ok(json!({ "generatedId": id }).to_string())
            }
            (HttpMethod::Get, Some(element_id)) => state
                .collections
                .get(&collection)
                .and_then(|c| c.get(&element_id))
                .map(|instance| Value::Object(instance.clone()).to_string())
                .ok_or(RestError::NotFound(request.path.clone())),
            (HttpMethod::Get, None) => {
                let empty = BTreeMap::new();
                let items = state.collections.get(&collection).unwrap_or(&empty);
                let selected: Vec<&WireInstance> = if let Some(ids) = request.query_params.get("ids") {
                    ids.split(',').filter_map(|id| items.get(id)).collect()
                } else {
                    let start = request.query_params.get("start").cloned().unwrap_or_default();
                    let count: usize = request
                        .query_params
                        .get("count")
                        .and_then(|c| c.parse().ok())
                        .unwrap_or(usize::MAX);
                    let reverse = request.query_params.get("reverse").map(String::as_str) == Some("true");
                    if reverse {
                        items
                            .iter()
                            .rev()
                            .filter(|(id, _)| id.as_str() < start.as_str())
                            .take(count)
                            .map(|(_, v)| v)
                            .collect()
                    } else {
                        items
                            .iter()
                            .filter(|(id, _)| id.as_str() > start.as_str())
                            .take(count)
                            .map(|(_, v)| v)
                            .collect()
                    }
                };
                Ok(serde_json::to_string(&selected).unwrap())
            }
            (HttpMethod::Put, Some(element_id)) => {
                let literal: WireInstance = serde_json::from_str(body).map_err(bad)?;
                let slot = state
                    .collections
                    .get_mut(&collection)
                    .and_then(|c| c.get_mut(&element_id))
                    .ok_or(RestError::NotFound(request.path.clone()))?;
                *slot = literal;
                Ok(String::new())
            }
            (HttpMethod::Delete, Some(element_id)) => state
                .collections
                .get_mut(&collection)
                .and_then(|c| c.remove(&element_id))
                .map(|_| String::new())
                .ok_or(RestError::NotFound(request.path.clone())),
            (method, _) => Err(RestError::MethodNotAllowed(method.to_string())),
        }
    }
}

#[async_trait]
impl Transport for InMemoryServer {
    async fn request(&self, request: RestRequest) -> RestResult<String> {
        let response = self.handle(&request);
        self.requests.lock().unwrap().push(request);
        tokio::task::yield_now().await;
        response
    }
}
