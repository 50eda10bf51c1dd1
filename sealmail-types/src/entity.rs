use crate::{EntityId, TypeRef};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Wire form of an instance: the JSON object the server sends and accepts.
/// Encrypted values are base64 ciphertext strings.
pub type WireInstance = Map<String, Value>;

/// Field carrying the instance identity on the wire.
pub const ID_FIELD: &str = "_id";

/// Marker field listing per-field decryption failures.
pub const ERRORS_FIELD: &str = "_errors";

/// A decrypted entity instance.
///
/// `fields` holds plain JSON values keyed by model field name, plus
/// metadata such as `_ownerGroup`. When some values could not be
/// decrypted the instance is still returned, with the reasons recorded in
/// `errors` keyed by field name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    #[serde(rename = "_type")]
    pub type_ref: TypeRef,
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<EntityId>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
    #[serde(rename = "_errors", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub errors: BTreeMap<String, String>,
}

impl Entity {
    /// Creates an empty, not yet persisted instance of `type_ref`.
    pub fn new(type_ref: TypeRef) -> Self {
        Self {
            type_ref,
            id: None,
            fields: Map::new(),
            errors: BTreeMap::new(),
        }
    }

    /// Builder-style setter for the identity.
    #[must_use]
    pub fn with_id(mut self, id: EntityId) -> Self {
        self.id = Some(id);
        self
    }

    /// Builder-style setter for one field.
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Sets a field, returning the previous value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(name.into(), value.into())
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.fields.get(name).and_then(Value::as_bool)
    }

    pub fn get_number(&self, name: &str) -> Option<f64> {
        self.fields.get(name).and_then(Value::as_f64)
    }

    /// Owner group id, if assigned.
    pub fn owner_group(&self) -> Option<&str> {
        self.get_str("_ownerGroup")
    }

    /// True when decryption failed for at least one field.
    pub fn is_degraded(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Compares type, identity and fields, ignoring the volatile error marker.
    pub fn same_content(&self, other: &Entity) -> bool {
        self.type_ref == other.type_ref && self.id == other.id && self.fields == other.fields
    }
}
