//! Conversion between wire payloads and decrypted instances.

use crate::cipher;
use crate::error::{CryptoError, CryptoResult};
use crate::key::SessionKey;
use async_trait::async_trait;
use sealmail_types::{Entity, EntityId, Shape, TypeModel, WireInstance, ERRORS_FIELD, ID_FIELD};
use serde_json::Value;
use std::collections::BTreeMap;

/// Error entry recorded when an encrypted type was decrypted without a key.
pub const SESSION_KEY_ERROR: &str = "_sessionKey";

/// Maps between the wire form and decrypted entities.
#[async_trait]
pub trait InstanceMapper: Send + Sync {
    /// Decrypts and maps a wire payload.
    ///
    /// With `key == None` the result is degraded rather than an error:
    /// encrypted values are left empty and the reasons recorded in
    /// [`Entity::errors`].
    async fn decrypt_and_map_to_instance(
        &self,
        type_model: &TypeModel,
        instance: WireInstance,
        key: Option<&SessionKey>,
    ) -> CryptoResult<Entity>;

    /// Encrypts and maps an entity to its wire form.
    async fn encrypt_and_map_to_literal(
        &self,
        type_model: &TypeModel,
        instance: &Entity,
        key: Option<&SessionKey>,
    ) -> CryptoResult<WireInstance>;
}

/// Seals every encrypted value of the model individually.
///
/// Each value is serialized to JSON text and sealed with ChaCha20-Poly1305.
/// `null` is sent as the empty string. Unencrypted values, associations and
/// metadata fields pass through untouched.
#[derive(Debug, Default, Clone, Copy)]
pub struct FieldCipherMapper;

impl FieldCipherMapper {
    pub fn new() -> Self {
        Self
    }

    fn parse_id(type_model: &TypeModel, raw: Value) -> CryptoResult<EntityId> {
        let id: EntityId = serde_json::from_value(raw).map_err(|e| CryptoError::InvalidField {
            field: ID_FIELD.into(),
            reason: e.to_string(),
        })?;
        let matches = match type_model.shape() {
            Ok(Shape::Element) => matches!(id, EntityId::Element(_)),
            Ok(Shape::ListElement) => matches!(id, EntityId::ListElement(..)),
            Err(_) => true,
        };
        if !matches {
            return Err(CryptoError::InvalidField {
                field: ID_FIELD.into(),
                reason: format!("id {id} does not fit type {}", type_model.name),
            });
        }
        Ok(id)
    }

    fn decrypt_value(key: &SessionKey, field: &str, value: &Value) -> CryptoResult<Value> {
        let encoded = match value {
            Value::Null => return Ok(Value::Null),
            Value::String(s) if s.is_empty() => return Ok(Value::Null),
            Value::String(s) => s,
            other => {
                return Err(CryptoError::InvalidField {
                    field: field.into(),
                    reason: format!("expected ciphertext string, got {other}"),
                });
            }
        };
        let plaintext = cipher::open_string(key, encoded)?;
        Ok(serde_json::from_str(&plaintext)?)
    }
}

#[async_trait]
impl InstanceMapper for FieldCipherMapper {
    async fn decrypt_and_map_to_instance(
        &self,
        type_model: &TypeModel,
        mut instance: WireInstance,
        key: Option<&SessionKey>,
    ) -> CryptoResult<Entity> {
        let mut entity = Entity::new(type_model.type_ref());
        entity.id = instance
            .remove(ID_FIELD)
            .map(|raw| Self::parse_id(type_model, raw))
            .transpose()?;
        instance.remove(ERRORS_FIELD);

        let mut errors = BTreeMap::new();
        if type_model.encrypted && key.is_none() {
            errors.insert(SESSION_KEY_ERROR.to_string(), "session key not resolved".to_string());
        }

        for (name, value) in instance {
            if !type_model.is_encrypted_value(&name) {
                entity.fields.insert(name, value);
                continue;
            }
            let decrypted = match key {
                Some(key) => Self::decrypt_value(key, &name, &value).unwrap_or_else(|e| {
                    errors.insert(name.clone(), e.to_string());
                    Value::Null
                }),
                None => {
                    if !value.is_null() && value.as_str() != Some("") {
                        errors.insert(name.clone(), "missing session key".to_string());
                    }
                    Value::Null
                }
            };
            entity.fields.insert(name, decrypted);
        }

        entity.errors = errors;
        Ok(entity)
    }

    async fn encrypt_and_map_to_literal(
        &self,
        type_model: &TypeModel,
        instance: &Entity,
        key: Option<&SessionKey>,
    ) -> CryptoResult<WireInstance> {
        let mut literal = WireInstance::new();
        if let Some(id) = &instance.id {
            literal.insert(ID_FIELD.into(), serde_json::to_value(id)?);
        }

        for (name, value) in &instance.fields {
            if !type_model.is_encrypted_value(name) {
                literal.insert(name.clone(), value.clone());
                continue;
            }
            let sealed = if value.is_null() {
                String::new()
            } else {
                let key = key.ok_or_else(|| CryptoError::MissingSessionKey(name.clone()))?;
                cipher::seal_string(key, &serde_json::to_string(value)?)?
            };
            literal.insert(name.clone(), Value::String(sealed));
        }

        Ok(literal)
    }
}
