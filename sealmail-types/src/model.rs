//! Schema descriptors for entity types.

use crate::ids::EntityId;
use crate::{TypeError, TypeRef};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Schema of one entity type, as published in an application's model
/// document. Loaded once per [`TypeRef`] and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeModel {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub app: String,
    #[serde(rename = "type")]
    pub kind: TypeKind,
    /// Model version, sent to the server in the `v` header.
    #[serde(default)]
    pub version: String,
    /// Whether instances carry a session key protecting encrypted values.
    #[serde(default)]
    pub encrypted: bool,
    #[serde(default)]
    pub values: BTreeMap<String, ValueModel>,
    #[serde(default)]
    pub associations: BTreeMap<String, AssociationModel>,
}

impl TypeModel {
    /// The reference naming this model.
    pub fn type_ref(&self) -> TypeRef {
        TypeRef::new(&self.app, &self.name)
    }

    /// Converts the declared kind into an addressable [`Shape`].
    ///
    /// Aggregated types only exist nested inside other instances and have
    /// no resource path of their own.
    pub fn shape(&self) -> crate::Result<Shape> {
        match self.kind {
            TypeKind::Element => Ok(Shape::Element),
            TypeKind::ListElement => Ok(Shape::ListElement),
            TypeKind::Aggregated => Err(TypeError::NotAddressable {
                type_ref: self.type_ref(),
                kind: self.kind,
            }),
        }
    }

    /// Whether the named value is stored encrypted on the server.
    pub fn is_encrypted_value(&self, name: &str) -> bool {
        self.values.get(name).is_some_and(|v| v.encrypted)
    }

    /// Names of all encrypted values, in model order.
    pub fn encrypted_values(&self) -> impl Iterator<Item = &str> {
        self.values
            .iter()
            .filter(|(_, v)| v.encrypted)
            .map(|(name, _)| name.as_str())
    }
}

/// Kind as declared in the model document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeKind {
    #[serde(rename = "ELEMENT_TYPE")]
    Element,
    #[serde(rename = "LIST_ELEMENT_TYPE")]
    ListElement,
    #[serde(rename = "AGGREGATED_TYPE")]
    Aggregated,
}

/// Addressable shape of a type, deciding how its identity is laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// One instance per bare element id.
    Element,
    /// Instances partitioned into lists, identified by `(listId, elementId)`.
    ListElement,
}

impl Shape {
    /// Splits an id into `(listId, elementId)` for this shape.
    ///
    /// Returns `None` when the id's layout does not match the shape.
    pub fn split_id<'a>(&self, id: &'a EntityId) -> Option<(Option<&'a str>, &'a str)> {
        match (self, id) {
            (Shape::Element, EntityId::Element(element_id)) => Some((None, element_id.as_str())),
            (Shape::ListElement, EntityId::ListElement(list_id, element_id)) => {
                Some((Some(list_id.as_str()), element_id.as_str()))
            }
            _ => None,
        }
    }

    /// Whether a list id must (`ListElement`) or must not (`Element`) be given.
    pub fn requires_list_id(&self) -> bool {
        match self {
            Shape::Element => false,
            Shape::ListElement => true,
        }
    }
}

/// A plain value field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueModel {
    pub id: u64,
    #[serde(rename = "type")]
    pub value_type: ValueType,
    pub cardinality: Cardinality,
    #[serde(default)]
    pub encrypted: bool,
    #[serde(rename = "final", default)]
    pub is_final: bool,
}

impl ValueModel {
    fn simple(id: u64, value_type: ValueType, encrypted: bool) -> Self {
        Self {
            id,
            value_type,
            cardinality: Cardinality::One,
            encrypted,
            is_final: false,
        }
    }

    /// Shorthand for a string value.
    pub fn string(id: u64, encrypted: bool) -> Self {
        Self::simple(id, ValueType::String, encrypted)
    }

    /// Shorthand for a numeric value.
    pub fn number(id: u64, encrypted: bool) -> Self {
        Self::simple(id, ValueType::Number, encrypted)
    }

    /// Shorthand for a boolean value.
    pub fn boolean(id: u64, encrypted: bool) -> Self {
        Self::simple(id, ValueType::Boolean, encrypted)
    }

    /// Shorthand for a date value (milliseconds since epoch).
    pub fn date(id: u64, encrypted: bool) -> Self {
        Self::simple(id, ValueType::Date, encrypted)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueType {
    String,
    Number,
    Bytes,
    Date,
    Boolean,
    GeneratedId,
    CustomId,
    CompressedString,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cardinality {
    ZeroOrOne,
    Any,
    One,
}

/// A reference to another type, by id or by nesting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssociationModel {
    pub id: u64,
    #[serde(rename = "type")]
    pub association_type: AssociationType,
    pub cardinality: Cardinality,
    #[serde(rename = "refType")]
    pub ref_type: String,
    #[serde(rename = "final", default)]
    pub is_final: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssociationType {
    ElementAssociation,
    ListAssociation,
    ListElementAssociation,
    Aggregation,
}
