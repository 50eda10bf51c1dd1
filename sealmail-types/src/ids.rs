//! Entity identity.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of an entity instance.
///
/// Serializes the way the server lays out `_id`: a bare string for
/// element types, a `[listId, elementId]` array for list element types.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityId {
    Element(String),
    ListElement(String, String),
}

impl EntityId {
    /// Creates a bare element id.
    pub fn element(id: impl Into<String>) -> Self {
        Self::Element(id.into())
    }

    /// Creates a `(listId, elementId)` pair.
    pub fn list_element(list_id: impl Into<String>, element_id: impl Into<String>) -> Self {
        Self::ListElement(list_id.into(), element_id.into())
    }

    /// The list id, if this is a list element id.
    pub fn list_id(&self) -> Option<&str> {
        match self {
            Self::Element(_) => None,
            Self::ListElement(list_id, _) => Some(list_id.as_str()),
        }
    }

    /// The element id part.
    pub fn element_id(&self) -> &str {
        match self {
            Self::Element(id) | Self::ListElement(_, id) => id.as_str(),
        }
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Element(id) => write!(f, "{id}"),
            Self::ListElement(list_id, element_id) => write!(f, "{list_id}/{element_id}"),
        }
    }
}
