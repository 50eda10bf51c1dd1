//! Server-pushed change notifications.

use crate::TypeRef;
use serde::{Deserialize, Serialize};

/// What happened to the instance named by an [`EntityUpdate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationType {
    Create,
    Update,
    Delete,
}

/// One change event pushed by the server.
///
/// `instance_list_id` is empty for element types.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityUpdate {
    pub application: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub instance_list_id: String,
    pub instance_id: String,
    pub operation: OperationType,
}

impl EntityUpdate {
    /// The type reference the update concerns.
    pub fn type_ref(&self) -> TypeRef {
        TypeRef::new(&self.application, &self.type_name)
    }
}
