use serde::{Deserialize, Serialize};
use std::fmt;

/// Names a kind of domain entity: an application namespace plus a type name.
///
/// Immutable and cheap to clone. Used as registry key and carried by every
/// [`Entity`](crate::Entity) so the client knows which schema applies.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypeRef {
    app: String,
    #[serde(rename = "type")]
    type_name: String,
}

impl TypeRef {
    /// Creates a type reference.
    pub fn new(app: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            app: app.into(),
            type_name: type_name.into(),
        }
    }

    /// The application namespace (e.g. `"tutanota"`, `"sys"`).
    pub fn app(&self) -> &str {
        &self.app
    }

    /// The type name as declared in the model (e.g. `"MailFolder"`).
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Resource segment used in REST paths: `/<app>/<lowercased-type>`.
    pub fn resource_path(&self) -> String {
        format!("/{}/{}", self.app, self.type_name.to_lowercase())
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.app, self.type_name)
    }
}
