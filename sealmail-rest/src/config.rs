//! Entity client configuration.

use sealmail_types::TypeRef;
use serde::{Deserialize, Serialize};

/// Maximum ids per `loadMultiple` request accepted by the server.
pub const LOAD_MULTIPLE_LIMIT: usize = 100;

/// Maximum instances per multi-create request accepted by the server.
pub const POST_MULTIPLE_LIMIT: usize = 100;

/// Per-instance crypto steps in flight for one bulk call.
pub const CRYPTO_CONCURRENCY: usize = 5;

/// Configuration for the entity REST client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityRestConfig {
    /// Chunk size for `load_multiple`.
    pub load_multiple_limit: usize,
    /// Chunk size for `setup_multiple`.
    pub post_multiple_limit: usize,
    /// Bound on concurrent decrypt/encrypt pipelines within a bulk call.
    pub crypto_concurrency: usize,
    /// The one type whose bulk results get raw migrations applied before
    /// decryption. Single loads always migrate.
    pub legacy_migration_type: Option<TypeRef>,
}

impl Default for EntityRestConfig {
    fn default() -> Self {
        Self {
            load_multiple_limit: LOAD_MULTIPLE_LIMIT,
            post_multiple_limit: POST_MULTIPLE_LIMIT,
            crypto_concurrency: CRYPTO_CONCURRENCY,
            legacy_migration_type: Some(TypeRef::new("sys", "PushIdentifier")),
        }
    }
}

impl EntityRestConfig {
    pub(crate) fn load_chunk_size(&self) -> usize {
        self.load_multiple_limit.max(1)
    }

    pub(crate) fn post_chunk_size(&self) -> usize {
        self.post_multiple_limit.max(1)
    }

    pub(crate) fn concurrency(&self) -> usize {
        self.crypto_concurrency.max(1)
    }
}
