//! Encryption layer for Sealmail entities.
//!
//! Content of an entity instance is encrypted with a per-instance session
//! key, which itself is encrypted with the key of the instance's owner
//! group. This crate defines the two collaborator seams the REST client
//! talks to:
//! - [`CryptoResolver`]: resolves or mints session keys and runs schema
//!   migrations
//! - [`InstanceMapper`]: converts between wire and decrypted instances
//!
//! [`OwnerKeyResolver`] and [`FieldCipherMapper`] implement them on top of
//! ChaCha20-Poly1305.

pub mod cipher;
mod error;
pub mod key;
mod mapper;
mod migration;
mod owner_key;
mod resolver;

pub use cipher::SealedData;
pub use error::{CryptoError, CryptoResult};
pub use key::{generate_session_key, GroupKey, SessionKey, SymmetricKey, KEY_SIZE};
pub use mapper::{FieldCipherMapper, InstanceMapper, SESSION_KEY_ERROR};
pub use migration::{InstanceMigration, MigrationRegistry, RawMigration};
pub use owner_key::{OwnerKeyResolver, OWNER_ENC_SESSION_KEY_FIELD, OWNER_GROUP_FIELD};
pub use resolver::{CryptoResolver, SessionKeyLookup};
