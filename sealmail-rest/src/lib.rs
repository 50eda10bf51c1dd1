//! Entity REST client for Sealmail.
//!
//! Fetches encrypted entities from the server, resolves their session
//! keys and returns decrypted instances; encrypts and uploads new and
//! changed instances. Server contracts it respects:
//!
//! - paths `/<app>/<lowercased-type>[/<listId>][/<elementId>]`
//! - header `v` carrying the model version on every request
//! - `ids`, `start`/`count`/`reverse` and `count` query parameters for
//!   multi-load, range-load and multi-create
//! - chunking of bulk requests, with single-create fallback when a
//!   multi-create is rejected as too large
//!
//! # Example
//!
//! ```no_run
//! use sealmail_crypto::{CryptoResolver, FieldCipherMapper, OwnerKeyResolver};
//! use sealmail_rest::{
//!     EntityRestClient, EntityRestInterface, HttpTransport, HttpTransportConfig,
//!     StaticAuthHeaders,
//! };
//! use sealmail_types::{EntityId, TypeModelRegistry, TypeRef};
//! use std::sync::Arc;
//!
//! # async fn run(registry: TypeModelRegistry) -> Result<(), Box<dyn std::error::Error>> {
//! let transport = HttpTransport::new(HttpTransportConfig::default())?;
//! let client = EntityRestClient::new(
//!     Arc::new(StaticAuthHeaders::access_token("token")),
//!     Arc::new(transport),
//!     Arc::new(registry),
//!     Arc::new(FieldCipherMapper::new()),
//!     || Arc::new(OwnerKeyResolver::new()) as Arc<dyn CryptoResolver>,
//! );
//! let folder_type = TypeRef::new("tutanota", "MailFolder");
//! let folder = client
//!     .load(&folder_type, &EntityId::list_element("l", "e"), None, None)
//!     .await?;
//! # let _ = folder;
//! # Ok(())
//! # }
//! ```

mod auth;
mod client;
mod config;
mod error;
pub mod http;
mod interface;
mod lazy;
pub mod transport;

pub use auth::{AuthHeadersProvider, StaticAuthHeaders};
pub use client::{EntityRestClient, PreparedRequest, MODEL_VERSION_HEADER};
pub use config::{EntityRestConfig, CRYPTO_CONCURRENCY, LOAD_MULTIPLE_LIMIT, POST_MULTIPLE_LIMIT};
pub use error::{EntityRestError, EntityRestResult, RestError, RestResult, SetupMultipleError};
pub use http::{HttpTransport, HttpTransportConfig};
pub use interface::EntityRestInterface;
pub use transport::{HttpMethod, MediaType, RestRequest, Transport};
