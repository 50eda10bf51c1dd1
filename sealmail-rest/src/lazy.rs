//! Deferred construction of the crypto resolver.

use sealmail_crypto::CryptoResolver;
use std::sync::{Arc, OnceLock};

type CryptoFactory = Box<dyn Fn() -> Arc<dyn CryptoResolver> + Send + Sync>;

/// Crypto resolver built on first use.
///
/// The resolver usually depends on services that themselves need the
/// entity client, so the client only receives a factory at construction.
pub(crate) struct LazyCrypto {
    factory: CryptoFactory,
    resolver: OnceLock<Arc<dyn CryptoResolver>>,
}

impl LazyCrypto {
    pub(crate) fn new<F>(factory: F) -> Self
    where
        F: Fn() -> Arc<dyn CryptoResolver> + Send + Sync + 'static,
    {
        Self {
            factory: Box::new(factory),
            resolver: OnceLock::new(),
        }
    }

    pub(crate) fn get(&self) -> Arc<dyn CryptoResolver> {
        self.resolver.get_or_init(|| (self.factory)()).clone()
    }

    pub(crate) fn is_initialized(&self) -> bool {
        self.resolver.get().is_some()
    }
}
