//! Process-wide client registry.
//!
//! Host applications that serve many credentials (one upstream account
//! per caller) want one [`QwenClient`] per token rather than one per
//! request. The registry makes that lifecycle explicit: a client is
//! created on first use of a credential and lives until
//! [`ClientRegistry::invalidate`] is called for it — which is required
//! after rotating a credential, since the old client keeps streaming with
//! the token it was built with.

use crate::api::QwenClient;
use crate::config::ClientConfig;
use crate::error::Result;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

/// Registry of clients keyed by bearer credential.
#[derive(Debug, Default)]
pub struct ClientRegistry {
    clients: Mutex<HashMap<String, Arc<QwenClient>>>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide instance.
    pub fn global() -> &'static ClientRegistry {
        static GLOBAL: OnceLock<ClientRegistry> = OnceLock::new();
        GLOBAL.get_or_init(ClientRegistry::new)
    }

    /// Fetch the client for a credential, creating it on first use.
    pub fn get_or_create(&self, token: &str, config: &ClientConfig) -> Result<Arc<QwenClient>> {
        let mut clients = self
            .clients
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(client) = clients.get(token) {
            return Ok(Arc::clone(client));
        }
        let client = Arc::new(QwenClient::new(token, config.clone())?);
        clients.insert(token.to_string(), Arc::clone(&client));
        Ok(client)
    }

    /// Drop the client for a credential. Returns whether one existed.
    /// In-flight requests on the old client finish with the old token.
    pub fn invalidate(&self, token: &str) -> bool {
        self.clients
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(token)
            .is_some()
    }

    /// Number of live clients.
    pub fn len(&self) -> usize {
        self.clients
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_created_on_first_use_and_shared() {
        let registry = ClientRegistry::new();
        let config = ClientConfig::default();
        let a = registry.get_or_create("tok-a", &config).unwrap();
        let b = registry.get_or_create("tok-a", &config).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_distinct_credentials_distinct_clients() {
        let registry = ClientRegistry::new();
        let config = ClientConfig::default();
        let a = registry.get_or_create("tok-a", &config).unwrap();
        let b = registry.get_or_create("tok-b", &config).unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_invalidate_removes() {
        let registry = ClientRegistry::new();
        let config = ClientConfig::default();
        registry.get_or_create("tok-a", &config).unwrap();
        assert!(registry.invalidate("tok-a"));
        assert!(!registry.invalidate("tok-a"));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_empty_token_never_cached() {
        let registry = ClientRegistry::new();
        let config = ClientConfig::default();
        assert!(registry.get_or_create("", &config).is_err());
        assert!(registry.is_empty());
    }
}
