//! Caller-owned registry of client instances.
//!
//! # Design
//! One registry per scope that needs client sharing, passed around
//! explicitly — there is no process-wide state. Clients are keyed by
//! `(api key, host, port)` and created on first use; `dispose` tears down
//! every asynchronous client and drops all entries.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use crate::asynch::AsyncDashku;
use crate::config::ClientConfig;
use crate::error::DashkuError;
use crate::sync::SyncDashku;

fn registry_key(config: &ClientConfig) -> String {
    format!("{}@{}:{}", config.api_key(), config.host(), config.port())
}

/// Get-or-create store of blocking and asynchronous clients.
#[derive(Default)]
pub struct ClientRegistry {
    blocking: HashMap<String, SyncDashku>,
    asynchronous: HashMap<String, AsyncDashku>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The blocking client for `config`, created on first use.
    pub fn sync_client(&mut self, config: &ClientConfig) -> &mut SyncDashku {
        self.blocking
            .entry(registry_key(config))
            .or_insert_with(|| SyncDashku::new(config.clone()))
    }

    /// The asynchronous client for `config`, created on first use.
    pub fn async_client(&mut self, config: &ClientConfig) -> Result<&AsyncDashku, DashkuError> {
        match self.asynchronous.entry(registry_key(config)) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(slot) => Ok(slot.insert(AsyncDashku::new(config.clone())?)),
        }
    }

    pub fn len(&self) -> usize {
        self.blocking.len() + self.asynchronous.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocking.is_empty() && self.asynchronous.is_empty()
    }

    /// Dispose every asynchronous client and drop all entries.
    pub fn dispose(&mut self) {
        for client in self.asynchronous.values() {
            client.dispose();
        }
        self.asynchronous.clear();
        self.blocking.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(key: &str) -> ClientConfig {
        ClientConfig::new(key, "dashku", 3000).unwrap()
    }

    #[test]
    fn same_parameters_reuse_one_client() {
        let mut registry = ClientRegistry::new();
        let config = config("k1");
        registry.async_client(&config).unwrap();
        registry.async_client(&config).unwrap();
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn distinct_api_keys_get_distinct_clients() {
        let mut registry = ClientRegistry::new();
        registry.async_client(&config("k1")).unwrap();
        registry.async_client(&config("k2")).unwrap();
        registry.sync_client(&config("k1"));
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn dispose_clears_all_entries() {
        let mut registry = ClientRegistry::new();
        registry.async_client(&config("k1")).unwrap();
        registry.sync_client(&config("k1"));
        registry.dispose();
        assert!(registry.is_empty());
    }
}
