//! Process-wide set of endpoint caches.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::cache::EndpointCache;
use crate::config::EndpointCacheConfig;
use crate::error::{Error, Result};
use crate::scheduler::ExpiryScheduler;

/// One [`EndpointCache`] per served endpoint, sharing one scheduler.
pub struct SessionCaches {
    scheduler: Arc<dyn ExpiryScheduler>,
    endpoints: RwLock<HashMap<String, EndpointCache>>,
}

impl SessionCaches {
    pub fn new(scheduler: Arc<dyn ExpiryScheduler>) -> Self {
        Self {
            scheduler,
            endpoints: RwLock::new(HashMap::new()),
        }
    }

    /// Build a registry with one cache per configured endpoint.
    pub fn from_configs<I, N>(scheduler: Arc<dyn ExpiryScheduler>, configs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (N, EndpointCacheConfig)>,
        N: Into<String>,
    {
        let caches = Self::new(scheduler);
        for (name, config) in configs {
            caches.add_endpoint(name, config)?;
        }
        Ok(caches)
    }

    /// Register a new endpoint and return its cache.
    pub fn add_endpoint(
        &self,
        name: impl Into<String>,
        config: EndpointCacheConfig,
    ) -> Result<EndpointCache> {
        let name = name.into();
        let mut endpoints = self.endpoints.write();
        if endpoints.contains_key(&name) {
            return Err(Error::DuplicateEndpoint(name));
        }
        let cache = EndpointCache::new(name.clone(), config, Arc::clone(&self.scheduler));
        endpoints.insert(name, cache.clone());
        Ok(cache)
    }

    pub fn get(&self, name: &str) -> Option<EndpointCache> {
        self.endpoints.read().get(name).cloned()
    }

    /// Unregister an endpoint and destroy its sessions.
    pub fn remove_endpoint(&self, name: &str) -> bool {
        let removed = self.endpoints.write().remove(name);
        match removed {
            Some(cache) => {
                let count = cache.teardown();
                debug!(endpoint = %name, count, "Removed endpoint");
                true
            }
            None => false,
        }
    }

    /// Endpoint names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.endpoints.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.endpoints.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.read().is_empty()
    }

    /// Destroy the sessions of every endpoint. Endpoints stay registered.
    pub fn teardown_all(&self) -> usize {
        let caches: Vec<EndpointCache> = self.endpoints.read().values().cloned().collect();
        caches.iter().map(EndpointCache::teardown).sum()
    }
}

impl std::fmt::Debug for SessionCaches {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCaches")
            .field("endpoints", &self.names())
            .finish()
    }
}
