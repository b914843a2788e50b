//! Configuration for an endpoint session cache.

use serde::{Deserialize, Serialize};

/// Default maximum number of cached sessions per endpoint.
pub const DEFAULT_CAPACITY: usize = 10;

/// Default session lifetime in seconds.
/// One hour is the maximum recommended by RFC 5246 F.1.4.
pub const DEFAULT_TTL_SECS: u32 = 3600;

/// Map a configured TTL to the one actually applied (0 means default).
pub fn effective_ttl_secs(ttl_secs: u32) -> u32 {
    if ttl_secs == 0 { DEFAULT_TTL_SECS } else { ttl_secs }
}

/// Configuration for one endpoint's session cache.
///
/// ```toml
/// capacity = 10
/// ttl_secs = 3600
/// enabled = true
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointCacheConfig {
    /// Maximum number of sessions kept before the LRU one is evicted.
    pub capacity: usize,

    /// Seconds a session may live, counted from when it was first stored.
    /// Zero selects [`DEFAULT_TTL_SECS`].
    pub ttl_secs: u32,

    /// Whether sessions are cached for this endpoint at all.
    pub enabled: bool,
}

impl Default for EndpointCacheConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            ttl_secs: DEFAULT_TTL_SECS,
            enabled: true,
        }
    }
}

impl EndpointCacheConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of cached sessions.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Set the session TTL in seconds (0 means default).
    pub fn with_ttl_secs(mut self, ttl_secs: u32) -> Self {
        self.ttl_secs = ttl_secs;
        self
    }

    /// Enable or disable caching.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Disable caching for this endpoint.
    pub fn disabled(self) -> Self {
        self.with_enabled(false)
    }

    /// Whether this configuration can ever hold a session.
    pub fn caches_sessions(&self) -> bool {
        self.enabled && self.capacity > 0
    }
}
