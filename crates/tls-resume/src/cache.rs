//! Session lifecycle for one endpoint.

use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::config::{EndpointCacheConfig, effective_ttl_secs};
use crate::error::Result;
use crate::key::{PeerIdentity, SessionKey};
use crate::scheduler::{ExpiryCallback, ExpiryScheduler};
use crate::session::TlsConnection;
use crate::store::{CacheEntry, EntryId, EntryStore};

/// How a successful store changed the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Disposition {
    New,
    Refreshed,
}

impl Disposition {
    fn as_str(self) -> &'static str {
        match self {
            Disposition::New => "new",
            Disposition::Refreshed => "refresh",
        }
    }
}

/// Cache statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Current number of cached sessions.
    pub size: usize,

    /// Maximum capacity.
    pub capacity: usize,

    /// TTL applied to newly created entries.
    pub ttl_secs: u32,

    /// Reuse attempts that found a session.
    pub hits: u64,

    /// Reuse attempts that found nothing.
    pub misses: u64,

    /// Entries created.
    pub created: u64,

    /// Entries whose payload was replaced in place.
    pub refreshed: u64,

    /// Entries destroyed to make room.
    pub evicted: u64,

    /// Entries destroyed by their TTL timer.
    pub expired: u64,

    /// Entries destroyed by teardown.
    pub torn_down: u64,

    /// Stores that failed, e.g. because no session could be extracted.
    pub failures: u64,
}

/// Everything guarded by the endpoint lock.
struct EndpointState {
    store: EntryStore,
    ttl_secs: u32,
    stats: CacheStats,
}

struct Shared {
    name: String,
    enabled: bool,
    state: Mutex<EndpointState>,
    scheduler: Arc<dyn ExpiryScheduler>,
}

impl Drop for Shared {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        let count = state.store.destroy_all(&*self.scheduler);
        if count > 0 {
            debug!(endpoint = %self.name, count, "Dropped endpoint session cache");
        }
    }
}

/// TLS session cache for one endpoint (virtual host).
///
/// Cloning yields another handle to the same cache. Every operation takes
/// the endpoint lock exactly once and holds it for its whole duration,
/// including the timer registrations it causes. When the last handle is
/// dropped all entries are destroyed and their timers cancelled.
#[derive(Clone)]
pub struct EndpointCache {
    shared: Arc<Shared>,
}

impl EndpointCache {
    /// Create the cache for endpoint `name`.
    pub fn new(
        name: impl Into<String>,
        config: EndpointCacheConfig,
        scheduler: Arc<dyn ExpiryScheduler>,
    ) -> Self {
        let name = name.into();
        let state = EndpointState {
            store: EntryStore::new(config.capacity),
            ttl_secs: effective_ttl_secs(config.ttl_secs),
            stats: CacheStats::default(),
        };
        debug!(
            endpoint = %name,
            capacity = config.capacity,
            ttl_secs = state.ttl_secs,
            enabled = config.enabled,
            "Created endpoint session cache"
        );

        Self {
            shared: Arc::new(Shared {
                name,
                enabled: config.caches_sessions(),
                state: Mutex::new(state),
                scheduler,
            }),
        }
    }

    /// Endpoint name used as the key prefix.
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Whether this endpoint caches sessions at all.
    pub fn is_enabled(&self) -> bool {
        self.shared.enabled
    }

    /// Offer a cached session to a connection about to handshake.
    ///
    /// On a hit the session is installed on `conn`, the connection is
    /// marked as attempting resumption and the entry becomes most recently
    /// used. Returns whether a session was offered; the TLS engine decides
    /// whether the server honors it.
    pub fn try_reuse<C>(&self, peer: &PeerIdentity, conn: &mut C) -> bool
    where
        C: TlsConnection + ?Sized,
    {
        if !self.shared.enabled {
            return false;
        }
        let key = SessionKey::new(&self.shared.name, peer);

        let mut guard = self.shared.state.lock();
        let state = &mut *guard;

        match state.store.touch(&key) {
            Some(entry) => {
                conn.install_session(&entry.payload);
                conn.mark_resumption_attempted();
                state.stats.hits += 1;
                debug!(endpoint = %self.shared.name, key = %key, "Reusing cached session");
                true
            }
            None => {
                state.stats.misses += 1;
                trace!(endpoint = %self.shared.name, key = %key, "No cached session");
                false
            }
        }
    }

    /// Capture the session negotiated by a completed handshake.
    ///
    /// Creates an entry for a new peer or replaces the payload of an
    /// existing one. A refresh keeps the entry's original expiry timer, so
    /// an entry lives at most one TTL from its creation however often it is
    /// refreshed. Returns `true` when the cache now owns the session.
    /// Failures are logged and never reach the handshake.
    pub fn store_or_refresh<C>(&self, peer: &PeerIdentity, conn: &mut C) -> bool
    where
        C: TlsConnection + ?Sized,
    {
        if !self.shared.enabled {
            return false;
        }
        let key = SessionKey::new(&self.shared.name, peer);

        let mut guard = self.shared.state.lock();
        let state = &mut *guard;

        match self.store_locked(state, &key, conn) {
            Ok(disposition) => {
                debug!(
                    endpoint = %self.shared.name,
                    key = %key,
                    disposition = disposition.as_str(),
                    cache_size = state.store.len(),
                    "Stored session"
                );
                true
            }
            Err(e) => {
                state.stats.failures += 1;
                warn!(endpoint = %self.shared.name, key = %key, error = %e, "Failed to cache session");
                false
            }
        }
    }

    fn store_locked<C>(
        &self,
        state: &mut EndpointState,
        key: &SessionKey,
        conn: &mut C,
    ) -> Result<Disposition>
    where
        C: TlsConnection + ?Sized,
    {
        let scheduler = &*self.shared.scheduler;

        if state.store.find(key).is_some() {
            let payload = match conn.extract_session() {
                Ok(payload) => payload,
                Err(e) => {
                    // The old payload is already stale; drop the entry with it.
                    state.store.remove_and_destroy(key, scheduler);
                    return Err(e.into());
                }
            };
            if let Some(entry) = state.store.touch(key) {
                entry.payload = payload;
            }
            state.stats.refreshed += 1;
            return Ok(Disposition::Refreshed);
        }

        // Extract before making room so a failure leaves the cache untouched.
        let payload = conn.extract_session()?;

        if state.store.evict_lru_if_full(scheduler).is_some() {
            state.stats.evicted += 1;
        }

        let id = state.store.allocate_id();
        let ttl = Duration::from_secs(u64::from(state.ttl_secs));
        let timer = scheduler.schedule(ttl, self.expiry_callback(id));
        state
            .store
            .insert_new(key.clone(), CacheEntry::new(id, payload, timer));
        state.stats.created += 1;

        Ok(Disposition::New)
    }

    fn expiry_callback(&self, id: EntryId) -> ExpiryCallback {
        let weak: Weak<Shared> = Arc::downgrade(&self.shared);
        Box::new(move || {
            if let Some(shared) = weak.upgrade() {
                EndpointCache { shared }.expire(id);
            }
        })
    }

    /// Destroy an entry whose TTL has elapsed.
    ///
    /// Called by the expiry timer. An id whose entry is already gone (it
    /// was evicted or torn down while the timer was firing) is ignored.
    /// Returns whether an entry was destroyed.
    pub fn expire(&self, id: EntryId) -> bool {
        let mut guard = self.shared.state.lock();
        let state = &mut *guard;

        match state.store.destroy_by_id(id, &*self.shared.scheduler) {
            Some(key) => {
                state.stats.expired += 1;
                debug!(
                    endpoint = %self.shared.name,
                    key = %key,
                    remaining = state.store.len(),
                    "Session expired"
                );
                true
            }
            None => {
                trace!(endpoint = %self.shared.name, entry = %id, "Expiry for destroyed session ignored");
                false
            }
        }
    }

    /// Destroy every cached session. Returns how many were destroyed.
    pub fn teardown(&self) -> usize {
        let mut guard = self.shared.state.lock();
        let state = &mut *guard;

        let count = state.store.destroy_all(&*self.shared.scheduler);
        state.stats.torn_down += count as u64;
        if count > 0 {
            debug!(endpoint = %self.shared.name, count, "Tore down session cache");
        }
        count
    }

    /// Set the TTL for entries created from now on (0 means default).
    pub fn configure_ttl(&self, ttl_secs: u32) {
        let ttl_secs = effective_ttl_secs(ttl_secs);
        self.shared.state.lock().ttl_secs = ttl_secs;
        debug!(endpoint = %self.shared.name, ttl_secs, "Configured session TTL");
    }

    /// TTL applied to new entries.
    pub fn ttl_secs(&self) -> u32 {
        self.shared.state.lock().ttl_secs
    }

    /// Maximum number of entries.
    pub fn capacity(&self) -> usize {
        self.shared.state.lock().store.capacity()
    }

    /// Current number of cached sessions.
    pub fn len(&self) -> usize {
        self.shared.state.lock().store.len()
    }

    /// Check if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.shared.state.lock().store.is_empty()
    }

    /// Whether a session is cached for `peer`, without touching its recency.
    pub fn contains(&self, peer: &PeerIdentity) -> bool {
        let key = SessionKey::new(&self.shared.name, peer);
        self.shared.state.lock().store.find(&key).is_some()
    }

    /// Cached keys from least to most recently used.
    pub fn keys(&self) -> Vec<SessionKey> {
        self.shared.state.lock().store.keys()
    }

    /// Get cache statistics.
    pub fn stats(&self) -> CacheStats {
        let state = self.shared.state.lock();
        CacheStats {
            size: state.store.len(),
            capacity: state.store.capacity(),
            ttl_secs: state.ttl_secs,
            ..state.stats.clone()
        }
    }
}

impl std::fmt::Debug for EndpointCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EndpointCache")
            .field("name", &self.shared.name)
            .field("enabled", &self.shared.enabled)
            .field("len", &self.len())
            .finish()
    }
}
