//! LRU-ordered entry storage for one endpoint.
//!
//! Everything here runs with the endpoint lock held: the store is only
//! reachable through the guard of the endpoint mutex. Entries are owned by
//! the collection alone and [`EntryStore::remove_and_destroy`] is the only
//! way one leaves it, so the timer is always cancelled before the entry is
//! unlinked and its payload released.

use std::fmt;

use lru::LruCache;
use tracing::debug;

use crate::key::SessionKey;
use crate::scheduler::{ExpiryScheduler, TimerHandle};
use crate::session::SessionPayload;

/// Identity of one entry over its lifetime.
///
/// Serials are never reused within an endpoint, so a timer that fires for
/// a destroyed entry cannot match a newer entry stored under the same key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(u64);

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A cached session.
pub(crate) struct CacheEntry {
    pub(crate) id: EntryId,
    pub(crate) payload: SessionPayload,
    pub(crate) timer: TimerHandle,
}

impl CacheEntry {
    pub(crate) fn new(id: EntryId, payload: SessionPayload, timer: TimerHandle) -> Self {
        Self { id, payload, timer }
    }
}

pub(crate) struct EntryStore {
    /// Head is least recently used, tail most recently used.
    entries: LruCache<SessionKey, CacheEntry>,
    capacity: usize,
    next_id: u64,
}

impl EntryStore {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            // Bounded by hand so every eviction goes through the destroy path.
            entries: LruCache::unbounded(),
            capacity,
            next_id: 0,
        }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Reserve the id for an entry about to be created.
    pub(crate) fn allocate_id(&mut self) -> EntryId {
        self.next_id += 1;
        EntryId(self.next_id)
    }

    /// Look up an entry without changing its recency.
    pub(crate) fn find(&self, key: &SessionKey) -> Option<&CacheEntry> {
        self.entries.peek(key)
    }

    /// Move an entry to the tail and return it.
    pub(crate) fn touch(&mut self, key: &SessionKey) -> Option<&mut CacheEntry> {
        self.entries.get_mut(key)
    }

    /// Destroy the head entry if the store is full. Returns its key.
    pub(crate) fn evict_lru_if_full(
        &mut self,
        scheduler: &dyn ExpiryScheduler,
    ) -> Option<SessionKey> {
        if self.entries.len() < self.capacity {
            return None;
        }
        let key = self.entries.peek_lru().map(|(k, _)| k.clone())?;
        debug!(key = %key, capacity = self.capacity, "Pruning least recently used session");
        self.remove_and_destroy(&key, scheduler);
        Some(key)
    }

    /// Append a new entry at the tail.
    ///
    /// The caller has already looked the key up and made room.
    pub(crate) fn insert_new(&mut self, key: SessionKey, entry: CacheEntry) {
        debug_assert!(!self.entries.contains(&key));
        debug_assert!(self.entries.len() < self.capacity);
        self.entries.push(key, entry);
    }

    /// Cancel the entry's timer, unlink it and release its payload.
    pub(crate) fn remove_and_destroy(
        &mut self,
        key: &SessionKey,
        scheduler: &dyn ExpiryScheduler,
    ) -> Option<EntryId> {
        let timer = self.entries.peek(key)?.timer;
        scheduler.cancel(timer);
        let entry = self.entries.pop(key)?;
        Some(entry.id)
    }

    /// Destroy the entry with the given id, if it is still live.
    pub(crate) fn destroy_by_id(
        &mut self,
        id: EntryId,
        scheduler: &dyn ExpiryScheduler,
    ) -> Option<SessionKey> {
        let key = self
            .entries
            .iter()
            .find(|(_, e)| e.id == id)
            .map(|(k, _)| k.clone())?;
        self.remove_and_destroy(&key, scheduler);
        Some(key)
    }

    /// Destroy every entry. Returns how many were destroyed.
    pub(crate) fn destroy_all(&mut self, scheduler: &dyn ExpiryScheduler) -> usize {
        let mut count = 0;
        while let Some(key) = self.entries.peek_lru().map(|(k, _)| k.clone()) {
            self.remove_and_destroy(&key, scheduler);
            count += 1;
        }
        count
    }

    /// Keys from least to most recently used.
    pub(crate) fn keys(&self) -> Vec<SessionKey> {
        self.entries.iter().rev().map(|(k, _)| k.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::ManualScheduler;
    use crate::key::PeerIdentity;
    use std::time::Duration;

    fn key(port: u16) -> SessionKey {
        SessionKey::new("vh", &PeerIdentity::new([10, 0, 0, 1].into(), port))
    }

    fn admit(store: &mut EntryStore, scheduler: &ManualScheduler, port: u16) -> EntryId {
        let id = store.allocate_id();
        let timer = scheduler.schedule(Duration::from_secs(60), Box::new(|| {}));
        store.insert_new(key(port), CacheEntry::new(id, SessionPayload::new(vec![port as u8]), timer));
        id
    }

    #[test]
    fn test_insert_appends_at_tail() {
        let scheduler = ManualScheduler::new();
        let mut store = EntryStore::new(3);

        admit(&mut store, &scheduler, 1);
        admit(&mut store, &scheduler, 2);

        assert_eq!(store.keys(), vec![key(1), key(2)]);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_find_does_not_reorder() {
        let scheduler = ManualScheduler::new();
        let mut store = EntryStore::new(3);
        admit(&mut store, &scheduler, 1);
        admit(&mut store, &scheduler, 2);

        assert!(store.find(&key(1)).is_some());
        assert!(store.find(&key(9)).is_none());
        assert_eq!(store.keys(), vec![key(1), key(2)]);
    }

    #[test]
    fn test_touch_moves_to_tail() {
        let scheduler = ManualScheduler::new();
        let mut store = EntryStore::new(3);
        admit(&mut store, &scheduler, 1);
        admit(&mut store, &scheduler, 2);
        admit(&mut store, &scheduler, 3);

        store.touch(&key(1));
        assert_eq!(store.keys(), vec![key(2), key(3), key(1)]);
    }

    #[test]
    fn test_evict_only_when_full() {
        let scheduler = ManualScheduler::new();
        let mut store = EntryStore::new(2);
        admit(&mut store, &scheduler, 1);

        assert_eq!(store.evict_lru_if_full(&scheduler), None);
        admit(&mut store, &scheduler, 2);

        assert_eq!(store.evict_lru_if_full(&scheduler), Some(key(1)));
        assert_eq!(store.keys(), vec![key(2)]);
        assert_eq!(scheduler.cancelled(), 1);
        assert_eq!(scheduler.pending(), 1);
    }

    #[test]
    fn test_remove_and_destroy_cancels_timer() {
        let scheduler = ManualScheduler::new();
        let mut store = EntryStore::new(2);
        let id = admit(&mut store, &scheduler, 1);

        assert_eq!(store.remove_and_destroy(&key(1), &scheduler), Some(id));
        assert!(store.is_empty());
        assert_eq!(scheduler.pending(), 0);

        // Second destroy finds nothing and cancels nothing.
        assert_eq!(store.remove_and_destroy(&key(1), &scheduler), None);
        assert_eq!(scheduler.cancelled(), 1);
    }

    #[test]
    fn test_destroy_by_id_ignores_stale_id() {
        let scheduler = ManualScheduler::new();
        let mut store = EntryStore::new(2);
        let old = admit(&mut store, &scheduler, 1);
        store.remove_and_destroy(&key(1), &scheduler);
        let new = admit(&mut store, &scheduler, 1);

        assert_ne!(old, new);
        assert_eq!(store.destroy_by_id(old, &scheduler), None);
        assert_eq!(store.len(), 1);
        assert_eq!(store.destroy_by_id(new, &scheduler), Some(key(1)));
        assert!(store.is_empty());
    }

    #[test]
    fn test_destroy_all() {
        let scheduler = ManualScheduler::new();
        let mut store = EntryStore::new(5);
        for port in 1..=4 {
            admit(&mut store, &scheduler, port);
        }

        assert_eq!(store.destroy_all(&scheduler), 4);
        assert!(store.is_empty());
        assert_eq!(scheduler.pending(), 0);
        assert_eq!(store.destroy_all(&scheduler), 0);
    }
}
