//! Concurrent access to one endpoint cache from many connection threads.

mod common;

use std::sync::Arc;
use std::thread;

use common::{MockConnection, peer};
use tls_resume::{EndpointCache, EndpointCacheConfig, ManualScheduler};

#[test]
fn test_same_key_from_many_threads_creates_one_entry() {
    let scheduler = Arc::new(ManualScheduler::new());
    let cache = EndpointCache::new("vh", EndpointCacheConfig::new(), scheduler.clone());

    let handles: Vec<_> = (0..16)
        .map(|i| {
            let cache = cache.clone();
            thread::spawn(move || {
                for _ in 0..100 {
                    assert!(cache.store_or_refresh(&peer(7), &mut MockConnection::negotiated(&[i])));
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    let stats = cache.stats();
    assert_eq!(cache.len(), 1);
    assert_eq!(stats.created, 1);
    assert_eq!(stats.refreshed, 16 * 100 - 1);
    assert_eq!(scheduler.pending(), 1);
}

#[test]
fn test_mixed_traffic_respects_capacity_and_timers() {
    let scheduler = Arc::new(ManualScheduler::new());
    let config = EndpointCacheConfig::new().with_capacity(8);
    let cache = EndpointCache::new("vh", config, scheduler.clone());

    let handles: Vec<_> = (0..8u8)
        .map(|t| {
            let cache = cache.clone();
            thread::spawn(move || {
                for round in 0..200u32 {
                    let p = peer(((round as u8).wrapping_mul(7).wrapping_add(t)) % 32);
                    let mut conn = MockConnection::negotiated(&[t]);
                    if !cache.try_reuse(&p, &mut conn) {
                        assert!(cache.store_or_refresh(&p, &mut conn));
                    }
                    assert!(cache.len() <= 8);
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    // Every live entry holds exactly one timer; every destroyed one cancelled its own.
    let stats = cache.stats();
    assert!(cache.len() <= 8);
    assert_eq!(scheduler.pending(), cache.len());
    assert_eq!(stats.created as usize - stats.evicted as usize, cache.len());
    assert_eq!(scheduler.cancelled() as u64, stats.evicted);

    assert_eq!(cache.teardown(), stats.size);
    assert_eq!(scheduler.pending(), 0);
}

#[test]
fn test_expiry_races_with_stores() {
    let scheduler = Arc::new(ManualScheduler::new());
    let config = EndpointCacheConfig::new().with_capacity(4).with_ttl_secs(1);
    let cache = EndpointCache::new("vh", config, scheduler.clone());

    let writer = {
        let cache = cache.clone();
        thread::spawn(move || {
            for round in 0..500u32 {
                cache.store_or_refresh(&peer((round % 6) as u8), &mut MockConnection::negotiated(b"s"));
            }
        })
    };
    let ticker = {
        let scheduler = scheduler.clone();
        thread::spawn(move || {
            for _ in 0..500 {
                scheduler.advance(std::time::Duration::from_millis(10));
            }
        })
    };
    writer.join().unwrap();
    ticker.join().unwrap();

    assert!(cache.len() <= 4);
    assert_eq!(scheduler.pending(), cache.len());
}
