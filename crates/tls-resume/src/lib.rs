//! Per-endpoint TLS session resumption cache.
//!
//! When a connection finishes a full handshake the negotiated session is
//! stored under a key derived from the endpoint name and the numeric peer
//! address, so the next connection to the same peer can resume it. Each
//! endpoint cache provides:
//! - LRU eviction with a hard entry-count bound
//! - Per-entry TTL expiry driven by an external scheduler
//! - A single mutex per endpoint guarding every lookup and mutation
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tls_resume::{EndpointCache, EndpointCacheConfig, PeerIdentity, TokioScheduler};
//!
//! let scheduler = Arc::new(TokioScheduler::try_current()?);
//! let config = EndpointCacheConfig::default()
//!     .with_capacity(64)
//!     .with_ttl_secs(600);
//! let cache = EndpointCache::new("api.example.com", config, scheduler);
//!
//! if !cache.try_reuse(&peer, &mut conn) {
//!     // full handshake
//! }
//! cache.store_or_refresh(&peer, &mut conn);
//! ```

mod cache;
mod config;
mod error;
mod key;
mod registry;
mod scheduler;
mod session;
mod store;

pub use cache::{CacheStats, EndpointCache};
pub use config::{DEFAULT_CAPACITY, DEFAULT_TTL_SECS, EndpointCacheConfig, effective_ttl_secs};
pub use error::{Error, Result};
pub use key::{KEY_CAPACITY, MAX_KEY_LEN, PeerIdentity, SessionKey};
pub use registry::SessionCaches;
pub use scheduler::{ExpiryCallback, ExpiryScheduler, ManualScheduler, TimerHandle, TokioScheduler};
pub use session::{SessionError, SessionPayload, TlsConnection};
pub use store::EntryId;
