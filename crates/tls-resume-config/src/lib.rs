//! Configuration file for tls-resume endpoint session caches.
//!
//! Provides TOML-based configuration with:
//! - A `[defaults]` section applied to every endpoint
//! - Per-endpoint overrides (`[endpoint."api.example.com"]`)
//! - Layering of several files, later files overriding earlier ones field by field

pub mod error;
pub mod file;
pub mod loader;

pub use error::{ConfigError, Result};
pub use file::{EndpointSection, SessionCacheFile};
pub use loader::{LoadedConfig, load_config_file, load_layered};
