//! Configuration types mapping to the TOML schema.
//!
//! ```toml
//! [defaults]
//! capacity = 10
//! ttl_secs = 3600
//! enabled = true
//!
//! [endpoint."api.example.com"]
//! capacity = 64
//! ttl_secs = 600
//!
//! [endpoint.internal]
//! enabled = false
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tls_resume::EndpointCacheConfig;

use crate::{ConfigError, Result};

/// Settings for one section. Unset fields fall through to the next layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EndpointSection {
    /// Maximum number of cached sessions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capacity: Option<usize>,

    /// Session lifetime in seconds (0 means the 3600s default).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl_secs: Option<u32>,

    /// Whether to cache sessions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

impl EndpointSection {
    /// Overlay `other` on top of this section (set fields in `other` win).
    pub fn merge(&mut self, other: &EndpointSection) {
        if other.capacity.is_some() {
            self.capacity = other.capacity;
        }
        if other.ttl_secs.is_some() {
            self.ttl_secs = other.ttl_secs;
        }
        if other.enabled.is_some() {
            self.enabled = other.enabled;
        }
    }

    /// Apply the set fields to a concrete config.
    pub fn apply(&self, mut config: EndpointCacheConfig) -> EndpointCacheConfig {
        if let Some(capacity) = self.capacity {
            config.capacity = capacity;
        }
        if let Some(ttl_secs) = self.ttl_secs {
            config.ttl_secs = ttl_secs;
        }
        if let Some(enabled) = self.enabled {
            config.enabled = enabled;
        }
        config
    }
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionCacheFile {
    /// Applied to every endpoint before its own section.
    pub defaults: EndpointSection,

    /// Per-endpoint sections keyed by endpoint name.
    #[serde(rename = "endpoint")]
    pub endpoints: BTreeMap<String, EndpointSection>,
}

impl SessionCacheFile {
    /// Create an empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Merge another config on top of this one (other takes priority).
    pub fn merge(&mut self, other: SessionCacheFile) {
        self.defaults.merge(&other.defaults);
        for (name, section) in other.endpoints {
            self.endpoints.entry(name).or_default().merge(&section);
        }
    }

    /// Effective configuration for `name`: built-in defaults, then
    /// `[defaults]`, then the endpoint's own section.
    pub fn resolve(&self, name: &str) -> EndpointCacheConfig {
        let config = self.defaults.apply(EndpointCacheConfig::default());
        match self.endpoints.get(name) {
            Some(section) => section.apply(config),
            None => config,
        }
    }

    /// Effective configuration of every named endpoint, in name order.
    pub fn endpoints(&self) -> Vec<(String, EndpointCacheConfig)> {
        self.endpoints
            .keys()
            .map(|name| (name.clone(), self.resolve(name)))
            .collect()
    }

    /// Reject configurations that can never cache anything while enabled.
    pub fn validate(&self) -> Result<()> {
        check("[defaults]", &self.defaults.apply(EndpointCacheConfig::default()))?;
        for (name, config) in self.endpoints() {
            check(&format!("endpoint '{name}'"), &config)?;
        }
        Ok(())
    }
}

fn check(section: &str, config: &EndpointCacheConfig) -> Result<()> {
    if config.enabled && config.capacity == 0 {
        return Err(ConfigError::Invalid {
            section: section.to_string(),
            reason: "capacity must be at least 1 when caching is enabled".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[defaults]
capacity = 20
ttl_secs = 1200

[endpoint."api.example.com"]
capacity = 64

[endpoint.internal]
enabled = false
"#;

    #[test]
    fn test_parse_sample() {
        let file = SessionCacheFile::from_toml(SAMPLE).unwrap();
        assert_eq!(file.defaults.capacity, Some(20));
        assert_eq!(file.endpoints.len(), 2);
        assert_eq!(file.endpoints["internal"].enabled, Some(false));
    }

    #[test]
    fn test_resolve_layers_defaults_and_endpoint() {
        let file = SessionCacheFile::from_toml(SAMPLE).unwrap();

        let api = file.resolve("api.example.com");
        assert_eq!(api.capacity, 64);
        assert_eq!(api.ttl_secs, 1200);
        assert!(api.enabled);

        let internal = file.resolve("internal");
        assert_eq!(internal.capacity, 20);
        assert!(!internal.enabled);

        let unknown = file.resolve("unlisted");
        assert_eq!(unknown.capacity, 20);
        assert_eq!(unknown.ttl_secs, 1200);
    }

    #[test]
    fn test_empty_config_uses_builtin_defaults() {
        let file = SessionCacheFile::from_toml("").unwrap();
        assert_eq!(file.resolve("any"), EndpointCacheConfig::default());
        assert!(file.endpoints().is_empty());
    }

    #[test]
    fn test_merge_field_by_field() {
        let mut base = SessionCacheFile::from_toml(SAMPLE).unwrap();
        let overlay = SessionCacheFile::from_toml(
            r#"
[defaults]
ttl_secs = 60

[endpoint."api.example.com"]
enabled = false

[endpoint.new]
capacity = 3
"#,
        )
        .unwrap();
        base.merge(overlay);

        assert_eq!(base.defaults.capacity, Some(20));
        assert_eq!(base.defaults.ttl_secs, Some(60));

        let api = base.resolve("api.example.com");
        assert_eq!(api.capacity, 64);
        assert!(!api.enabled);
        assert_eq!(base.resolve("new").capacity, 3);
    }

    #[test]
    fn test_validate_rejects_zero_capacity() {
        let file = SessionCacheFile::from_toml("[endpoint.bad]\ncapacity = 0\n").unwrap();
        let err = file.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref section, .. } if section == "endpoint 'bad'"));
    }

    #[test]
    fn test_validate_allows_zero_capacity_when_disabled() {
        let file =
            SessionCacheFile::from_toml("[endpoint.off]\ncapacity = 0\nenabled = false\n").unwrap();
        assert!(file.validate().is_ok());
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = SessionCacheFile::from_toml("[defaults]\nmax = 3\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_toml_roundtrip_keeps_meaning() {
        let file = SessionCacheFile::from_toml(SAMPLE).unwrap();
        let reparsed = SessionCacheFile::from_toml(&file.to_toml().unwrap()).unwrap();
        assert_eq!(reparsed, file);
    }
}
