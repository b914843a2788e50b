//! Config file loading and layering.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::{ConfigError, Result, SessionCacheFile};

/// Result of loading one or more config layers.
#[derive(Debug, Clone, Default)]
pub struct LoadedConfig {
    /// The merged configuration.
    pub config: SessionCacheFile,
    /// Files that existed and were merged, lowest precedence first.
    pub loaded_from: Vec<PathBuf>,
}

/// Load and validate config from a specific file path.
pub fn load_config_file(path: &Path) -> Result<SessionCacheFile> {
    let config = read_layer(path)?;
    config.validate()?;
    Ok(config)
}

/// Merge every existing file in `paths`, later files taking priority.
///
/// Missing files are skipped; unreadable or malformed ones are errors.
/// The merged result is validated once all layers are applied.
pub fn load_layered<I, P>(paths: I) -> Result<LoadedConfig>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    let mut loaded = LoadedConfig::default();

    for path in paths {
        let path = path.as_ref();
        if !path.exists() {
            debug!(path = %path.display(), "Session cache config layer not found, skipping");
            continue;
        }
        let layer = read_layer(path)?;
        debug!(
            path = %path.display(),
            endpoints = layer.endpoints.len(),
            "Loaded session cache config layer"
        );
        loaded.config.merge(layer);
        loaded.loaded_from.push(path.to_path_buf());
    }

    loaded.config.validate()?;
    Ok(loaded)
}

fn read_layer(path: &Path) -> Result<SessionCacheFile> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.display().to_string(),
        source: e,
    })?;
    SessionCacheFile::from_toml(&contents)
}
