//! Loading `EngineConfig` from TOML.

use std::path::Path;

use tracing::debug;

use decree_contracts::{
    config::EngineConfig,
    error::{PolicyError, PolicyResult},
};

/// Parse `s` as an engine configuration. Missing keys take their defaults.
pub fn load_engine_config(s: &str) -> PolicyResult<EngineConfig> {
    let config: EngineConfig = toml::from_str(s).map_err(|e| PolicyError::ConfigError {
        reason: format!("failed to parse engine config TOML: {}", e),
    })?;
    debug!(
        preferred_scope = ?config.preferred_scope,
        static_sort_threshold = config.static_sort_threshold,
        "loaded engine config"
    );
    Ok(config)
}

pub fn load_engine_config_file(path: &Path) -> PolicyResult<EngineConfig> {
    let contents = std::fs::read_to_string(path).map_err(|e| PolicyError::ConfigError {
        reason: format!("failed to read engine config '{}': {}", path.display(), e),
    })?;
    load_engine_config(&contents)
}
