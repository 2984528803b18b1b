use crate::cache::{CacheSpec, CacheSpecError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::LazyLock;
use thiserror::Error;
use tracing::debug;

/// Cache policy used when none is configured.
pub const DEFAULT_PATH_CACHE_SPEC: &str = "maximumSize=10000";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("Invalid filter path cache spec '{spec}': {source}")]
    CacheSpec {
        spec: String,
        #[source]
        source: CacheSpecError,
    },
}

/// Flags consulted while matching, plus the match cache policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// An empty child list on a non-terminal node grants the base view of the next level.
    pub filter_implicitly_include_base_fields: bool,
    /// Views matched at one level keep restricting the levels below it.
    pub filter_propagate_view_to_nested_filters: bool,
    pub filter_path_cache_spec: String,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            filter_implicitly_include_base_fields: true,
            filter_propagate_view_to_nested_filters: false,
            filter_path_cache_spec: DEFAULT_PATH_CACHE_SPEC.to_string(),
        }
    }
}

impl FilterConfig {
    pub fn with_implicit_base_fields(mut self, enabled: bool) -> Self {
        self.filter_implicitly_include_base_fields = enabled;
        self
    }

    pub fn with_view_propagation(mut self, enabled: bool) -> Self {
        self.filter_propagate_view_to_nested_filters = enabled;
        self
    }

    pub fn with_path_cache_spec(mut self, spec: impl Into<String>) -> Self {
        self.filter_path_cache_spec = spec.into();
        self
    }

    pub fn path_cache_spec(&self) -> Result<CacheSpec, ConfigError> {
        self.filter_path_cache_spec
            .parse()
            .map_err(|source| ConfigError::CacheSpec {
                spec: self.filter_path_cache_spec.clone(),
                source,
            })
    }
}

pub fn load_config(path: Option<&Path>) -> Result<FilterConfig, ConfigError> {
    if let Some(path) = path {
        load_config_from_path(path)
    } else {
        Ok(default_config().clone())
    }
}

pub fn load_config_from_path(path: &Path) -> Result<FilterConfig, ConfigError> {
    let path_display = path.display().to_string();
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path_display.clone(),
        source,
    })?;

    let config = toml::from_str::<FilterConfig>(&raw).map_err(|source| ConfigError::Parse {
        path: path_display,
        source,
    })?;

    // a bad cache spec fails at load time
    config.path_cache_spec()?;
    debug!(path = %path.display(), "loaded filter config");
    Ok(config)
}

pub fn default_config() -> &'static FilterConfig {
    static DEFAULT_CONFIG: LazyLock<FilterConfig> = LazyLock::new(FilterConfig::default);
    &DEFAULT_CONFIG
}
