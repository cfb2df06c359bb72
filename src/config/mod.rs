// Configuration module

mod route;
mod server;

pub use route::{RouteConfig, RouteKind};
pub use server::ServerConfig;

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

use crate::cache::CacheConfig;
use crate::image::ImageLimits;
use crate::logging::LoggingConfig;
use crate::proxy::special_endpoints::{HEALTH_PATH, METRICS_PATH};

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {error}")]
    Read {
        path: String,
        #[source]
        error: std::io::Error,
    },

    #[error("Environment variable '{name}' is referenced but not set")]
    MissingEnvVar { name: String },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Size limits for sources, resize targets and rotated stamps
    #[serde(default)]
    pub images: ImageLimits,
    /// Report swallowed rendering and cache errors
    #[serde(default)]
    pub debug: bool,
    #[serde(default)]
    pub routes: Vec<RouteConfig>,
}

impl Config {
    pub fn from_yaml_with_env(yaml: &str) -> Result<Self, ConfigError> {
        // Replace ${VAR_NAME} with environment variable values
        let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        let mut missing = None;
        let substituted = re.replace_all(yaml, |caps: &regex::Captures| {
            let name = &caps[1];
            std::env::var(name).unwrap_or_else(|_| {
                missing.get_or_insert_with(|| name.to_string());
                String::new()
            })
        });
        if let Some(name) = missing {
            return Err(ConfigError::MissingEnvVar { name });
        }

        Ok(serde_yaml::from_str(&substituted)?)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|error| ConfigError::Read {
            path: path.display().to_string(),
            error,
        })?;
        Self::from_yaml_with_env(&yaml)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.address.is_empty() {
            return Err(invalid("server.address cannot be empty"));
        }
        if self.server.port == 0 {
            return Err(invalid("server.port must be greater than 0"));
        }
        if self.server.threads == 0 {
            return Err(invalid("server.threads must be greater than 0"));
        }

        if self.cache.enabled && self.cache.dir.as_os_str().is_empty() {
            return Err(invalid("cache.dir cannot be empty when the cache is enabled"));
        }

        let limits = &self.images;
        if limits.max_width == 0
            || limits.max_height == 0
            || limits.max_source_width == 0
            || limits.max_source_height == 0
            || limits.max_pixels == 0
        {
            return Err(invalid("images limits must be greater than 0"));
        }

        let level = self.logging.level.to_ascii_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(invalid(format!(
                "logging.level '{}' must be one of {}",
                self.logging.level,
                LOG_LEVELS.join(", ")
            )));
        }

        let mut seen_paths = HashSet::new();
        for route in &self.routes {
            if !route.path.starts_with('/') {
                return Err(invalid(format!(
                    "Route path '{}' does not start with /",
                    route.path
                )));
            }

            if route.path == HEALTH_PATH || route.path == METRICS_PATH {
                return Err(invalid(format!(
                    "Route path '{}' is reserved for a built-in endpoint",
                    route.path
                )));
            }

            if !seen_paths.insert(route.path.as_str()) {
                return Err(invalid(format!("Duplicate route path '{}'", route.path)));
            }

            if route.image.as_os_str().is_empty() {
                return Err(invalid(format!("Route '{}' has an empty image", route.path)));
            }

            if route.stamp.as_os_str().is_empty() {
                return Err(invalid(format!("Route '{}' has an empty stamp", route.path)));
            }

            if matches!(route.transformation.width(), Some(0))
                || matches!(route.transformation.height(), Some(0))
            {
                return Err(invalid(format!(
                    "Route '{}' has a zero transformation dimension",
                    route.path
                )));
            }

            if route.transformation.width().unwrap_or(0) > limits.max_width
                || route.transformation.height().unwrap_or(0) > limits.max_height
            {
                return Err(invalid(format!(
                    "Route '{}' resizes the stamp beyond images.max_width x images.max_height ({}x{})",
                    route.path, limits.max_width, limits.max_height
                )));
            }
        }

        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid(message.into())
}
