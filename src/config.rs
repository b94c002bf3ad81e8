//! Graph configuration, loadable from TOML.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::graph::TraversalOrder;

/// Tunables for a [`FamilyGraph`](crate::graph::FamilyGraph).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GraphConfig {
    /// Maximum memoized relationship lookups. Zero disables the cache.
    pub query_cache_size: usize,
    /// Path bound used when a path query does not set one.
    pub default_max_path_length: usize,
    /// Path bound for the all-paths step of relationship calculation.
    pub relationship_max_path_length: usize,
    /// Attach the in-memory metrics collector on build.
    pub collect_metrics: bool,
    /// Walk order for ancestor and descendant collection.
    pub lineage_order: TraversalOrder,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            query_cache_size: 1000,
            default_max_path_length: 10,
            relationship_max_path_length: 10,
            collect_metrics: true,
            lineage_order: TraversalOrder::BreadthFirst,
        }
    }
}

impl GraphConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io { source })?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_max_path_length == 0 {
            return Err(ConfigError::Invalid {
                message: "default_max_path_length must be at least 1".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = GraphConfig::default();
        assert_eq!(config.query_cache_size, 1000);
        assert_eq!(config.default_max_path_length, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = GraphConfig::from_toml_str("query_cache_size = 5\nlineage_order = \"depth_first\"\n").unwrap();
        assert_eq!(config.query_cache_size, 5);
        assert_eq!(config.lineage_order, TraversalOrder::DepthFirst);
        assert_eq!(config.relationship_max_path_length, 10);
    }

    #[test]
    fn rejects_unknown_keys_and_bad_values() {
        assert!(matches!(
            GraphConfig::from_toml_str("cache = 1"),
            Err(ConfigError::Parse { .. })
        ));
        assert!(matches!(
            GraphConfig::from_toml_str("default_max_path_length = 0"),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn round_trips_through_toml() {
        let config = GraphConfig {
            collect_metrics: false,
            ..GraphConfig::default()
        };
        let text = config.to_toml_string().unwrap();
        assert_eq!(GraphConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("gedgraph.toml");
        std::fs::write(&path, "relationship_max_path_length = 4\n").unwrap();
        let config = GraphConfig::load(&path).unwrap();
        assert_eq!(config.relationship_max_path_length, 4);
        assert!(matches!(
            GraphConfig::load(&dir.path().join("missing.toml")),
            Err(ConfigError::Io { .. })
        ));
    }
}
