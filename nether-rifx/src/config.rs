//! Resolver configuration
//!
//! ```toml
//! cache_chunks = true
//! max_nesting = 8
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{Result, RifxError};

/// How a [`Resolver`](crate::Resolver) decodes and keeps chunks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Keep each decoded chunk for the resolver's lifetime (default: true)
    #[serde(default = "default_cache_chunks")]
    pub cache_chunks: bool,
    /// Deepest allowed chain of nested RIFX containers (default: 8)
    #[serde(default = "default_max_nesting")]
    pub max_nesting: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            cache_chunks: default_cache_chunks(),
            max_nesting: default_max_nesting(),
        }
    }
}

impl ResolverConfig {
    /// Parse a config from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| RifxError::Config(e.to_string()))
    }

    /// Same settings with caching turned off
    pub fn uncached() -> Self {
        Self {
            cache_chunks: false,
            ..Self::default()
        }
    }
}

fn default_cache_chunks() -> bool {
    true
}

fn default_max_nesting() -> usize {
    8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ResolverConfig::default();
        assert!(config.cache_chunks);
        assert_eq!(config.max_nesting, 8);
        assert!(!ResolverConfig::uncached().cache_chunks);
    }

    #[test]
    fn test_from_toml() {
        let config = ResolverConfig::from_toml_str("max_nesting = 2").unwrap();
        assert_eq!(config.max_nesting, 2);
        assert!(config.cache_chunks);

        assert!(matches!(
            ResolverConfig::from_toml_str("cache_chunks = \"yes\""),
            Err(RifxError::Config(_))
        ));
    }
}
