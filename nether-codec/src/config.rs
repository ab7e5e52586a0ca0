//! Audio rendering configuration
//!
//! Loaded from a TOML table; every field falls back to its default when absent.
//!
//! ```toml
//! target_rate = 44100
//! playback_buffer = 4096
//! interpolation = "linear"
//! ```

use serde::{Deserialize, Serialize};

use crate::pcm::Interpolation;
use crate::{CodecError, PLAYBACK_BUFFER, RESAMPLE_RATE, Result};

/// Settings for turning archive sounds into playback buffers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Output rate for resampled sounds (default: 44100)
    #[serde(default = "default_target_rate")]
    pub target_rate: u32,
    /// Playback chunk size in frames; output is padded to a multiple (default: 4096)
    #[serde(default = "default_playback_buffer")]
    pub playback_buffer: usize,
    /// Interpolation used when resampling (default: linear)
    #[serde(default)]
    pub interpolation: Interpolation,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            target_rate: default_target_rate(),
            playback_buffer: default_playback_buffer(),
            interpolation: Interpolation::default(),
        }
    }
}

impl AudioConfig {
    /// Parse a config from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| CodecError::Config(e.to_string()))
    }
}

fn default_target_rate() -> u32 {
    RESAMPLE_RATE
}

fn default_playback_buffer() -> usize {
    PLAYBACK_BUFFER
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AudioConfig::default();
        assert_eq!(config.target_rate, 44100);
        assert_eq!(config.playback_buffer, 4096);
        assert_eq!(config.interpolation, Interpolation::Linear);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = AudioConfig::from_toml_str("interpolation = \"step\"\n").unwrap();
        assert_eq!(config.interpolation, Interpolation::Step);
        assert_eq!(config.target_rate, 44100);

        let config = AudioConfig::from_toml_str("").unwrap();
        assert_eq!(config, AudioConfig::default());
    }

    #[test]
    fn test_invalid_toml() {
        let result = AudioConfig::from_toml_str("interpolation = \"sinc\"");
        assert!(matches!(result, Err(CodecError::Config(_))));
    }
}
