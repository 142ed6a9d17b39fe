//! Replay configuration (reprise.toml)

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Slowest accepted playback rate.
pub const MIN_SPEED: f64 = 0.1;
/// Fastest accepted playback rate.
pub const MAX_SPEED: f64 = 16.0;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("playback speed must be a positive number, got {0}")]
    InvalidSpeed(f64),

    #[error("frame duration must be at least 1ms")]
    InvalidFrameDuration,
}

/// Replay engine options
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReplayConfig {
    /// Batch mutations in a virtual tree and reconcile once per frame
    #[serde(default = "default_true")]
    pub use_virtual_dom: bool,
    /// Playback rate multiplier, clamped to `[MIN_SPEED, MAX_SPEED]`
    #[serde(default = "default_speed")]
    pub speed: f64,
    /// Restart from the beginning when playback reaches the end
    #[serde(default)]
    pub loop_playback: bool,
    /// Virtual time covered by one `tick()` at 1x
    #[serde(default = "default_frame_duration")]
    pub frame_duration_ms: u64,
}

fn default_true() -> bool {
    true
}

fn default_speed() -> f64 {
    1.0
}

fn default_frame_duration() -> u64 {
    16
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            use_virtual_dom: default_true(),
            speed: default_speed(),
            loop_playback: false,
            frame_duration_ms: default_frame_duration(),
        }
    }
}

impl ReplayConfig {
    /// Config for tests: no loop, normal speed.
    pub fn testing() -> Self {
        Self::default()
    }

    /// Config for interactive viewing.
    pub fn interactive() -> Self {
        Self {
            loop_playback: true,
            ..Self::default()
        }
    }

    pub fn with_virtual_dom(mut self, enabled: bool) -> Self {
        self.use_virtual_dom = enabled;
        self
    }

    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = speed;
        self
    }

    pub fn with_loop(mut self, loop_playback: bool) -> Self {
        self.loop_playback = loop_playback;
        self
    }

    pub fn with_frame_duration(mut self, ms: u64) -> Self {
        self.frame_duration_ms = ms;
        self
    }

    /// Speed as the engine uses it.
    pub fn effective_speed(&self) -> f64 {
        clamp_speed(self.speed)
    }

    /// Reject values the engine cannot use.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.speed.is_finite() || self.speed <= 0.0 {
            return Err(ConfigError::InvalidSpeed(self.speed));
        }
        if self.frame_duration_ms == 0 {
            return Err(ConfigError::InvalidFrameDuration);
        }
        Ok(())
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: ReplayConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a file, or from `reprise.toml` inside a directory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let config_path = if path.is_dir() {
            path.join("reprise.toml")
        } else {
            path.to_path_buf()
        };

        let content = fs::read_to_string(&config_path).map_err(|source| ConfigError::Io {
            path: config_path.clone(),
            source,
        })?;
        let config = Self::from_toml_str(&content)?;
        tracing::debug!(path = %config_path.display(), ?config, "loaded replay config");
        Ok(config)
    }

    /// Serialize to a TOML string
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// Clamp a playback rate into the supported range.
pub fn clamp_speed(speed: f64) -> f64 {
    if speed.is_nan() {
        return 1.0;
    }
    speed.clamp(MIN_SPEED, MAX_SPEED)
}
