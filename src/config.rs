//! Startup configuration.
//!
//! Every field has a working default, so the application runs with no
//! config at all. A JSON file named by `COSMOS_CONFIG` may override any
//! subset of fields; `GEMINI_API_KEY` and `COSMOS_AUDIO` override the oracle
//! key and the ambient track.
//!
//! ```json
//! { "field": { "stars": 20000 }, "audio": { "volume": 0.2 } }
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::audio::AudioConfig;
use crate::error::ConfigError;
use crate::field::FieldCounts;
use crate::focus::FramingConfig;
use crate::galaxy::GALAXY_COUNT;
use crate::nodes::LayoutConfig;
use crate::oracle::OracleConfig;

pub const CONFIG_ENV: &str = "COSMOS_CONFIG";
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";
pub const AUDIO_ENV: &str = "COSMOS_AUDIO";

/// Window settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub vsync: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Cosmos".to_string(),
            width: 1280,
            height: 800,
            vsync: true,
        }
    }
}

/// All tunables of a session.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct CosmosConfig {
    pub window: WindowConfig,
    pub field: FieldCounts,
    pub layout: LayoutConfig,
    pub framing: FramingConfig,
    pub oracle: OracleConfig,
    pub audio: AudioConfig,
    /// Theme catalog replacing the built-in one.
    pub themes: Option<PathBuf>,
}

impl CosmosConfig {
    /// Defaults, overlaid with the file in `COSMOS_CONFIG` and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match std::env::var_os(CONFIG_ENV) {
            Some(path) => {
                log::info!("Loading config from {}", Path::new(&path).display());
                Self::from_path(path)?
            }
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Apply environment overrides through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = lookup(API_KEY_ENV).filter(|k| !k.is_empty()) {
            self.oracle.api_key = Some(key);
        }
        if let Some(track) = lookup(AUDIO_ENV).filter(|t| !t.is_empty()) {
            self.audio.track = track;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.field.galaxies as usize != GALAXY_COUNT {
            return Err(ConfigError::Invalid(format!(
                "field.galaxies must be {}, got {}",
                GALAXY_COUNT, self.field.galaxies
            )));
        }
        let radii = [
            ("layout.orbit_radius", self.layout.orbit_radius),
            ("layout.node_radius", self.layout.node_radius),
            ("layout.core_radius", self.layout.core_radius),
        ];
        for (name, value) in radii {
            if !(value > 0.0 && value.is_finite()) {
                return Err(ConfigError::Invalid(format!("{} must be positive, got {}", name, value)));
            }
        }
        let rate = self.framing.transition_rate;
        if !(rate > 0.0 && rate <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "framing.transition_rate must be in (0, 1], got {}",
                rate
            )));
        }
        if !(0.0..=1.0).contains(&self.audio.volume) {
            return Err(ConfigError::Invalid(format!(
                "audio.volume must be in [0, 1], got {}",
                self.audio.volume
            )));
        }
        Ok(())
    }

    pub fn with_field(mut self, field: FieldCounts) -> Self {
        self.field = field;
        self
    }

    pub fn with_layout(mut self, layout: LayoutConfig) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_framing(mut self, framing: FramingConfig) -> Self {
        self.framing = framing;
        self
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.oracle.api_key = Some(key.into());
        self
    }

    pub fn with_volume(mut self, volume: f32) -> Self {
        self.audio.volume = volume;
        self
    }
}
