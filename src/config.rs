//! Configuration module.
//!
//! Loads user defaults for tone parameters from a JSON file. Command line
//! options always take precedence over these values.

use crate::tone::{self, MAX_COUNT, MAX_FREQ};
use once_cell::sync::Lazy;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Overrides the config file location.
const CONFIG_ENV: &str = "BEEP_CONFIG";

/// `<config dir>/beep/config.json`, if the platform has a config dir.
static DEFAULT_CONFIG_PATH: Lazy<Option<PathBuf>> =
    Lazy::new(|| dirs::config_dir().map(|dir| dir.join("beep").join("config.json")));

/// User defaults for beeps.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BeepConfig {
    /// Frequency (Hz).
    #[serde(default = "default_frequency")]
    pub frequency_hz: f32,
    /// Tone length in milliseconds.
    #[serde(default = "default_length")]
    pub length_ms: u32,
    /// Number of repetitions.
    #[serde(default = "default_repetitions")]
    pub repetitions: u32,
    /// Delay between repetitions in milliseconds.
    #[serde(default = "default_delay")]
    pub delay_ms: u32,
    /// Also delay after the last repetition.
    #[serde(default)]
    pub end_delay: bool,
    /// Device to use instead of auto detection.
    #[serde(default)]
    pub device: Option<PathBuf>,
}

impl Default for BeepConfig {
    fn default() -> Self {
        Self {
            frequency_hz: tone::DEFAULT_FREQ as f32,
            length_ms: tone::DEFAULT_LENGTH,
            repetitions: tone::DEFAULT_REPS,
            delay_ms: tone::DEFAULT_DELAY,
            end_delay: false,
            device: None,
        }
    }
}

// Default value functions for serde
fn default_frequency() -> f32 {
    tone::DEFAULT_FREQ as f32
}
fn default_length() -> u32 {
    tone::DEFAULT_LENGTH
}
fn default_repetitions() -> u32 {
    tone::DEFAULT_REPS
}
fn default_delay() -> u32 {
    tone::DEFAULT_DELAY
}

impl BeepConfig {
    /// Replaces out of range values with the built-in defaults.
    fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        if !(self.frequency_hz > 0.0 && self.frequency_hz <= MAX_FREQ) {
            log::warn!("config: frequency {} out of range, using default", self.frequency_hz);
            self.frequency_hz = defaults.frequency_hz;
        }
        if self.length_ms > MAX_COUNT {
            log::warn!("config: length {} out of range, using default", self.length_ms);
            self.length_ms = defaults.length_ms;
        }
        if self.repetitions > MAX_COUNT {
            log::warn!("config: repetitions {} out of range, using default", self.repetitions);
            self.repetitions = defaults.repetitions;
        }
        if self.delay_ms > MAX_COUNT {
            log::warn!("config: delay {} out of range, using default", self.delay_ms);
            self.delay_ms = defaults.delay_ms;
        }
        self
    }

    /// Default frequency rounded to whole Hz.
    pub fn frequency(&self) -> u32 {
        (self.frequency_hz + 0.5) as u32
    }
}

/// Configuration manager.
pub struct ConfigManager {
    config_path: Option<PathBuf>,
}

impl ConfigManager {
    /// Creates a manager for `$BEEP_CONFIG`, or the per-user config file.
    pub fn new() -> Self {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::with_path(path),
            None => Self {
                config_path: DEFAULT_CONFIG_PATH.clone(),
            },
        }
    }

    /// Creates a manager for an explicit config file.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: Some(path.into()),
        }
    }

    /// Loads configuration from file.
    ///
    /// A missing file yields the defaults; a broken one yields the defaults
    /// and a warning.
    pub fn load(&self) -> BeepConfig {
        let Some(path) = &self.config_path else {
            return BeepConfig::default();
        };
        if !path.exists() {
            log::debug!("no config file at {}", path.display());
            return BeepConfig::default();
        }

        match fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str::<BeepConfig>(&content) {
                Ok(config) => {
                    log::debug!("loaded config from {}", path.display());
                    config.sanitized()
                }
                Err(e) => {
                    log::warn!("Failed to parse config: {}, using defaults", e);
                    BeepConfig::default()
                }
            },
            Err(e) => {
                log::warn!("Failed to read config: {}, using defaults", e);
                BeepConfig::default()
            }
        }
    }

    /// Returns the config file path.
    pub fn path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}
