//! # Configuration Module
//!
//! Runtime settings for audio capture, the YIN detector and the display loop,
//! stored as JSON. Missing fields fall back to their defaults, so a config
//! file only needs to list what it changes.
//!
//! The musical constants (A4 = 440 Hz, the 50-5000 Hz band, the 0.02
//! loudness gate and the 6 cent lock-in band) are fixed and live next to the
//! code that uses them, not here.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable that overrides the config file location.
pub const CONFIG_ENV_VAR: &str = "XENOLUX_CONFIG";

/// Config file used when the environment variable is not set.
pub const DEFAULT_CONFIG_FILE: &str = "xenolux.json";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Top-level settings object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TunerConfig {
    pub audio: AudioConfig,
    pub detector: DetectorConfig,
    pub display: DisplayConfig,
}

/// Audio capture settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Samples per analysis frame. Must be a power of two.
    pub buffer_size: usize,
    /// Preferred input sample rate in Hz
    pub target_sample_rate: u32,
    /// Exponential smoothing applied to the loudness level (0 = none)
    pub level_smoothing: f32,
    /// Frames buffered between the capture callback and the model
    pub frame_queue: usize,
    /// How long the unlock waits for the device to start before giving up
    pub start_timeout_ms: u64,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            buffer_size: 2048,
            target_sample_rate: 44100,
            level_smoothing: 0.0,
            frame_queue: 8,
            start_timeout_ms: 3000,
        }
    }
}

/// YIN pitch detector settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Minimum RMS for a frame to be analysed at all
    pub amplitude_threshold: f32,
    /// Maximum normalized difference accepted as a clear period
    pub clarity_threshold: f32,
    /// How far above the global minimum the first dip may sit
    pub dip_margin: f32,
    /// Refine the YIN estimate from the magnitude spectrum
    pub refine_with_spectrum: bool,
    /// How long one inference waits for audio before reporting no pitch
    pub idle_timeout_ms: u64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            amplitude_threshold: 0.01,
            clarity_threshold: 0.1,
            dip_margin: 0.05,
            refine_with_spectrum: true,
            idle_timeout_ms: 100,
        }
    }
}

/// Render loop and animation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Interval between frame ticks
    pub frame_interval_ms: u64,
    /// Fraction of the remaining distance the pitch ring covers each frame
    pub ring_smoothing: f32,
    /// Rotation of the pitch ring per frame in radians
    pub rotation_step: f32,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            frame_interval_ms: 16,
            ring_smoothing: 0.35,
            rotation_step: 0.05,
        }
    }
}

impl TunerConfig {
    /// Path from `$XENOLUX_CONFIG`, or `./xenolux.json`.
    pub fn default_path() -> PathBuf {
        std::env::var_os(CONFIG_ENV_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
    }

    /// Reads and validates a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let data = fs::read_to_string(path)?;
        let config: TunerConfig = serde_json::from_str(&data)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `path` if it exists. Falls back to defaults when it is missing
    /// or unusable, logging why.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            log::info!("No config at {}, using defaults", path.display());
            return Self::default();
        }
        match Self::load(path) {
            Ok(config) => {
                log::info!("Loaded config from {}", path.display());
                config
            }
            Err(e) => {
                log::warn!("Ignoring config {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Writes the config as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let audio = &self.audio;
        if audio.buffer_size < 256 || !audio.buffer_size.is_power_of_two() {
            return Err(ConfigError::Invalid(format!(
                "audio.buffer_size must be a power of two >= 256, got {}",
                audio.buffer_size
            )));
        }
        if audio.target_sample_rate == 0 {
            return Err(ConfigError::Invalid("audio.target_sample_rate must be positive".into()));
        }
        if !(0.0..1.0).contains(&audio.level_smoothing) {
            return Err(ConfigError::Invalid("audio.level_smoothing must be in [0, 1)".into()));
        }
        if audio.frame_queue == 0 {
            return Err(ConfigError::Invalid("audio.frame_queue must be at least 1".into()));
        }
        if audio.start_timeout_ms == 0 {
            return Err(ConfigError::Invalid("audio.start_timeout_ms must be positive".into()));
        }

        let detector = &self.detector;
        if !(0.0..=1.0).contains(&detector.amplitude_threshold) {
            return Err(ConfigError::Invalid("detector.amplitude_threshold must be in [0, 1]".into()));
        }
        if !(detector.clarity_threshold > 0.0 && detector.clarity_threshold < 1.0) {
            return Err(ConfigError::Invalid("detector.clarity_threshold must be in (0, 1)".into()));
        }
        if !(0.0..1.0).contains(&detector.dip_margin) {
            return Err(ConfigError::Invalid("detector.dip_margin must be in [0, 1)".into()));
        }
        if detector.idle_timeout_ms == 0 {
            return Err(ConfigError::Invalid("detector.idle_timeout_ms must be positive".into()));
        }

        let display = &self.display;
        if display.frame_interval_ms == 0 {
            return Err(ConfigError::Invalid("display.frame_interval_ms must be positive".into()));
        }
        if !(display.ring_smoothing > 0.0 && display.ring_smoothing <= 1.0) {
            return Err(ConfigError::Invalid("display.ring_smoothing must be in (0, 1]".into()));
        }
        if !display.rotation_step.is_finite() {
            return Err(ConfigError::Invalid("display.rotation_step must be finite".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        TunerConfig::default().validate().unwrap();
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "audio": {{ "buffer_size": 4096 }}, "display": {{ "ring_smoothing": 1.0 }} }}"#).unwrap();

        let config = TunerConfig::load(file.path()).unwrap();
        assert_eq!(config.audio.buffer_size, 4096);
        assert_eq!(config.audio.target_sample_rate, 44100);
        assert_eq!(config.display.ring_smoothing, 1.0);
        assert_eq!(config.detector, DetectorConfig::default());
    }

    #[test]
    fn rejects_bad_buffer_size() {
        let mut config = TunerConfig::default();
        config.audio.buffer_size = 3000;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn rejects_bad_clarity_threshold() {
        let mut config = TunerConfig::default();
        config.detector.clarity_threshold = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();

        assert!(matches!(TunerConfig::load(file.path()), Err(ConfigError::Parse(_))));
        assert_eq!(TunerConfig::load_or_default(file.path()), TunerConfig::default());
    }

    #[test]
    fn missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = TunerConfig::load_or_default(dir.path().join("absent.json"));
        assert_eq!(config, TunerConfig::default());
    }

    #[test]
    fn saved_config_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("xenolux.json");
        let mut config = TunerConfig::default();
        config.detector.refine_with_spectrum = false;
        config.display.frame_interval_ms = 33;

        config.save(&path).unwrap();
        assert_eq!(TunerConfig::load(&path).unwrap(), config);
    }
}
