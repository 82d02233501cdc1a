//! Configuration file support for the exercise guide.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/tmj-guide/config.toml`.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Largest accepted wait multiplier
pub const MAX_TIME_SCALE: f64 = 100.0;

/// Longest accepted tick or auto-advance delay, in milliseconds
const MAX_STEP_MS: u64 = 60_000;

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub narration: NarrationConfig,

    #[serde(default)]
    pub pacing: PacingConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Which speech program narrates the session
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum EngineChoice {
    /// `say` on macOS, `espeak-ng` elsewhere
    Auto,
    EspeakNg,
    Say,
    None,
}

/// Narration configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NarrationConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_engine")]
    pub engine: EngineChoice,

    /// Language prefix used to pick a voice
    #[serde(default = "default_locale")]
    pub locale: String,

    /// Explicit voice name; overrides the automatic pick
    #[serde(default)]
    pub voice: Option<String>,

    #[serde(default = "default_rate")]
    pub rate: f32,

    #[serde(default = "default_pitch")]
    pub pitch: f32,

    #[serde(default = "default_volume")]
    pub volume: f32,
}

impl Default for NarrationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            engine: default_engine(),
            locale: default_locale(),
            voice: None,
            rate: default_rate(),
            pitch: default_pitch(),
            volume: default_volume(),
        }
    }
}

/// Pacing of the session timeline
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PacingConfig {
    #[serde(default = "default_auto_advance_ms")]
    pub auto_advance_ms: u64,

    #[serde(default = "default_breath_secs")]
    pub breath_secs: u64,

    #[serde(default = "default_movement_secs")]
    pub movement_secs: u64,

    #[serde(default = "default_rest_secs")]
    pub rest_secs: u64,

    /// Length of one countdown tick
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,

    /// Multiplier applied to every real wait; 0 disables waiting
    #[serde(default = "default_time_scale")]
    pub time_scale: f64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            auto_advance_ms: default_auto_advance_ms(),
            breath_secs: default_breath_secs(),
            movement_secs: default_movement_secs(),
            rest_secs: default_rest_secs(),
            tick_ms: default_tick_ms(),
            time_scale: default_time_scale(),
        }
    }
}

// Default value functions
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tmj-guide")
}

fn default_true() -> bool {
    true
}

fn default_engine() -> EngineChoice {
    EngineChoice::Auto
}

fn default_locale() -> String {
    "en".into()
}

fn default_rate() -> f32 {
    0.9
}

fn default_pitch() -> f32 {
    1.0
}

fn default_volume() -> f32 {
    0.8
}

fn default_auto_advance_ms() -> u64 {
    500
}

fn default_breath_secs() -> u64 {
    3
}

fn default_movement_secs() -> u64 {
    2
}

fn default_rest_secs() -> u64 {
    1
}

fn default_tick_ms() -> u64 {
    1000
}

fn default_time_scale() -> f64 {
    1.0
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!(
                "No config file found at {:?}, using defaults",
                config_path
            );
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tmj-guide")
            .join("config.toml")
    }

    /// Reject values the narrator or the clock cannot use
    pub fn validate(&self) -> Result<()> {
        let n = &self.narration;
        if !(0.1..=10.0).contains(&n.rate) {
            return Err(Error::Config(format!("narration.rate {} out of range 0.1..=10", n.rate)));
        }
        if !(0.0..=2.0).contains(&n.pitch) {
            return Err(Error::Config(format!("narration.pitch {} out of range 0..=2", n.pitch)));
        }
        if !(0.0..=1.0).contains(&n.volume) {
            return Err(Error::Config(format!("narration.volume {} out of range 0..=1", n.volume)));
        }
        let p = &self.pacing;
        if !(0.0..=MAX_TIME_SCALE).contains(&p.time_scale) {
            return Err(Error::Config(format!(
                "pacing.time_scale {} out of range 0..={}",
                p.time_scale, MAX_TIME_SCALE
            )));
        }
        if !(1..=MAX_STEP_MS).contains(&p.tick_ms) {
            return Err(Error::Config(format!(
                "pacing.tick_ms {} out of range 1..={}",
                p.tick_ms, MAX_STEP_MS
            )));
        }
        if p.auto_advance_ms > MAX_STEP_MS {
            return Err(Error::Config(format!(
                "pacing.auto_advance_ms {} out of range 0..={}",
                p.auto_advance_ms, MAX_STEP_MS
            )));
        }
        Ok(())
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.narration.enabled);
        assert_eq!(config.narration.engine, EngineChoice::Auto);
        assert_eq!(config.narration.rate, 0.9);
        assert_eq!(config.narration.volume, 0.8);
        assert_eq!(config.pacing.auto_advance_ms, 500);
        assert_eq!(config.pacing.breath_secs, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_roundtrip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("nested/config.toml");

        let mut config = Config::default();
        config.narration.voice = Some("Samantha".into());
        config.save_to(&path).unwrap();

        let parsed = Config::load_from(&path).unwrap();
        assert_eq!(parsed.narration.voice.as_deref(), Some("Samantha"));
        assert_eq!(parsed.pacing.tick_ms, config.pacing.tick_ms);
    }

    #[test]
    fn test_partial_config() {
        let toml_str = r#"
[narration]
engine = "espeak-ng"
rate = 1.2

[pacing]
time_scale = 0.0
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.narration.engine, EngineChoice::EspeakNg);
        assert_eq!(config.narration.rate, 1.2);
        assert_eq!(config.narration.pitch, 1.0); // default
        assert_eq!(config.pacing.time_scale, 0.0);
        assert_eq!(config.pacing.rest_secs, 1); // default
    }

    #[test]
    fn test_invalid_volume_rejected() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[narration]\nvolume = 3.0\n").unwrap();

        let result = Config::load_from(&path);
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_pacing_ranges_rejected() {
        let mut config = Config::default();
        config.pacing.tick_ms = 0;
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let mut config = Config::default();
        config.pacing.auto_advance_ms = 3_600_000;
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        for scale in [-1.0, 1e300, f64::INFINITY, f64::NAN] {
            let mut config = Config::default();
            config.pacing.time_scale = scale;
            assert!(
                matches!(config.validate(), Err(Error::Config(_))),
                "time_scale {} accepted",
                scale
            );
        }

        let mut config = Config::default();
        config.pacing.time_scale = 0.0;
        config.pacing.auto_advance_ms = 0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_malformed_toml_is_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[pacing\nrest_secs = ").unwrap();

        assert!(matches!(Config::load_from(&path), Err(Error::Toml(_))));
    }
}
