//! Configuration file support for Morning Practice.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/morning-practice/config.toml`.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub voice: VoiceConfig,

    #[serde(default)]
    pub chime: ChimeConfig,
}

/// Session pacing
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SessionConfig {
    #[serde(default = "default_exercise_count")]
    pub exercise_count: usize,

    #[serde(default = "default_warm_up_seconds")]
    pub warm_up_seconds: u32,

    #[serde(default = "default_exercise_seconds")]
    pub exercise_seconds: u32,

    #[serde(default = "default_cool_down_seconds")]
    pub cool_down_seconds: u32,

    /// Wall-clock length of one countdown second
    #[serde(default = "default_tick_millis")]
    pub tick_millis: u64,

    #[serde(default)]
    pub start_muted: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            exercise_count: default_exercise_count(),
            warm_up_seconds: default_warm_up_seconds(),
            exercise_seconds: default_exercise_seconds(),
            cool_down_seconds: default_cool_down_seconds(),
            tick_millis: default_tick_millis(),
            start_muted: false,
        }
    }
}

impl SessionConfig {
    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_millis)
    }
}

/// Narration parameters
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct VoiceConfig {
    #[serde(default = "default_rate")]
    pub rate: f32,

    #[serde(default = "default_pitch")]
    pub pitch: f32,

    #[serde(default = "default_volume")]
    pub volume: f32,

    /// Language tag such as `en-US`; the environment locale when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,

    /// Substrings in a voice name that mark the preferred voice
    #[serde(default = "default_gender_markers")]
    pub gender_markers: Vec<String>,

    /// Speech synthesizer command (`espeak` or `espeak-ng`)
    #[serde(default = "default_speech_command")]
    pub command: String,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            rate: default_rate(),
            pitch: default_pitch(),
            volume: default_volume(),
            locale: None,
            gender_markers: default_gender_markers(),
            command: default_speech_command(),
        }
    }
}

impl VoiceConfig {
    /// Configured locale, falling back to the process environment
    pub fn effective_locale(&self) -> String {
        self.locale.clone().unwrap_or_else(system_locale)
    }
}

/// Chime tone parameters
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ChimeConfig {
    #[serde(default = "default_frequency_hz")]
    pub frequency_hz: f32,

    #[serde(default = "default_peak_gain")]
    pub peak_gain: f32,

    #[serde(default = "default_attack_seconds")]
    pub attack_seconds: f32,

    #[serde(default = "default_duration_seconds")]
    pub duration_seconds: f32,

    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
}

impl Default for ChimeConfig {
    fn default() -> Self {
        Self {
            frequency_hz: default_frequency_hz(),
            peak_gain: default_peak_gain(),
            attack_seconds: default_attack_seconds(),
            duration_seconds: default_duration_seconds(),
            sample_rate: default_sample_rate(),
        }
    }
}

// Default value functions
fn default_exercise_count() -> usize {
    10
}

fn default_warm_up_seconds() -> u32 {
    60
}

fn default_exercise_seconds() -> u32 {
    30
}

fn default_cool_down_seconds() -> u32 {
    60
}

fn default_tick_millis() -> u64 {
    1000
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

fn default_gender_markers() -> Vec<String> {
    vec!["female".into(), "woman".into(), "girl".into()]
}

fn default_speech_command() -> String {
    "espeak".into()
}

fn default_frequency_hz() -> f32 {
    432.0
}

fn default_peak_gain() -> f32 {
    0.3
}

fn default_attack_seconds() -> f32 {
    0.1
}

fn default_duration_seconds() -> f32 {
    2.0
}

fn default_sample_rate() -> u32 {
    48_000
}

/// Locale from `LC_ALL`, `LC_MESSAGES` or `LANG`, as a language tag
///
/// `en_US.UTF-8` becomes `en-US`. Returns `en` when nothing usable is set.
pub fn system_locale() -> String {
    ["LC_ALL", "LC_MESSAGES", "LANG"]
        .iter()
        .filter_map(|key| std::env::var(key).ok())
        .find_map(|value| locale_to_tag(&value))
        .unwrap_or_else(|| "en".to_string())
}

fn locale_to_tag(value: &str) -> Option<String> {
    let base = value.split(['.', '@']).next().unwrap_or_default().trim();
    if base.is_empty() || base == "C" || base == "POSIX" {
        return None;
    }
    Some(base.replace('_', "-"))
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
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
        let base = dirs::config_dir().unwrap_or_else(|| {
            std::env::var_os("HOME")
                .map(|home| PathBuf::from(home).join(".config"))
                .unwrap_or_else(|| PathBuf::from("."))
        });
        base.join("morning-practice").join("config.toml")
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }

    /// Check value ranges; the first problem found is returned
    pub fn validate(&self) -> Result<()> {
        let session = &self.session;
        if session.exercise_count == 0 {
            return Err(Error::Config("exercise_count must be at least 1".into()));
        }
        for (name, value) in [
            ("warm_up_seconds", session.warm_up_seconds),
            ("exercise_seconds", session.exercise_seconds),
            ("cool_down_seconds", session.cool_down_seconds),
        ] {
            if value == 0 {
                return Err(Error::Config(format!("{} must be at least 1", name)));
            }
        }
        if session.tick_millis == 0 {
            return Err(Error::Config("tick_millis must be at least 1".into()));
        }

        let voice = &self.voice;
        if !(voice.rate > 0.0 && voice.rate <= 10.0) {
            return Err(Error::Config(format!(
                "voice rate {} is outside (0, 10]",
                voice.rate
            )));
        }
        if !(0.0..=2.0).contains(&voice.pitch) {
            return Err(Error::Config(format!(
                "voice pitch {} is outside [0, 2]",
                voice.pitch
            )));
        }
        if !(0.0..=1.0).contains(&voice.volume) {
            return Err(Error::Config(format!(
                "voice volume {} is outside [0, 1]",
                voice.volume
            )));
        }
        if voice.command.trim().is_empty() {
            return Err(Error::Config("voice command must not be empty".into()));
        }

        let chime = &self.chime;
        if chime.frequency_hz <= 0.0 {
            return Err(Error::Config("chime frequency_hz must be positive".into()));
        }
        if chime.sample_rate == 0 {
            return Err(Error::Config("chime sample_rate must be positive".into()));
        }
        if !(0.0..=1.0).contains(&chime.peak_gain) {
            return Err(Error::Config(format!(
                "chime peak_gain {} is outside [0, 1]",
                chime.peak_gain
            )));
        }
        if chime.attack_seconds < 0.0 || chime.attack_seconds >= chime.duration_seconds {
            return Err(Error::Config(
                "chime attack_seconds must be non-negative and shorter than duration_seconds"
                    .into(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.session.exercise_count, 10);
        assert_eq!(config.session.warm_up_seconds, 60);
        assert_eq!(config.session.exercise_seconds, 30);
        assert_eq!(config.session.cool_down_seconds, 60);
        assert_eq!(config.session.tick_period(), Duration::from_secs(1));
        assert_eq!(config.chime.frequency_hz, 432.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_roundtrip() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();

        assert_eq!(config, parsed);
    }

    #[test]
    fn test_partial_config() {
        let toml_str = r#"
[session]
exercise_count = 4

[voice]
locale = "fr-FR"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.session.exercise_count, 4);
        assert_eq!(config.session.exercise_seconds, 30); // default
        assert_eq!(config.voice.effective_locale(), "fr-FR");
        assert_eq!(config.voice.rate, 0.9); // default
    }

    #[test]
    fn test_validate_rejects_zero_durations() {
        let mut config = Config::default();
        config.session.exercise_seconds = 0;
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let mut config = Config::default();
        config.session.tick_millis = 0;
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let mut config = Config::default();
        config.session.exercise_count = 0;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_rejects_bad_chime_envelope() {
        let mut config = Config::default();
        config.chime.attack_seconds = 3.0;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_save_and_load_from_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.session.exercise_count = 6;
        config.voice.locale = Some("de-DE".into());
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_from_rejects_invalid_values() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[session]\nwarm_up_seconds = 0\n").unwrap();

        assert!(matches!(Config::load_from(&path), Err(Error::Config(_))));
    }

    #[test]
    fn test_locale_to_tag() {
        assert_eq!(locale_to_tag("en_US.UTF-8"), Some("en-US".into()));
        assert_eq!(locale_to_tag("de_DE@euro"), Some("de-DE".into()));
        assert_eq!(locale_to_tag("C"), None);
        assert_eq!(locale_to_tag(""), None);
    }
}
