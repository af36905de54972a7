use std::{fs, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const CONFIG_FILE: &str = "signspeak.toml";

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub camera: CameraConfig,
    pub speech: SpeechConfig,
    /// Directory the ONNX and whisper models are stored in.
    pub model_dir: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub width: u32,
    pub height: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    /// BCP-47 language tag used for both synthesis and recognition.
    pub language: String,
    /// Speaking rate as a multiple of the platform's normal rate.
    pub rate: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            camera: CameraConfig::default(),
            speech: SpeechConfig::default(),
            model_dir: "models".to_string(),
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
        }
    }
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            language: "ar".to_string(),
            rate: 0.9,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("failed to parse config {}", path.display()))
    }

    /// Load the config file if present, otherwise fall back to defaults.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match Self::load(path) {
            Ok(config) => config,
            Err(err) => {
                log::warn!("ignoring invalid config {}: {err:#}", path.display());
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)
            .with_context(|| format!("failed to write config {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_shipped_capture_and_speech_settings() {
        let config = Config::default();
        assert_eq!((config.camera.width, config.camera.height), (640, 480));
        assert_eq!(config.speech.language, "ar");
        assert!((config.speech.rate - 0.9).abs() < f32::EPSILON);
    }

    #[test]
    fn partial_config_fills_in_defaults() {
        let config: Config = toml::from_str("[camera]\nwidth = 1280\n").unwrap();
        assert_eq!(config.camera.width, 1280);
        assert_eq!(config.camera.height, 480);
        assert_eq!(config.model_dir, "models");
    }
}
