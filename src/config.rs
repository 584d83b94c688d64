//! Configuration management for nownext-rs.
//!
//! Loads config from YAML files in standard locations. Every section has
//! working defaults so the board runs with no config file at all.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Data directory for durable board state. Empty means
    /// `~/.nownext-board`.
    pub data_dir: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Path to a JSON symbol catalog. Empty means the built-in set.
    pub symbols_path: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    /// Playback mechanism: "clips" or "synth". The two are exclusive.
    pub mode: String,
    /// Announce the shown symbol on selection and navigation.
    pub auto_announce: bool,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            mode: "clips".into(),
            auto_announce: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClipsConfig {
    pub audio_dir: String,
    pub extension: String,
}

impl Default for ClipsConfig {
    fn default() -> Self {
        Self {
            audio_dir: "audio".into(),
            extension: "mp3".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SynthConfig {
    /// Explicit voice name; empty picks heuristically.
    pub voice: String,
    pub language: String,
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
    pub voices_ready_timeout_ms: u64,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            voice: String::new(),
            language: "en-GB".into(),
            rate: 0.9,
            pitch: 1.0,
            volume: 1.0,
            voices_ready_timeout_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub enabled: bool,
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 8768,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub catalog: CatalogConfig,
    pub speech: SpeechConfig,
    pub clips: ClipsConfig,
    pub synth: SynthConfig,
    pub api: ApiConfig,
}

impl Config {
    /// Load configuration from YAML file.
    ///
    /// Searches standard locations if no path is provided:
    /// 1. ./config.yaml
    /// 2. ~/.config/nownext/config.yaml
    /// 3. /etc/nownext/config.yaml
    pub fn load(path: Option<&Path>) -> Self {
        let resolved = path.map(PathBuf::from).or_else(|| {
            let candidates = [
                std::env::current_dir().ok().map(|d| d.join("config.yaml")),
                dirs::home_dir().map(|h| h.join(".config/nownext/config.yaml")),
                Some(PathBuf::from("/etc/nownext/config.yaml")),
            ];
            candidates.into_iter().flatten().find(|p| p.exists())
        });

        let Some(config_path) = resolved else {
            info!("No config file found, using defaults");
            return Self::default();
        };

        match std::fs::read_to_string(&config_path) {
            Ok(contents) => match serde_yml::from_str(&contents) {
                Ok(config) => {
                    info!("Loaded config from {}", config_path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {e}, using defaults", config_path.display());
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to read {}: {e}, using defaults", config_path.display());
                Self::default()
            }
        }
    }
}
