//! TOML configuration file loading
//!
//! Supports `~/.config/kitchen-assistant/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::Result;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct KitchenConfigFile {
    /// Language-model configuration
    #[serde(default)]
    pub llm: LlmFileConfig,

    /// Weather source configuration
    #[serde(default)]
    pub weather: WeatherFileConfig,

    /// Voice/audio configuration
    #[serde(default)]
    pub voice: VoiceFileConfig,

    /// Dispatch tuning
    #[serde(default)]
    pub dispatch: DispatchFileConfig,

    /// Document store configuration
    #[serde(default)]
    pub store: StoreFileConfig,

    /// API keys for external services
    #[serde(default)]
    pub api_keys: ApiKeysFileConfig,
}

/// LLM-related configuration
#[derive(Debug, Default, Deserialize)]
pub struct LlmFileConfig {
    /// Chat completions endpoint
    pub url: Option<String>,

    /// Model identifier (e.g. "meta-llama/llama-3.1-8b-instruct")
    pub model: Option<String>,

    /// System persona sent with general requests
    pub persona: Option<String>,
}

/// Weather source configuration
#[derive(Debug, Default, Deserialize)]
pub struct WeatherFileConfig {
    /// Endpoint returning `{ "weather": "..." }`
    pub url: Option<String>,
}

/// Voice processing configuration
#[derive(Debug, Default, Deserialize)]
pub struct VoiceFileConfig {
    /// STT provider ("whisper" or "deepgram")
    pub stt_provider: Option<String>,

    /// STT model (e.g. "whisper-1")
    pub stt_model: Option<String>,

    /// TTS provider ("openai" or "elevenlabs")
    pub tts_provider: Option<String>,

    /// TTS model (e.g. "tts-1")
    pub tts_model: Option<String>,

    /// TTS voice identifier (e.g. "alloy")
    pub tts_voice: Option<String>,

    /// TTS speed multiplier
    pub tts_speed: Option<f32>,

    /// Seconds the microphone engine listens before reporting natural end
    pub listen_window_secs: Option<u64>,
}

/// Dispatch tuning
#[derive(Debug, Default, Deserialize)]
pub struct DispatchFileConfig {
    /// Upper bound on any single collaborator call
    pub collaborator_timeout_secs: Option<u64>,

    /// Utterances allowed to wait behind an in-flight dispatch
    pub max_pending_utterances: Option<usize>,
}

/// Document store configuration
#[derive(Debug, Default, Deserialize)]
pub struct StoreFileConfig {
    /// `SQLite` database path
    pub path: Option<String>,
}

/// API keys configuration
#[derive(Debug, Default, Deserialize)]
pub struct ApiKeysFileConfig {
    pub openrouter: Option<String>,
    pub openai: Option<String>,
    pub elevenlabs: Option<String>,
    pub deepgram: Option<String>,
}

/// Load the TOML config file from the standard path
///
/// Returns `KitchenConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> KitchenConfigFile {
    config_file_path().map_or_else(KitchenConfigFile::default, |path| load_from(&path))
}

/// Load a config file from an explicit path, falling back to defaults
pub fn load_from(path: &Path) -> KitchenConfigFile {
    if !path.exists() {
        return KitchenConfigFile::default();
    }

    match read(path) {
        Ok(config) => {
            tracing::info!(path = %path.display(), "loaded config file");
            config
        }
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to load config file, using defaults"
            );
            KitchenConfigFile::default()
        }
    }
}

/// Read and parse a config file, reporting any failure
///
/// # Errors
///
/// Returns `Io` if the file cannot be read or `Toml` if it does not parse
pub fn read(path: &Path) -> Result<KitchenConfigFile> {
    let content = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Return the config file path: `~/.config/kitchen-assistant/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| {
        d.config_dir()
            .join("kitchen-assistant")
            .join("config.toml")
    })
}
