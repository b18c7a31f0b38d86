//! Configuration management for the kitchen assistant
//!
//! Precedence is env > `config.toml` > built-in defaults.

pub mod file;

use std::path::PathBuf;
use std::time::Duration;

use crate::Result;
use file::KitchenConfigFile;

/// Default chat completions endpoint
pub const DEFAULT_LLM_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

/// Default language model
pub const DEFAULT_LLM_MODEL: &str = "meta-llama/llama-3.1-8b-instruct";

/// System persona sent with general requests
pub const DEFAULT_PERSONA: &str = "You are a smart kitchen assistant.";

/// Kitchen assistant configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Language-model collaborator
    pub llm: LlmConfig,

    /// Weather endpoint, if configured
    pub weather_url: Option<String>,

    /// Voice configuration
    pub voice: VoiceConfig,

    /// Dispatch tuning
    pub dispatch: DispatchConfig,

    /// `SQLite` document store path
    pub db_path: PathBuf,

    /// API keys
    pub api_keys: ApiKeys,
}

/// Language-model configuration
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Chat completions endpoint
    pub url: String,

    /// Model identifier
    pub model: String,

    /// System persona
    pub persona: String,
}

/// STT provider backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SttBackend {
    #[default]
    Whisper,
    Deepgram,
}

/// TTS provider backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TtsBackend {
    #[default]
    OpenAi,
    ElevenLabs,
}

/// Voice processing configuration
#[derive(Debug, Clone)]
pub struct VoiceConfig {
    /// STT provider
    pub stt_provider: SttBackend,

    /// STT model (e.g. "whisper-1", "nova-2")
    pub stt_model: String,

    /// TTS provider
    pub tts_provider: TtsBackend,

    /// TTS model (e.g. "tts-1", "eleven_monolingual_v1")
    pub tts_model: String,

    /// TTS voice identifier
    pub tts_voice: String,

    /// TTS speed multiplier (0.25 to 4.0)
    pub tts_speed: f32,

    /// How long one microphone recognition cycle lasts before it ends naturally
    pub listen_window: Duration,
}

/// Dispatch tuning
#[derive(Debug, Clone, Copy)]
pub struct DispatchConfig {
    /// Upper bound on a single collaborator call
    pub collaborator_timeout: Duration,

    /// Utterances allowed to queue behind an in-flight dispatch
    pub max_pending_utterances: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            collaborator_timeout: Duration::from_secs(20),
            max_pending_utterances: 8,
        }
    }
}

/// API keys for external services
#[derive(Debug, Clone, Default)]
pub struct ApiKeys {
    /// `OpenRouter` API key (language model)
    /// See: <https://openrouter.ai/keys>
    pub openrouter: Option<String>,

    /// `OpenAI` API key (Whisper and TTS)
    pub openai: Option<String>,

    /// `ElevenLabs` API key (optional TTS)
    pub elevenlabs: Option<String>,

    /// `Deepgram` API key (optional STT)
    pub deepgram: Option<String>,
}

impl Config {
    /// Load configuration from the environment and the standard config file
    ///
    /// # Errors
    ///
    /// Returns error if a configured value is invalid
    pub fn load() -> Result<Self> {
        let fc = file::load_config_file();
        Self::resolve(fc, |key| std::env::var(key).ok())
    }

    /// Build configuration from a parsed file and an environment lookup
    ///
    /// # Errors
    ///
    /// Returns error if a provider name is not recognized
    pub fn resolve(fc: KitchenConfigFile, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_keys = ApiKeys {
            openrouter: env("OPENROUTER_API_KEY").or(fc.api_keys.openrouter),
            openai: env("OPENAI_API_KEY").or(fc.api_keys.openai),
            elevenlabs: env("ELEVENLABS_API_KEY").or(fc.api_keys.elevenlabs),
            deepgram: env("DEEPGRAM_API_KEY").or(fc.api_keys.deepgram),
        };

        let llm = LlmConfig {
            url: fc.llm.url.unwrap_or_else(|| DEFAULT_LLM_URL.to_string()),
            model: env("KITCHEN_LLM_MODEL")
                .or(fc.llm.model)
                .unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
            persona: fc.llm.persona.unwrap_or_else(|| DEFAULT_PERSONA.to_string()),
        };

        let weather_url = env("KITCHEN_WEATHER_URL").or(fc.weather.url);

        let stt_provider = parse_stt_backend(fc.voice.stt_provider.as_deref())?;
        let tts_provider = parse_tts_backend(fc.voice.tts_provider.as_deref())?;
        let voice = VoiceConfig {
            stt_provider,
            stt_model: fc.voice.stt_model.unwrap_or_else(|| match stt_provider {
                SttBackend::Whisper => "whisper-1".to_string(),
                SttBackend::Deepgram => "nova-2".to_string(),
            }),
            tts_provider,
            tts_model: fc.voice.tts_model.unwrap_or_else(|| match tts_provider {
                TtsBackend::OpenAi => "tts-1".to_string(),
                TtsBackend::ElevenLabs => "eleven_monolingual_v1".to_string(),
            }),
            tts_voice: fc.voice.tts_voice.unwrap_or_else(|| "alloy".to_string()),
            tts_speed: fc.voice.tts_speed.unwrap_or(1.0).clamp(0.25, 4.0),
            listen_window: Duration::from_secs(fc.voice.listen_window_secs.unwrap_or(60)),
        };

        let defaults = DispatchConfig::default();
        let dispatch = DispatchConfig {
            collaborator_timeout: fc
                .dispatch
                .collaborator_timeout_secs
                .map_or(defaults.collaborator_timeout, Duration::from_secs),
            max_pending_utterances: fc
                .dispatch
                .max_pending_utterances
                .unwrap_or(defaults.max_pending_utterances)
                .max(1),
        };

        let db_path = env("KITCHEN_DB_PATH")
            .or(fc.store.path)
            .map_or_else(|| data_dir().join("kitchen.db"), PathBuf::from);

        Ok(Self {
            llm,
            weather_url,
            voice,
            dispatch,
            db_path,
            api_keys,
        })
    }
}

/// Data directory (`~/.local/share/kitchen-assistant` on Linux)
#[must_use]
pub fn data_dir() -> PathBuf {
    directories::BaseDirs::new().map_or_else(
        || PathBuf::from(".local/share/kitchen-assistant"),
        |d| d.data_dir().join("kitchen-assistant"),
    )
}

fn parse_stt_backend(name: Option<&str>) -> Result<SttBackend> {
    match name.map(str::to_lowercase).as_deref() {
        None | Some("whisper") => Ok(SttBackend::Whisper),
        Some("deepgram") => Ok(SttBackend::Deepgram),
        Some(other) => Err(crate::Error::Config(format!("unknown STT provider: {other}"))),
    }
}

fn parse_tts_backend(name: Option<&str>) -> Result<TtsBackend> {
    match name.map(str::to_lowercase).as_deref() {
        None | Some("openai") => Ok(TtsBackend::OpenAi),
        Some("elevenlabs") => Ok(TtsBackend::ElevenLabs),
        Some(other) => Err(crate::Error::Config(format!("unknown TTS provider: {other}"))),
    }
}
