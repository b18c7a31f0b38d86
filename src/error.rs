//! Error types for the kitchen assistant

use thiserror::Error;

/// Result type alias for assistant operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the kitchen assistant
#[derive(Debug, Error)]
pub enum Error {
    /// A host capability (speech recognition, speech synthesis) is missing
    #[error("capability unavailable: {0}")]
    CapabilityUnavailable(String),

    /// An external collaborator (LLM, weather, document store) failed
    #[error("collaborator error: {0}")]
    Collaborator(String),

    /// Recognition engine reported an error
    #[error("recognition error: {0}")]
    Recognition(String),

    /// Synthesis engine reported an error
    #[error("synthesis error: {0}")]
    Synthesis(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Audio error
    #[error("audio error: {0}")]
    Audio(String),

    /// Speech-to-text error
    #[error("STT error: {0}")]
    Stt(String),

    /// Text-to-speech error
    #[error("TTS error: {0}")]
    Tts(String),

    /// Operation did not complete in time
    #[error("timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// Background task failed or was cancelled
    #[error("task error: {0}")]
    Task(String),

    /// Database error
    #[error("database error: {0}")]
    Database(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),

    /// `SQLite` error
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}
