//! Kitchen Assistant - hands-free voice assistant for the kitchen
//!
//! This library provides the pieces of the assistant:
//! - Continuous speech capture with automatic restart
//! - Intent classification and multi-turn grocery lists
//! - Interruptible speech output
//! - Collaborators for the language model, weather and pantry storage
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                 Capture Session                      │
//! │   Microphone + STT  │  Typed input (channel)        │
//! └────────────────────┬────────────────────────────────┘
//!                      │ utterances (FIFO)
//! ┌────────────────────▼────────────────────────────────┐
//! │                   Dispatcher                         │
//! │   Intent  │  Context  │  LLM  │  Weather  │  Store   │
//! └────────────────────┬────────────────────────────────┘
//!                      │ responses
//! ┌────────────────────▼────────────────────────────────┐
//! │                 Speech Output                        │
//! │   Cloud TTS + speakers  │  Console                  │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod assistant;
pub mod collaborators;
pub mod config;
pub mod error;
pub mod session;
pub mod speech;
pub mod voice;

pub use assistant::{
    Collaborators, ConversationContext, Dispatcher, DisplayState, Intent, SessionControl, Task,
    VoiceSession, classify,
};
pub use collaborators::{
    DocumentStore, HttpWeatherSource, LanguageModel, OpenRouterClient, Record,
    SqliteDocumentStore, WeatherSource,
};
pub use config::Config;
pub use error::{Error, Result};
pub use session::{
    CaptureSession, CaptureState, ChannelRecognizer, MicrophoneRecognizer, RecognitionEngine,
    RecognitionEvent, Utterance,
};
pub use speech::{CloudSynthesis, ConsoleSynthesis, SpeechOutput, SynthesisEngine};
