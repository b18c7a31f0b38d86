//! Speech capture session
//!
//! Owns exactly one recognition engine and keeps it listening across many
//! engine cycles: when a cycle ends naturally the session starts the next
//! one, until `stop()` is called.
//!
//! ```text
//!            start()              natural end
//!   Idle ──────────────► Listening ──────────► Restarting
//!                          ▲   │                   │
//!                          │   │ stop()            │ engine.start() ok
//!                          │   ▼                   │
//!                          │ Stopped ◄─────────────┘ engine.start() failed
//!                          └───┘ start()
//! ```

mod channel;
mod microphone;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub use channel::ChannelRecognizer;
pub use microphone::MicrophoneRecognizer;

use crate::{Error, Result};

/// One finalized speech-to-text result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utterance {
    pub text: String,
    pub received_at: DateTime<Utc>,
}

impl Utterance {
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            received_at: Utc::now(),
        }
    }
}

/// Event reported by a recognition engine during one listening cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionEvent {
    /// A finalized result, best alternative first
    Result { alternatives: Vec<String> },
    /// Engine-level error; the cycle may continue
    Error(String),
    /// The cycle ended on its own (timeout, stream closed)
    End,
}

/// A continuous speech recognizer provided by the host
///
/// Engines are driven from a single task and need not be `Send`.
#[async_trait(?Send)]
pub trait RecognitionEngine {
    /// Engine name for logs
    fn name(&self) -> &'static str;

    /// Whether the host can run this engine at all
    fn is_available(&self) -> bool {
        true
    }

    /// Begin a listening cycle
    ///
    /// # Errors
    ///
    /// Returns error if the engine cannot start listening
    fn start(&mut self) -> Result<()>;

    /// Abort the current cycle
    fn stop(&mut self);

    /// Whether the engine can never start another cycle (its input is gone)
    fn is_exhausted(&self) -> bool {
        false
    }

    /// Wait for the next event of the current cycle
    ///
    /// Must be cancel-safe: dropping the future loses no finalized result.
    async fn next_event(&mut self) -> RecognitionEvent;
}

#[async_trait(?Send)]
impl<T: RecognitionEngine + ?Sized> RecognitionEngine for Box<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn is_available(&self) -> bool {
        (**self).is_available()
    }

    fn start(&mut self) -> Result<()> {
        (**self).start()
    }

    fn stop(&mut self) {
        (**self).stop();
    }

    fn is_exhausted(&self) -> bool {
        (**self).is_exhausted()
    }

    async fn next_event(&mut self) -> RecognitionEvent {
        (**self).next_event().await
    }
}

/// Listening lifecycle of a capture session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    /// Never started
    Idle,
    /// An engine cycle is live
    Listening,
    /// The previous cycle ended; the next one is being started
    Restarting,
    /// Explicitly stopped, or the engine could not be restarted
    Stopped,
}

/// Continuous capture over a single recognition engine
pub struct CaptureSession<E> {
    engine: E,
    state: CaptureState,
    cycles: u64,
}

impl<E: RecognitionEngine> CaptureSession<E> {
    #[must_use]
    pub const fn new(engine: E) -> Self {
        Self {
            engine,
            state: CaptureState::Idle,
            cycles: 0,
        }
    }

    /// Begin continuous listening
    ///
    /// Calling this while already listening is a no-op, so there is never
    /// more than one live engine cycle.
    ///
    /// # Errors
    ///
    /// Returns `CapabilityUnavailable` if the engine cannot run on this host,
    /// or the engine's own error if the first cycle fails to start
    pub fn start(&mut self) -> Result<()> {
        if !self.engine.is_available() {
            let message = format!("{} speech recognition is not supported here", self.engine.name());
            tracing::error!(engine = self.engine.name(), "{message}");
            return Err(Error::CapabilityUnavailable(message));
        }

        if self.state == CaptureState::Listening {
            tracing::debug!("already listening");
            return Ok(());
        }

        self.engine.start()?;
        self.state = CaptureState::Listening;
        self.cycles += 1;

        tracing::info!(engine = self.engine.name(), "speech recognition started");
        Ok(())
    }

    /// Stop listening and suppress any automatic restart
    pub fn stop(&mut self) {
        if matches!(self.state, CaptureState::Listening | CaptureState::Restarting) {
            self.engine.stop();
            tracing::info!(cycles = self.cycles, "speech recognition stopped");
        }
        self.state = CaptureState::Stopped;
    }

    /// Wait for the next finalized utterance
    ///
    /// Engine errors are logged and skipped. A natural end of the engine
    /// cycle starts a new one. Returns `None` once the session is no longer
    /// listening.
    pub async fn next_utterance(&mut self) -> Option<Utterance> {
        while self.state == CaptureState::Listening {
            match self.engine.next_event().await {
                RecognitionEvent::Result { alternatives } => {
                    let top = alternatives
                        .into_iter()
                        .next()
                        .map(|text| text.trim().to_string())
                        .filter(|text| !text.is_empty());

                    if let Some(text) = top {
                        tracing::info!(text = %text, "recognized");
                        return Some(Utterance::new(text));
                    }
                    tracing::debug!("no speech recognized");
                }
                RecognitionEvent::Error(message) => {
                    let error = Error::Recognition(message);
                    tracing::warn!(error = %error, "speech recognition error");
                }
                RecognitionEvent::End => self.restart(),
            }
        }

        None
    }

    fn restart(&mut self) {
        tracing::debug!(cycle = self.cycles, "speech recognition ended");
        self.state = CaptureState::Restarting;

        match self.engine.start() {
            Ok(()) => {
                self.state = CaptureState::Listening;
                self.cycles += 1;
                tracing::debug!(cycle = self.cycles, "speech recognition restarted");
            }
            Err(e) => {
                tracing::error!(error = %e, "could not restart speech recognition");
                self.state = CaptureState::Stopped;
            }
        }
    }

    #[must_use]
    pub const fn state(&self) -> CaptureState {
        self.state
    }

    #[must_use]
    pub fn is_listening(&self) -> bool {
        self.state == CaptureState::Listening
    }

    /// Whether the engine's input is permanently gone
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.engine.is_exhausted()
    }

    /// Number of engine cycles started so far
    #[must_use]
    pub const fn cycles(&self) -> u64 {
        self.cycles
    }

    #[must_use]
    pub const fn engine(&self) -> &E {
        &self.engine
    }
}
