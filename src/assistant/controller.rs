//! Voice session wiring
//!
//! The capture session runs on the caller's task; finalized utterances go
//! through a bounded FIFO queue to a dispatcher task that handles one at a
//! time. An utterance that arrives while the queue is full is dropped.

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use super::dispatcher::{Dispatcher, DisplayState};
use crate::session::{CaptureSession, RecognitionEngine, Utterance};
use crate::speech::SpeechOutput;
use crate::{Error, Result};

/// User controls accepted while a session runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionControl {
    /// Start listening (no-op if already listening)
    Listen,
    /// Stop listening; speech output keeps going
    Stop,
    /// Silence speech output and discard what is queued
    Interrupt,
    /// End the session
    Quit,
}

impl SessionControl {
    /// Parse a typed control line such as `/interrupt`
    #[must_use]
    pub fn parse(line: &str) -> Option<Self> {
        match line.trim().to_ascii_lowercase().as_str() {
            "/listen" | "/start" => Some(Self::Listen),
            "/stop" => Some(Self::Stop),
            "/interrupt" | "/hush" => Some(Self::Interrupt),
            "/quit" | "/exit" => Some(Self::Quit),
            _ => None,
        }
    }
}

/// A running assistant: capture, dispatch queue and speech output
pub struct VoiceSession<E> {
    capture: CaptureSession<E>,
    speech: SpeechOutput,
    queue: mpsc::Sender<Utterance>,
    dispatch: JoinHandle<Dispatcher>,
    display: watch::Receiver<DisplayState>,
}

impl<E: RecognitionEngine> VoiceSession<E> {
    /// Spawn the dispatcher task; capture begins in [`run`](Self::run)
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn new(engine: E, dispatcher: Dispatcher, max_pending: usize) -> Self {
        let speech = dispatcher.speech().clone();
        let display = dispatcher.subscribe();
        let (queue, pending) = mpsc::channel(max_pending.max(1));

        Self {
            capture: CaptureSession::new(engine),
            speech,
            queue,
            dispatch: tokio::spawn(run_dispatch(dispatcher, pending)),
            display,
        }
    }

    /// Observe what the view layer shows
    #[must_use]
    pub fn display(&self) -> watch::Receiver<DisplayState> {
        self.display.clone()
    }

    /// Listen and dispatch until `Quit`, the controls close, or the engine's
    /// input is gone for good
    ///
    /// A failed restart only pauses capture; `Listen` resumes it.
    ///
    /// Utterances already queued are handled before this returns. Hands the
    /// dispatcher back so callers can inspect the final conversation state.
    ///
    /// # Errors
    ///
    /// Returns `CapabilityUnavailable` if the engine cannot run here, the
    /// engine's error if the first cycle fails, or `Task` if the dispatcher
    /// task panicked
    pub async fn run(self, mut controls: mpsc::Receiver<SessionControl>) -> Result<Dispatcher> {
        let Self {
            mut capture,
            speech,
            queue,
            dispatch,
            ..
        } = self;

        capture.start()?;

        loop {
            tokio::select! {
                control = controls.recv() => match control {
                    Some(SessionControl::Listen) => {
                        if let Err(e) = capture.start() {
                            tracing::warn!(error = %e, "could not start listening");
                        }
                    }
                    Some(SessionControl::Stop) => capture.stop(),
                    Some(SessionControl::Interrupt) => speech.interrupt(),
                    Some(SessionControl::Quit) | None => break,
                },
                utterance = capture.next_utterance(), if capture.is_listening() => {
                    match utterance {
                        Some(utterance) => enqueue(&queue, utterance),
                        None if capture.is_exhausted() => {
                            tracing::info!("recognition input closed");
                            break;
                        }
                        None => {
                            tracing::warn!(state = ?capture.state(), "capture paused, waiting for listen");
                        }
                    }
                }
            }
        }

        capture.stop();
        drop(queue);

        dispatch.await.map_err(|e| Error::Task(e.to_string()))
    }
}

fn enqueue(queue: &mpsc::Sender<Utterance>, utterance: Utterance) {
    match queue.try_send(utterance) {
        Ok(()) => {}
        Err(TrySendError::Full(utterance)) => {
            tracing::warn!(text = %utterance.text, "dispatch queue full, dropping utterance");
        }
        Err(TrySendError::Closed(utterance)) => {
            tracing::error!(text = %utterance.text, "dispatcher is gone, dropping utterance");
        }
    }
}

async fn run_dispatch(mut dispatcher: Dispatcher, mut pending: mpsc::Receiver<Utterance>) -> Dispatcher {
    while let Some(utterance) = pending.recv().await {
        let waited = chrono::Utc::now() - utterance.received_at;
        tracing::debug!(waited_ms = waited.num_milliseconds(), "utterance dequeued");
        dispatcher.handle(utterance).await;
    }

    tracing::debug!("dispatch queue closed");
    dispatcher
}
