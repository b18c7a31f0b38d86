//! Recognition engine fed over an in-process channel
//!
//! Used for typed input and for hosts that run recognition elsewhere and
//! push finalized results in.

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{RecognitionEngine, RecognitionEvent};
use crate::{Error, Result};

/// Recognizer that relays events pushed by a producer
pub struct ChannelRecognizer {
    events: mpsc::Receiver<RecognitionEvent>,
    closed: bool,
}

impl ChannelRecognizer {
    /// Create a recognizer and the sender that feeds it
    #[must_use]
    pub fn new(buffer: usize) -> (mpsc::Sender<RecognitionEvent>, Self) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (tx, Self::from_receiver(rx))
    }

    #[must_use]
    pub const fn from_receiver(events: mpsc::Receiver<RecognitionEvent>) -> Self {
        Self {
            events,
            closed: false,
        }
    }
}

#[async_trait(?Send)]
impl RecognitionEngine for ChannelRecognizer {
    fn name(&self) -> &'static str {
        "channel"
    }

    fn start(&mut self) -> Result<()> {
        if self.closed {
            return Err(Error::Recognition("input closed".to_string()));
        }
        Ok(())
    }

    fn stop(&mut self) {}

    fn is_exhausted(&self) -> bool {
        self.closed
    }

    async fn next_event(&mut self) -> RecognitionEvent {
        if let Some(event) = self.events.recv().await {
            event
        } else {
            self.closed = true;
            RecognitionEvent::End
        }
    }
}
