//! Microphone recognition engine
//!
//! Captures audio, segments it into utterances by energy, and transcribes
//! each one through the configured STT provider. A cycle ends naturally
//! once the listen window elapses while nobody is speaking.
//!
//! Audio heard while the assistant itself is talking is discarded, so its
//! own replies are never transcribed.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use super::{RecognitionEngine, RecognitionEvent};
use crate::voice::{
    AudioCapture, SAMPLE_RATE, SegmenterState, SpeechToText, UtteranceSegmenter, samples_to_wav,
};
use crate::{Config, Result};

/// How often captured audio is drained and segmented
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Recognizer backed by the default input device and cloud STT
pub struct MicrophoneRecognizer {
    capture: AudioCapture,
    segmenter: UtteranceSegmenter,
    stt: SpeechToText,
    listen_window: Duration,
    deadline: Option<Instant>,
    pending: Option<Vec<f32>>,
    speaking: Arc<AtomicBool>,
}

impl MicrophoneRecognizer {
    /// Open the microphone and STT client
    ///
    /// `speaking` is raised while speech output is playing; see
    /// [`SpeechOutput::speaking_flag`](crate::SpeechOutput::speaking_flag).
    ///
    /// # Errors
    ///
    /// Returns `CapabilityUnavailable` if there is no microphone or no STT key
    pub fn new(config: &Config, speaking: Arc<AtomicBool>) -> Result<Self> {
        Ok(Self {
            capture: AudioCapture::new()?,
            segmenter: UtteranceSegmenter::new(),
            stt: SpeechToText::from_config(&config.voice, &config.api_keys)?,
            listen_window: config.voice.listen_window,
            deadline: None,
            pending: None,
            speaking,
        })
    }

    async fn transcribe(&self, samples: &[f32]) -> RecognitionEvent {
        let wav = match samples_to_wav(samples, SAMPLE_RATE) {
            Ok(wav) => wav,
            Err(e) => return RecognitionEvent::Error(e.to_string()),
        };

        match self.stt.transcribe(&wav).await {
            Ok(alternatives) => RecognitionEvent::Result { alternatives },
            Err(e) => RecognitionEvent::Error(e.to_string()),
        }
    }
}

#[async_trait(?Send)]
impl RecognitionEngine for MicrophoneRecognizer {
    fn name(&self) -> &'static str {
        "microphone"
    }

    fn start(&mut self) -> Result<()> {
        self.segmenter.reset();
        self.capture.start()?;
        self.deadline = Some(Instant::now() + self.listen_window);
        Ok(())
    }

    fn stop(&mut self) {
        self.capture.stop();
        self.segmenter.reset();
        self.deadline = None;
        self.pending = None;
    }

    async fn next_event(&mut self) -> RecognitionEvent {
        loop {
            // Kept until transcription finishes so a cancelled call retries it
            if let Some(samples) = &self.pending {
                let event = self.transcribe(samples).await;
                self.pending = None;
                return event;
            }

            let Some(deadline) = self.deadline else {
                return RecognitionEvent::End;
            };

            if Instant::now() >= deadline && self.segmenter.state() == SegmenterState::Idle {
                self.capture.stop();
                self.deadline = None;
                return RecognitionEvent::End;
            }

            tokio::time::sleep(POLL_INTERVAL).await;

            let samples = self.capture.take_buffer();
            if samples.is_empty() {
                continue;
            }

            let speaking = self.speaking.load(Ordering::Acquire);
            if let Some(utterance) = segment(&mut self.segmenter, &samples, speaking) {
                tracing::debug!(samples = utterance.len(), "transcribing utterance");
                self.pending = Some(utterance);
            }
        }
    }
}

/// Feed captured samples to the segmenter unless the assistant is talking
///
/// While speaking, the block is dropped and any partial utterance with it.
fn segment(segmenter: &mut UtteranceSegmenter, samples: &[f32], speaking: bool) -> Option<Vec<f32>> {
    if speaking {
        if segmenter.state() == SegmenterState::Speaking {
            tracing::trace!("dropping audio heard during playback");
        }
        segmenter.reset();
        return None;
    }

    segmenter.process(samples)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_during_playback_is_ignored() {
        let mut segmenter = UtteranceSegmenter::new();

        assert!(segment(&mut segmenter, &[0.3; 8000], true).is_none());
        assert!(segment(&mut segmenter, &[0.0; 9000], true).is_none());
        assert_eq!(segmenter.state(), SegmenterState::Idle);
        assert!(segmenter.pending().is_empty());
    }

    #[test]
    fn test_playback_start_discards_partial_utterance() {
        let mut segmenter = UtteranceSegmenter::new();

        assert!(segment(&mut segmenter, &[0.3; 8000], false).is_none());
        assert_eq!(segmenter.state(), SegmenterState::Speaking);

        // Reply starts playing before the trailing silence arrives
        assert!(segment(&mut segmenter, &[0.3; 4000], true).is_none());
        assert!(segment(&mut segmenter, &[0.0; 9000], false).is_none());
        assert_eq!(segmenter.state(), SegmenterState::Idle);
    }

    #[test]
    fn test_audio_after_playback_is_segmented() {
        let mut segmenter = UtteranceSegmenter::new();

        segment(&mut segmenter, &[0.3; 8000], true);
        assert!(segment(&mut segmenter, &[0.3; 8000], false).is_none());

        let utterance = segment(&mut segmenter, &[0.0; 9000], false).unwrap();
        assert_eq!(utterance.len(), 17000);
    }
}
