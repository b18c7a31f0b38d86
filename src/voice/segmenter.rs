//! Utterance segmentation
//!
//! Splits a continuous microphone stream into utterances using RMS energy:
//! speech starts when a block crosses the threshold and ends after a run
//! of trailing silence.

use super::capture::rms;

/// RMS energy above which a block counts as speech
pub const SPEECH_THRESHOLD: f32 = 0.03;

/// Minimum duration of speech to keep (in samples at 16kHz)
const MIN_SPEECH_SAMPLES: usize = 4800; // 0.3 seconds

/// Trailing silence that ends an utterance (in samples)
const SILENCE_SAMPLES: usize = 8000; // 0.5 seconds

/// Hard cap on a single utterance (in samples)
const MAX_UTTERANCE_SAMPLES: usize = 16000 * 30;

/// State of the segmenter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmenterState {
    /// Waiting for speech
    Idle,
    /// Speech detected, accumulating
    Speaking,
}

/// Energy-based utterance segmenter
pub struct UtteranceSegmenter {
    state: SegmenterState,
    speech_buffer: Vec<f32>,
    voiced_samples: usize,
    silence_counter: usize,
}

impl Default for UtteranceSegmenter {
    fn default() -> Self {
        Self::new()
    }
}

impl UtteranceSegmenter {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: SegmenterState::Idle,
            speech_buffer: Vec::new(),
            voiced_samples: 0,
            silence_counter: 0,
        }
    }

    /// Feed a block of samples
    ///
    /// Returns the samples of a finished utterance once trailing silence is seen.
    pub fn process(&mut self, samples: &[f32]) -> Option<Vec<f32>> {
        let energy = rms(samples);
        let is_speech = energy > SPEECH_THRESHOLD;

        match self.state {
            SegmenterState::Idle => {
                if is_speech {
                    self.state = SegmenterState::Speaking;
                    self.speech_buffer.clear();
                    self.speech_buffer.extend_from_slice(samples);
                    self.voiced_samples = samples.len();
                    self.silence_counter = 0;
                    tracing::trace!(energy, "speech detected");
                }
                None
            }
            SegmenterState::Speaking => {
                self.speech_buffer.extend_from_slice(samples);

                if is_speech {
                    self.voiced_samples += samples.len();
                    self.silence_counter = 0;
                } else {
                    self.silence_counter += samples.len();
                }

                let silent_long_enough = self.silence_counter > SILENCE_SAMPLES;
                if (silent_long_enough && self.voiced_samples > MIN_SPEECH_SAMPLES)
                    || self.speech_buffer.len() >= MAX_UTTERANCE_SAMPLES
                {
                    tracing::debug!(samples = self.speech_buffer.len(), "utterance complete");
                    let utterance = std::mem::take(&mut self.speech_buffer);
                    self.reset();
                    return Some(utterance);
                }

                if silent_long_enough {
                    tracing::trace!("too short, discarding");
                    self.reset();
                }

                None
            }
        }
    }

    /// Drop any partial utterance
    pub fn reset(&mut self) {
        self.state = SegmenterState::Idle;
        self.speech_buffer.clear();
        self.voiced_samples = 0;
        self.silence_counter = 0;
    }

    #[must_use]
    pub const fn state(&self) -> SegmenterState {
        self.state
    }

    /// Samples accumulated for the utterance in progress
    #[must_use]
    pub fn pending(&self) -> &[f32] {
        &self.speech_buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_blip_is_discarded() {
        let mut segmenter = UtteranceSegmenter::new();

        assert!(segmenter.process(&[0.5; 1600]).is_none());
        assert_eq!(segmenter.state(), SegmenterState::Speaking);

        assert!(segmenter.process(&[0.0; 9000]).is_none());
        assert_eq!(segmenter.state(), SegmenterState::Idle);
        assert!(segmenter.pending().is_empty());
    }

    #[test]
    fn test_speech_then_silence_yields_utterance() {
        let mut segmenter = UtteranceSegmenter::new();

        assert!(segmenter.process(&[0.3; 8000]).is_none());
        let utterance = segmenter.process(&[0.0; 9000]).unwrap();

        assert_eq!(utterance.len(), 17000);
        assert_eq!(segmenter.state(), SegmenterState::Idle);
    }
}
