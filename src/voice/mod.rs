//! Host audio plumbing
//!
//! Microphone capture, utterance segmentation, cloud STT/TTS and
//! interruptible playback. The recognition and synthesis engines in
//! `session` and `speech` are assembled from these pieces.

mod capture;
mod playback;
mod segmenter;
mod stt;
mod tts;

pub use capture::{AudioCapture, SAMPLE_RATE, rms, samples_to_wav};
pub use playback::AudioPlayback;
pub use segmenter::{SPEECH_THRESHOLD, SegmenterState, UtteranceSegmenter};
pub use stt::SpeechToText;
pub use tts::TextToSpeech;
