//! Voice pipeline integration tests
//!
//! Tests voice components without requiring audio hardware

use kitchen_assistant::voice::{
    SAMPLE_RATE, SPEECH_THRESHOLD, SegmenterState, UtteranceSegmenter, rms, samples_to_wav,
};
use std::io::Cursor;

/// Generate sine wave audio samples
fn generate_sine_samples(frequency: f32, duration_secs: f32, amplitude: f32) -> Vec<f32> {
    let num_samples = (SAMPLE_RATE as f32 * duration_secs) as usize;
    (0..num_samples)
        .map(|i| {
            let t = i as f32 / SAMPLE_RATE as f32;
            amplitude * (2.0 * std::f32::consts::PI * frequency * t).sin()
        })
        .collect()
}

/// Generate silence
fn generate_silence(duration_secs: f32) -> Vec<f32> {
    let num_samples = (SAMPLE_RATE as f32 * duration_secs) as usize;
    vec![0.0; num_samples]
}

#[test]
fn test_rms_of_sine() {
    let samples = generate_sine_samples(440.0, 0.5, 0.3);
    let energy = rms(&samples);

    // RMS of a sine is amplitude / sqrt(2)
    assert!((energy - 0.3 / 2.0_f32.sqrt()).abs() < 0.01);
    assert!(rms(&generate_silence(0.1)) < f32::EPSILON);
}

#[test]
fn test_silence_never_starts_utterance() {
    let mut segmenter = UtteranceSegmenter::new();

    for _ in 0..20 {
        assert!(segmenter.process(&generate_silence(0.1)).is_none());
    }
    assert_eq!(segmenter.state(), SegmenterState::Idle);
}

#[test]
fn test_speech_threshold_separates_quiet_from_speech() {
    // A sine's RMS is amplitude / sqrt(2)
    let quiet = generate_sine_samples(440.0, 0.1, SPEECH_THRESHOLD * 0.8 * 2.0_f32.sqrt());
    let loud = generate_sine_samples(440.0, 0.1, SPEECH_THRESHOLD * 1.5 * 2.0_f32.sqrt());
    assert!(rms(&quiet) < SPEECH_THRESHOLD);
    assert!(rms(&loud) > SPEECH_THRESHOLD);

    let mut segmenter = UtteranceSegmenter::new();
    assert!(segmenter.process(&quiet).is_none());
    assert_eq!(segmenter.state(), SegmenterState::Idle);

    assert!(segmenter.process(&loud).is_none());
    assert_eq!(segmenter.state(), SegmenterState::Speaking);
}

#[test]
fn test_speech_activity_detection() {
    let mut segmenter = UtteranceSegmenter::new();

    // Loud samples - should start an utterance
    let speech = generate_sine_samples(440.0, 0.5, 0.3);
    assert!(segmenter.process(&speech).is_none());
    assert_eq!(segmenter.state(), SegmenterState::Speaking);

    // More speech followed by silence should complete the segment
    let more_speech = generate_sine_samples(440.0, 0.3, 0.3);
    assert!(segmenter.process(&more_speech).is_none());

    let silence = generate_silence(0.6);
    let utterance = segmenter.process(&silence).unwrap();
    assert_eq!(utterance.len(), speech.len() + more_speech.len() + silence.len());
    assert_eq!(segmenter.state(), SegmenterState::Idle);
}

#[test]
fn test_pause_inside_utterance_is_kept() {
    let mut segmenter = UtteranceSegmenter::new();

    segmenter.process(&generate_sine_samples(440.0, 0.4, 0.3));
    // A short pause does not end the utterance
    assert!(segmenter.process(&generate_silence(0.3)).is_none());
    segmenter.process(&generate_sine_samples(440.0, 0.4, 0.3));

    assert_eq!(segmenter.pending().len(), (SAMPLE_RATE as usize * 11) / 10);
    assert!(segmenter.process(&generate_silence(0.6)).is_some());
}

#[test]
fn test_reset_drops_partial_utterance() {
    let mut segmenter = UtteranceSegmenter::new();

    segmenter.process(&generate_sine_samples(440.0, 0.2, 0.3));
    assert!(!segmenter.pending().is_empty());

    segmenter.reset();
    assert_eq!(segmenter.state(), SegmenterState::Idle);
    assert!(segmenter.pending().is_empty());
}

#[test]
fn test_samples_to_wav() {
    let samples = generate_sine_samples(440.0, 0.1, 0.5);
    let wav_data = samples_to_wav(&samples, SAMPLE_RATE).unwrap();

    // Check WAV header magic
    assert_eq!(&wav_data[0..4], b"RIFF");
    assert_eq!(&wav_data[8..12], b"WAVE");

    // WAV should have reasonable size
    assert!(wav_data.len() > 44); // WAV header is 44 bytes
}

#[test]
fn test_wav_roundtrip() {
    let original_samples: Vec<f32> = vec![0.0, 0.5, -0.5, 1.0, -1.0, 0.25];
    let wav_data = samples_to_wav(&original_samples, SAMPLE_RATE).unwrap();

    // Read WAV back
    let cursor = Cursor::new(wav_data);
    let mut reader = hound::WavReader::new(cursor).unwrap();

    let spec = reader.spec();
    assert_eq!(spec.sample_rate, SAMPLE_RATE);
    assert_eq!(spec.channels, 1);

    // Read samples back
    let read_samples: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
    assert_eq!(read_samples.len(), original_samples.len());
}
