//! Synthesis engines

use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use super::SynthesisEngine;
use crate::voice::{AudioPlayback, TextToSpeech};
use crate::{Config, Error, Result};

/// Cloud TTS rendered through the default output device
pub struct CloudSynthesis {
    tts: TextToSpeech,
    playback: AudioPlayback,
}

impl CloudSynthesis {
    /// # Errors
    ///
    /// Returns `CapabilityUnavailable` if there is no speaker or no TTS key
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            tts: TextToSpeech::from_config(&config.voice, &config.api_keys)?,
            playback: AudioPlayback::new()?,
        })
    }
}

/// Raises the playback stop flag when the render future is dropped
struct StopOnDrop(Arc<AtomicBool>);

impl Drop for StopOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::Release);
    }
}

#[async_trait]
impl SynthesisEngine for CloudSynthesis {
    fn name(&self) -> &'static str {
        "cloud"
    }

    async fn render(&self, text: &str) -> Result<()> {
        let audio = self
            .tts
            .synthesize(text)
            .await
            .map_err(|e| Error::Synthesis(e.to_string()))?;

        let stop = Arc::new(AtomicBool::new(false));
        let _guard = StopOnDrop(Arc::clone(&stop));
        let playback = self.playback.clone();

        tokio::task::spawn_blocking(move || playback.play_mp3_blocking(&audio, &stop))
            .await
            .map_err(|e| Error::Synthesis(e.to_string()))?
    }
}

/// Writes each utterance to stderr instead of the speakers
#[derive(Debug, Default)]
pub struct ConsoleSynthesis;

#[async_trait]
impl SynthesisEngine for ConsoleSynthesis {
    fn name(&self) -> &'static str {
        "console"
    }

    async fn render(&self, text: &str) -> Result<()> {
        let mut stderr = std::io::stderr().lock();
        writeln!(stderr, "🔊 {text}")?;
        Ok(())
    }
}
