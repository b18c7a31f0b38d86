//! Speech-to-text (STT) over cloud transcription APIs

use crate::config::{ApiKeys, SttBackend, VoiceConfig};
use crate::{Error, Result};

/// Response from `OpenAI` Whisper transcription API
#[derive(serde::Deserialize)]
struct WhisperResponse {
    text: String,
}

/// Response from Deepgram transcription API
#[derive(serde::Deserialize)]
struct DeepgramResponse {
    results: DeepgramResults,
}

#[derive(serde::Deserialize)]
struct DeepgramResults {
    channels: Vec<DeepgramChannel>,
}

#[derive(serde::Deserialize)]
struct DeepgramChannel {
    alternatives: Vec<DeepgramAlternative>,
}

#[derive(serde::Deserialize)]
struct DeepgramAlternative {
    transcript: String,
}

/// Transcribes WAV audio to ranked text alternatives
pub struct SpeechToText {
    client: reqwest::Client,
    api_key: String,
    model: String,
    provider: SttBackend,
}

impl SpeechToText {
    /// Build the transcriber selected by the voice configuration
    ///
    /// # Errors
    ///
    /// Returns `CapabilityUnavailable` if the provider's API key is missing
    pub fn from_config(voice: &VoiceConfig, keys: &ApiKeys) -> Result<Self> {
        let (api_key, label) = match voice.stt_provider {
            SttBackend::Whisper => (keys.openai.clone(), "OPENAI_API_KEY"),
            SttBackend::Deepgram => (keys.deepgram.clone(), "DEEPGRAM_API_KEY"),
        };

        let api_key = api_key.filter(|k| !k.is_empty()).ok_or_else(|| {
            Error::CapabilityUnavailable(format!("speech recognition needs {label}"))
        })?;

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            model: voice.stt_model.clone(),
            provider: voice.stt_provider,
        })
    }

    /// Transcribe audio, best alternative first
    ///
    /// # Arguments
    ///
    /// * `audio` - WAV audio bytes
    ///
    /// # Errors
    ///
    /// Returns error if transcription fails
    pub async fn transcribe(&self, audio: &[u8]) -> Result<Vec<String>> {
        match self.provider {
            SttBackend::Whisper => self.transcribe_whisper(audio).await,
            SttBackend::Deepgram => self.transcribe_deepgram(audio).await,
        }
    }

    async fn transcribe_whisper(&self, audio: &[u8]) -> Result<Vec<String>> {
        tracing::debug!(audio_bytes = audio.len(), "starting Whisper transcription");

        let form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::bytes(audio.to_vec())
                    .file_name("audio.wav")
                    .mime_str("audio/wav")
                    .map_err(|e| Error::Stt(e.to_string()))?,
            )
            .text("model", self.model.clone())
            .text("language", "en");

        let response = self
            .client
            .post("https://api.openai.com/v1/audio/transcriptions")
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Whisper API error");
            return Err(Error::Stt(format!("Whisper API error {status}: {body}")));
        }

        let result: WhisperResponse = response.json().await?;

        tracing::debug!(transcript = %result.text, "transcription complete");
        Ok(non_blank([result.text]))
    }

    async fn transcribe_deepgram(&self, audio: &[u8]) -> Result<Vec<String>> {
        tracing::debug!(audio_bytes = audio.len(), "starting Deepgram transcription");

        let url = format!(
            "https://api.deepgram.com/v1/listen?model={}&language=en-US&punctuate=true",
            self.model
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Token {}", self.api_key))
            .header("Content-Type", "audio/wav")
            .body(audio.to_vec())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Deepgram API error");
            return Err(Error::Stt(format!("Deepgram API error {status}: {body}")));
        }

        let result: DeepgramResponse = response.json().await?;
        let alternatives = result
            .results
            .channels
            .into_iter()
            .next()
            .map(|c| c.alternatives.into_iter().map(|a| a.transcript))
            .into_iter()
            .flatten();

        Ok(non_blank(alternatives))
    }
}

fn non_blank(alternatives: impl IntoIterator<Item = String>) -> Vec<String> {
    alternatives
        .into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}
