pub mod client;
pub mod voice;

use crate::config::Config;
use crate::error::AppError;
use crate::store::AudioStore;

pub use client::{ElevenLabsClient, RawResponse, UpstreamError};
pub use voice::{SpeechRequest, VoiceSettings};

/// Audio that has been synthesized and written to the store.
#[derive(Debug, Clone)]
pub struct GeneratedAudio {
    pub filename: String,
    pub url: String,
}

pub struct TtsService {
    client: ElevenLabsClient,
    store: AudioStore,
    public_base_url: String,
}

impl TtsService {
    pub fn new(config: &Config, store: AudioStore) -> Result<Self, AppError> {
        let client = ElevenLabsClient::new(
            &config.upstream_url,
            &config.api_key,
            config.upstream_timeout,
        )
        .map_err(|e| AppError::TtsError(format!("Failed to create upstream client: {}", e)))?;

        Ok(Self {
            client,
            store,
            public_base_url: config.public_base_url.clone(),
        })
    }

    pub async fn speak(
        &self,
        voice_id: &str,
        request: &SpeechRequest,
    ) -> Result<GeneratedAudio, AppError> {
        // 1. Synthesize upstream
        let audio = self
            .client
            .text_to_speech(voice_id, request)
            .await
            .map_err(|e| AppError::from_synthesis(e, voice_id))?;

        // 2. Persist under a fresh random name
        let filename = self
            .store
            .save(&audio)
            .await
            .map_err(|e| AppError::TtsError(format!("Failed to save audio: {}", e)))?;

        tracing::debug!("Stored {} bytes as {}", audio.len(), filename);

        // 3. Public URL
        let url = self.audio_url(&filename);

        Ok(GeneratedAudio { filename, url })
    }

    pub async fn list_voices(&self) -> Result<RawResponse, AppError> {
        self.client.list_voices().await.map_err(|e| {
            if let Some(body) = e.body() {
                tracing::error!("Upstream voices error body: {}", body);
            }
            AppError::VoicesError(e.to_string())
        })
    }

    pub fn audio_url(&self, filename: &str) -> String {
        format!("{}/audio/{}", self.public_base_url, filename)
    }
}
