pub mod handlers;
pub mod routes;

use serde::{Deserialize, Serialize};

use crate::tts::VoiceSettings;

pub const SERVICE_NAME: &str = "ElevenLabs Proxy";
pub const SUCCESS_MESSAGE: &str =
    "Audio generado exitosamente. El archivo estará disponible por 1 hora.";

#[derive(Debug, Deserialize)]
pub struct SynthesizeRequest {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub model_id: Option<String>,
    #[serde(default)]
    pub voice_settings: Option<VoiceSettings>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SynthesizeQuery {
    pub output_format: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SynthesizeResponse {
    pub success: bool,
    pub audio_url: String,
    pub voice_id: String,
    pub text_length: usize,
    pub model: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    /// Seconds since the server started.
    pub uptime: f64,
}
