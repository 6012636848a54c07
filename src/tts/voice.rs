use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const DEFAULT_MODEL_ID: &str = "eleven_multilingual_v2";
pub const DEFAULT_OUTPUT_FORMAT: &str = "mp3_44100_128";

/// Voice tuning forwarded to the upstream API. Missing fields take the
/// upstream's recommended defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceSettings {
    #[serde(default = "default_stability")]
    pub stability: f64,
    #[serde(default = "default_similarity_boost")]
    pub similarity_boost: f64,
    #[serde(default)]
    pub style: f64,
    #[serde(default = "default_use_speaker_boost")]
    pub use_speaker_boost: bool,
    /// Any other tuning field (e.g. `speed`) passes through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_stability() -> f64 {
    0.5
}

fn default_similarity_boost() -> f64 {
    0.75
}

fn default_use_speaker_boost() -> bool {
    true
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            stability: default_stability(),
            similarity_boost: default_similarity_boost(),
            style: 0.0,
            use_speaker_boost: default_use_speaker_boost(),
            extra: Map::new(),
        }
    }
}

/// A fully resolved synthesis request, defaults already applied.
#[derive(Debug, Clone)]
pub struct SpeechRequest {
    pub text: String,
    pub model_id: String,
    pub voice_settings: VoiceSettings,
    pub output_format: String,
}

impl SpeechRequest {
    pub fn new(
        text: String,
        model_id: Option<String>,
        voice_settings: Option<VoiceSettings>,
        output_format: Option<String>,
    ) -> Self {
        Self {
            text,
            model_id: non_empty(model_id).unwrap_or_else(|| DEFAULT_MODEL_ID.to_string()),
            voice_settings: voice_settings.unwrap_or_default(),
            output_format: non_empty(output_format)
                .unwrap_or_else(|| DEFAULT_OUTPUT_FORMAT.to_string()),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// JSON body of the upstream text-to-speech call.
#[derive(Debug, Serialize)]
pub(crate) struct SynthesisBody<'a> {
    pub text: &'a str,
    pub model_id: &'a str,
    pub voice_settings: &'a VoiceSettings,
}

impl<'a> From<&'a SpeechRequest> for SynthesisBody<'a> {
    fn from(request: &'a SpeechRequest) -> Self {
        Self {
            text: &request.text,
            model_id: &request.model_id,
            voice_settings: &request.voice_settings,
        }
    }
}
