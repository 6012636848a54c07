use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::tts::UpstreamError;

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Upstream rejected the API key")]
    Unauthorized,

    #[error("Voice not found: {0}")]
    VoiceNotFound(String),

    #[error("Upstream quota exceeded")]
    QuotaExceeded,

    #[error("TTS generation failed: {0}")]
    TtsError(String),

    #[error("Voice listing failed: {0}")]
    VoicesError(String),

    #[error("Audio file not found: {0}")]
    AudioNotFound(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl AppError {
    /// Translate a failed synthesis call. Only 401, 404 and 429 are surfaced as-is.
    pub fn from_synthesis(err: UpstreamError, voice_id: &str) -> Self {
        if let Some(body) = err.body() {
            tracing::error!("Upstream error body: {}", body);
        }

        match err.status() {
            Some(401) => AppError::Unauthorized,
            Some(404) => AppError::VoiceNotFound(voice_id.to_string()),
            Some(429) => AppError::QuotaExceeded,
            _ => AppError::TtsError(err.to_string()),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message, details) = match &self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.as_str(), None),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "API key inválida", None),
            AppError::VoiceNotFound(_) => (StatusCode::NOT_FOUND, "Voice ID no encontrado", None),
            AppError::QuotaExceeded => (
                StatusCode::TOO_MANY_REQUESTS,
                "Límite de cuota excedido",
                None,
            ),
            AppError::TtsError(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error al generar audio",
                Some(msg.clone()),
            ),
            AppError::VoicesError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error al obtener voces",
                None,
            ),
            AppError::AudioNotFound(_) => (StatusCode::NOT_FOUND, "Archivo no encontrado", None),
            AppError::IoError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error interno del servidor",
                None,
            ),
        };

        if status.is_server_error() {
            tracing::error!("Request failed: {} - {}", status, self);
        } else {
            tracing::warn!("Request rejected: {} - {}", status, self);
        }

        (
            status,
            Json(ErrorResponse {
                error: message.to_string(),
                details,
            }),
        )
            .into_response()
    }
}
