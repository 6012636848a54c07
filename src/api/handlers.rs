use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, Request, State,
    },
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use tower::ServiceExt;
use tower_http::services::ServeFile;

use super::{
    HealthResponse, SynthesizeQuery, SynthesizeRequest, SynthesizeResponse, SERVICE_NAME,
    SUCCESS_MESSAGE,
};
use crate::api::routes::AppState;
use crate::error::AppError;
use crate::tts::SpeechRequest;

const LOG_PREVIEW_CHARS: usize = 50;

pub async fn synthesize(
    State(state): State<Arc<AppState>>,
    Path(voice_id): Path<String>,
    query: Result<Query<SynthesizeQuery>, QueryRejection>,
    payload: Result<Json<SynthesizeRequest>, JsonRejection>,
) -> Result<Json<SynthesizeResponse>, AppError> {
    let Query(query) = query?;
    let Json(payload) = payload?;

    // Validate input
    let text = payload.text.unwrap_or_default();
    if text.trim().is_empty() {
        return Err(AppError::BadRequest("El texto es requerido".into()));
    }

    let preview: String = text.chars().take(LOG_PREVIEW_CHARS).collect();
    tracing::info!("Generating audio for: \"{}...\" (voice {})", preview, voice_id);

    let request = SpeechRequest::new(
        text,
        payload.model_id,
        payload.voice_settings,
        query.output_format,
    );

    let audio = state.tts.speak(&voice_id, &request).await?;
    tracing::info!("Audio ready: {}", audio.filename);

    Ok(Json(SynthesizeResponse {
        success: true,
        audio_url: audio.url,
        voice_id,
        // Length as UTF-16 code units, the way browser clients count it.
        text_length: request.text.encode_utf16().count(),
        model: request.model_id,
        message: SUCCESS_MESSAGE.to_string(),
    }))
}

/// Relay the upstream catalogue byte for byte.
pub async fn list_voices(State(state): State<Arc<AppState>>) -> Result<Response, AppError> {
    let voices = state.tts.list_voices().await?;
    let content_type = voices
        .content_type
        .unwrap_or_else(|| "application/json".to_string());

    Ok(([(header::CONTENT_TYPE, content_type)], voices.body).into_response())
}

pub async fn serve_audio(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
    request: Request,
) -> Result<Response, AppError> {
    let path = state.store.locate(&filename).await?;

    let response = match ServeFile::new(path).oneshot(request).await {
        Ok(response) => response,
        Err(never) => match never {},
    };

    Ok(response.into_response())
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        service: SERVICE_NAME.to_string(),
        uptime: state.started_at.elapsed().as_secs_f64(),
    })
}
