//! HTTP client for the ElevenLabs API.

use std::time::Duration;

use bytes::Bytes;
use reqwest::Url;

use super::voice::{SpeechRequest, SynthesisBody};

const API_KEY_HEADER: &str = "xi-api-key";

#[derive(thiserror::Error, Debug)]
pub enum UpstreamError {
    #[error("Request failed with status code {status}")]
    Status { status: u16, body: String },

    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid upstream URL: {0}")]
    InvalidUrl(String),
}

impl UpstreamError {
    /// HTTP status returned by the upstream, if it answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            UpstreamError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Error body sent back by the upstream, if any.
    pub fn body(&self) -> Option<&str> {
        match self {
            UpstreamError::Status { body, .. } if !body.is_empty() => Some(body),
            _ => None,
        }
    }
}

/// A successful upstream response, body left exactly as received.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub content_type: Option<String>,
    pub body: Bytes,
}

pub struct ElevenLabsClient {
    http: reqwest::Client,
    base_url: Url,
    api_key: String,
}

impl ElevenLabsClient {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self, UpstreamError> {
        let base_url =
            Url::parse(base_url).map_err(|_| UpstreamError::InvalidUrl(base_url.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(UpstreamError::InvalidUrl(base_url.to_string()));
        }

        let http = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http,
            base_url,
            api_key: api_key.to_string(),
        })
    }

    /// Synthesize speech and return the raw audio bytes.
    pub async fn text_to_speech(
        &self,
        voice_id: &str,
        request: &SpeechRequest,
    ) -> Result<Bytes, UpstreamError> {
        let url = self.endpoint(&["v1", "text-to-speech", voice_id])?;

        let response = self
            .http
            .post(url)
            .header(API_KEY_HEADER, &self.api_key)
            .query(&[("output_format", request.output_format.as_str())])
            .json(&SynthesisBody::from(request))
            .send()
            .await?;

        let response = check_status(response).await?;
        Ok(response.bytes().await?)
    }

    /// Fetch the voice catalogue as the upstream returns it.
    pub async fn list_voices(&self) -> Result<RawResponse, UpstreamError> {
        let url = self.endpoint(&["v1", "voices"])?;

        let response = self
            .http
            .get(url)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await?;

        let response = check_status(response).await?;
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        Ok(RawResponse {
            content_type,
            body: response.bytes().await?,
        })
    }

    // Segments are percent-encoded, so a voice id can never escape its path slot.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, UpstreamError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| UpstreamError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, UpstreamError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(UpstreamError::Status {
        status: status.as_u16(),
        body,
    })
}
