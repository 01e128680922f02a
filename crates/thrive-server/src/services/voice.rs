//! Speech-to-text proxy for a Deepgram-compatible `listen` endpoint.

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VoiceError {
    #[error("transcription request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("transcription service error: {0}")]
    Upstream(String),
    #[error("transcription service returned no transcript")]
    EmptyResult,
}

#[derive(Debug, Deserialize)]
struct ListenResponse {
    results: ListenResults,
}

#[derive(Debug, Deserialize)]
struct ListenResults {
    #[serde(default)]
    channels: Vec<ListenChannel>,
}

#[derive(Debug, Deserialize)]
struct ListenChannel {
    #[serde(default)]
    alternatives: Vec<ListenAlternative>,
}

#[derive(Debug, Deserialize)]
struct ListenAlternative {
    #[serde(default)]
    transcript: String,
    #[serde(default)]
    confidence: Option<f64>,
}

/// Error body returned by the upstream on failure.
#[derive(Debug, Deserialize)]
struct ListenError {
    #[serde(default, alias = "error", alias = "message")]
    err_msg: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transcript {
    pub text: String,
    pub confidence: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct TranscriptionClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl TranscriptionClient {
    pub fn new(
        client: reqwest::Client,
        endpoint: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            api_key,
            timeout,
        }
    }

    pub async fn transcribe(
        &self,
        audio: Vec<u8>,
        content_type: &str,
    ) -> Result<Transcript, VoiceError> {
        let mut request = self
            .client
            .post(&self.endpoint)
            .timeout(self.timeout)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(audio);
        if let Some(key) = &self.api_key {
            request = request.header(reqwest::header::AUTHORIZATION, format!("Token {key}"));
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ListenError>(&body)
                .ok()
                .and_then(|e| e.err_msg)
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| format!("upstream returned {}", status.as_u16()));
            return Err(VoiceError::Upstream(message));
        }

        let parsed: ListenResponse = response
            .json()
            .await
            .map_err(|e| VoiceError::Upstream(format!("unreadable response: {e}")))?;
        let best = parsed
            .results
            .channels
            .into_iter()
            .next()
            .and_then(|c| c.alternatives.into_iter().next())
            .ok_or(VoiceError::EmptyResult)?;

        Ok(Transcript {
            text: best.transcript.trim().to_string(),
            confidence: best.confidence,
        })
    }
}
