use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::extract::rejection::BytesRejection;
use axum::http::{HeaderMap, StatusCode, header};
use axum::routing::post;
use serde::{Deserialize, Serialize};
use thrive_api::{ApiError, ApiResponse, ApiResult};
use thrive_auth::CurrentUser;
use thrive_core::model::Task;
use thrive_core::now_utc;

use super::QueryParams;
use super::tasks::{insert_task, normalize_tags};
use crate::services::{TaskAnalysis, TaskDraft};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/voice/transcribe", post(transcribe))
}

const DEFAULT_AUDIO_TYPE: &str = "audio/wav";
const MAX_TITLE_CHARS: usize = 200;

#[derive(Debug, Default, Deserialize)]
pub struct TranscribeQuery {
    #[serde(default)]
    pub create_task: bool,
}

#[derive(Debug, Serialize)]
pub struct Transcription {
    pub transcript: String,
    pub confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task: Option<Task>,
}

fn content_type(headers: &HeaderMap) -> &str {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.trim().is_empty())
        .unwrap_or(DEFAULT_AUDIO_TYPE)
}

/// Task for a spoken request. `None` when nothing usable was said.
pub(crate) fn voice_task(user_id: uuid::Uuid, transcript: &str, analysis: &TaskAnalysis) -> Option<Task> {
    let title: String = transcript.trim().chars().take(MAX_TITLE_CHARS).collect();
    if title.is_empty() {
        return None;
    }
    let mut task = Task::new(user_id, title);
    task.priority = analysis.priority;
    task.estimated_minutes = Some(analysis.estimated_minutes);
    let mut tags = analysis.tags.clone();
    tags.push("voice".to_string());
    task.tags = normalize_tags(tags).unwrap_or_else(|_| vec!["voice".to_string()]);
    Some(task)
}

async fn transcribe(
    State(state): State<AppState>,
    CurrentUser(auth): CurrentUser,
    QueryParams(query): QueryParams<TranscribeQuery>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<Transcription> {
    let audio = body.map_err(|e| match e.status() {
        StatusCode::PAYLOAD_TOO_LARGE => ApiError::payload_too_large("Audio upload is too large"),
        _ => ApiError::bad_request(format!("Invalid request body: {}", e.body_text())),
    })?;
    if audio.is_empty() {
        return Err(ApiError::bad_request("Audio body is empty"));
    }
    let client = state
        .voice
        .as_ref()
        .ok_or_else(|| ApiError::internal("voice transcription is not configured"))?;

    let transcript = client
        .transcribe(audio.to_vec(), content_type(&headers))
        .await
        .map_err(|e| {
            tracing::warn!(error = %e, "transcription failed");
            ApiError::internal(e.to_string())
        })?;

    let task = if query.create_task {
        let draft = TaskDraft {
            title: transcript.text.clone(),
            description: None,
            due_at: None,
        };
        let analysis = state
            .advisor
            .analyze(&draft, now_utc())
            .await
            .map_err(|e| ApiError::internal(e.to_string()))?;
        match voice_task(auth.user_id, &transcript.text, &analysis) {
            Some(task) => Some(insert_task(&state, &task).await?),
            None => None,
        }
    } else {
        None
    };

    let created = task.is_some();
    let body = Transcription {
        transcript: transcript.text,
        confidence: transcript.confidence,
        task,
    };
    Ok(if created {
        ApiResponse::created(body)
    } else {
        ApiResponse::ok(body)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::AnalysisSource;
    use thrive_core::model::TaskPriority;
    use uuid::Uuid;

    fn analysis() -> TaskAnalysis {
        TaskAnalysis {
            priority: TaskPriority::High,
            category: "home".into(),
            estimated_minutes: 25,
            tags: vec!["home".into()],
            suggestions: Vec::new(),
            source: AnalysisSource::Heuristic,
        }
    }

    #[test]
    fn voice_tasks_are_tagged() {
        let task = voice_task(Uuid::new_v4(), " buy groceries ", &analysis()).unwrap();
        assert_eq!(task.title, "buy groceries");
        assert_eq!(task.priority, TaskPriority::High);
        assert_eq!(task.estimated_minutes, Some(25));
        assert_eq!(task.tags, vec!["home".to_string(), "voice".to_string()]);
    }

    #[test]
    fn silence_creates_nothing() {
        assert!(voice_task(Uuid::new_v4(), "   ", &analysis()).is_none());
    }

    #[test]
    fn content_type_defaults_to_wav() {
        let mut headers = HeaderMap::new();
        assert_eq!(content_type(&headers), "audio/wav");
        headers.insert(header::CONTENT_TYPE, "audio/webm".parse().unwrap());
        assert_eq!(content_type(&headers), "audio/webm");
    }
}
