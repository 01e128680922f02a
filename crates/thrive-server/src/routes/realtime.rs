//! Server-sent event stream of the caller's realtime events.
//!
//! The path is public in the authentication layer because browser
//! `EventSource` cannot send headers; the token comes from `?token=` (or a
//! bearer header for non-browser clients) and is checked here.

use std::convert::Infallible;
use std::time::Duration;

use axum::Router;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::get;
use futures_util::stream::Stream;
use serde::Deserialize;
use thrive_api::ApiError;
use thrive_auth::{AuthError, bearer_token};
use thrive_core::RealtimeEvent;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use uuid::Uuid;

use super::QueryParams;
use crate::metrics;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/realtime/events", get(events))
}

const KEEP_ALIVE_SECS: u64 = 15;

#[derive(Debug, Default, Deserialize)]
pub struct StreamQuery {
    pub token: Option<String>,
}

/// Keeps the connection gauge accurate however the stream ends.
struct ConnectionGuard {
    user_id: Uuid,
}

impl ConnectionGuard {
    fn open(user_id: Uuid) -> Self {
        metrics::increment_realtime_connections();
        tracing::debug!(user_id = %user_id, "realtime stream opened");
        Self { user_id }
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        metrics::decrement_realtime_connections();
        tracing::debug!(user_id = %self.user_id, "realtime stream closed");
    }
}

fn to_sse(event: &RealtimeEvent) -> Option<Event> {
    Event::default()
        .event(event.kind.as_str())
        .json_data(event)
        .map_err(|e| tracing::warn!(error = %e, "failed to encode realtime event"))
        .ok()
}

async fn events(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<StreamQuery>,
    headers: HeaderMap,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let token = query
        .token
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .or_else(|| bearer_token(&headers))
        .ok_or_else(|| AuthError::unauthorized("Missing token"))?;
    let auth = state.auth.authenticate(token)?;
    let user_id = auth.user_id;

    // subscribe before announcing so nothing published in between is lost
    let receiver = state.events.subscribe();
    let guard = ConnectionGuard::open(user_id);

    let connected = Event::default()
        .event("connected")
        .data(format!(r#"{{"userId":"{user_id}"}}"#));
    let updates = BroadcastStream::new(receiver).filter_map(move |message| {
        let _guard = &guard;
        match message {
            Ok(event) if event.is_for(user_id) => to_sse(&event).map(Ok::<_, Infallible>),
            Ok(_) => None,
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                tracing::warn!(user_id = %user_id, skipped, "realtime subscriber lagged");
                None
            }
        }
    });
    let stream = tokio_stream::once(Ok(connected)).chain(updates);

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(KEEP_ALIVE_SECS))
            .text("keep-alive"),
    ))
}
