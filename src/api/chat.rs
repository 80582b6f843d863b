use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use futures_util::stream::{self, Stream};
use tokio::sync::broadcast;

use crate::chat::SessionEvent;
use crate::error::ChatError;
use crate::models::{ConversationView, QueryRequest, QueryResponse};
use crate::state::AppState;

/// GET /api/conversation - Transcript and busy flag
pub async fn get_conversation(State(state): State<AppState>) -> Json<ConversationView> {
    Json(state.session.view())
}

/// POST /api/query - Run a chat turn or a passage search, depending on the
/// saved mode.
pub async fn query(
    State(state): State<AppState>,
    Json(req): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, (StatusCode, String)> {
    let settings = state.current_settings();
    let session = Arc::clone(&state.session);

    // Own task: a dropped connection must not cancel the turn halfway.
    let task = tokio::spawn(async move { session.submit(&req.query, &settings).await });
    match task.await {
        Ok(result) => result.map(Json).map_err(error_response),
        Err(e) => {
            tracing::error!("Query task failed: {e}");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Query task failed: {e}"),
            ))
        }
    }
}

/// GET /api/events - SSE feed of session changes
pub async fn events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.session.subscribe();

    let event_stream = stream::unfold(rx, |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(event) => return Some((Ok::<_, Infallible>(to_sse(&event)), rx)),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!("Event subscriber lagged, skipped {skipped} events");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    });

    Sse::new(event_stream).keep_alive(KeepAlive::default())
}

fn to_sse(event: &SessionEvent) -> Event {
    match Event::default().event(event.name()).json_data(event) {
        Ok(sse) => sse,
        Err(e) => {
            tracing::warn!("Failed to encode session event: {e}");
            Event::default().event(event.name())
        }
    }
}

pub(crate) fn error_response(err: ChatError) -> (StatusCode, String) {
    let status = match &err {
        ChatError::Validation(_) => StatusCode::BAD_REQUEST,
        ChatError::Busy => StatusCode::CONFLICT,
        ChatError::RetrievalFailed(_)
        | ChatError::GenerationFailed(_)
        | ChatError::StreamReadFailed { .. } => StatusCode::BAD_GATEWAY,
    };
    (status, err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_mapping() {
        assert_eq!(
            error_response(ChatError::validation("Please enter a query.")),
            (StatusCode::BAD_REQUEST, "Please enter a query.".to_string())
        );
        assert_eq!(error_response(ChatError::Busy).0, StatusCode::CONFLICT);
        assert_eq!(
            error_response(ChatError::RetrievalFailed("x".into())).0,
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            error_response(ChatError::GenerationFailed("x".into())).0,
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_stream_error_body_has_no_partial_answer() {
        let (status, body) = error_response(ChatError::StreamReadFailed {
            message: "reset".into(),
            partial: "half an ans".into(),
        });
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(!body.contains("half an ans"));
    }
}
