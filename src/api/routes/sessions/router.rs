//! Router for the chat sessions API

use std::convert::Infallible;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, sse::Event, sse::KeepAlive, sse::Sse},
    routing::{get, post, put},
};
use tokio::sync::mpsc;
use tokio_stream::StreamExt as _;
use tokio_stream::wrappers::UnboundedReceiverStream;
use uuid::Uuid;

use super::public;
use crate::ai::ProviderKind;
use crate::ai::chat::ChatSession;
use crate::api::public::ApiError;
use crate::api::state::{SharedState, write_state};

fn not_found(id: &str) -> axum::response::Response {
    (
        StatusCode::NOT_FOUND,
        format!("Chat session {} not found", id),
    )
        .into_response()
}

fn event(name: &str, payload: &impl serde::Serialize) -> Event {
    let data = serde_json::to_value(payload)
        .map(|v| v.to_string())
        .unwrap_or_default();
    Event::default().event(name).data(data)
}

/// Start a new session with an empty transcript and the default
/// provider selected
async fn create_session(
    State(state): State<SharedState>,
) -> Result<impl IntoResponse, ApiError> {
    let id = Uuid::new_v4().to_string();
    let mut shared_state = write_state(&state)?;
    let session = ChatSession::new(
        &id,
        &shared_state.config.system_message,
        shared_state.registry.default_selection(),
    );
    let resp = public::SessionResponse::from(&session);
    shared_state.insert_session(session);
    tracing::debug!("Created chat session {}", id);

    Ok((StatusCode::CREATED, Json(resp)))
}

/// Get the visible transcript and current selection of a session
async fn get_session(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let session = write_state(&state)?.session(&id);
    let Some(session) = session else {
        return Ok(not_found(&id));
    };
    let session = session.lock().await;

    Ok(Json(public::SessionResponse::from(&*session)).into_response())
}

/// End a session, dropping its transcript
async fn delete_session(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let removed = write_state(&state)?.remove_session(&id);
    if !removed {
        return Ok(not_found(&id));
    }
    tracing::debug!("Deleted chat session {}", id);

    Ok(StatusCode::NO_CONTENT.into_response())
}

/// Clear the conversation, keeping only the system message
async fn reset_session(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let session = write_state(&state)?.session(&id);
    let Some(session) = session else {
        return Ok(not_found(&id));
    };
    let mut session = session.lock().await;
    session.reset();

    Ok(Json(public::SessionResponse::from(&*session)).into_response())
}

/// Switch the provider and model used for the next messages
async fn select_provider(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(payload): Json<public::SelectProviderRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (session, registry) = {
        let mut shared_state = write_state(&state)?;
        (shared_state.session(&id), shared_state.registry.clone())
    };
    let Some(session) = session else {
        return Ok(not_found(&id));
    };

    let kind = match payload.provider.parse::<ProviderKind>() {
        Ok(kind) => kind,
        Err(e) => return Ok((StatusCode::BAD_REQUEST, e.to_string()).into_response()),
    };

    let mut session = session.lock().await;
    if let Err(e) = session.select(&registry, kind, payload.model.as_deref()) {
        return Ok((StatusCode::BAD_REQUEST, e.to_string()).into_response());
    }

    Ok(Json(public::SessionResponse::from(&*session)).into_response())
}

/// Add a user message to the session and stream the reply
async fn send_message(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(payload): Json<public::MessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if payload.message.trim().is_empty() {
        return Ok((StatusCode::BAD_REQUEST, "Message can not be empty").into_response());
    }

    let (session, registry) = {
        let mut shared_state = write_state(&state)?;
        (shared_state.session(&id), shared_state.registry.clone())
    };
    let Some(session) = session else {
        return Ok(not_found(&id));
    };

    let (tx, rx) = mpsc::unbounded_channel::<Event>();
    let sse_stream = UnboundedReceiverStream::new(rx).map(Ok::<Event, Infallible>);

    // The exchange runs to completion even if the client goes away so
    // the reply still ends up in the transcript
    tokio::spawn(async move {
        let mut session = session.lock().await;
        let fragment_tx = tx.clone();
        let exchange = session
            .exchange(&registry, &payload.message, move |fragment| {
                let payload = public::FragmentEvent {
                    content: fragment.to_string(),
                };
                let _ = fragment_tx.send(event("fragment", &payload));
            })
            .await;

        let done = public::DoneEvent::from(exchange);
        let _ = tx.send(event("done", &done));
    });

    let resp = Sse::new(sse_stream)
        .keep_alive(KeepAlive::default().text("keep-alive"))
        .into_response();

    Ok(resp)
}

/// Create the sessions router
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/", post(create_session))
        .route("/{id}", get(get_session).delete(delete_session))
        .route("/{id}/messages", post(send_message))
        .route("/{id}/reset", post(reset_session))
        .route("/{id}/provider", put(select_provider))
}
