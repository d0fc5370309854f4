//! Conversation threads and the assistant chat.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

use super::{ApiError, CurrentWorkspace, conversation_error, validation_error};
use crate::AppState;
use crate::flows::chat::{ChatExchange, send_message};
use crate::session::{AppendOutcome, Message, ThreadSummary, ThreadView};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationList {
    pub active_id: Option<String>,
    pub conversations: Vec<ThreadSummary>,
}

/// What is on screen: the active thread, or the unsaved draft.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveConversation {
    pub active_id: Option<String>,
    pub messages: Vec<Message>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SaveRequest {
    /// Blank derives a title from the first user message.
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Deserialize)]
pub struct RenameRequest {
    pub title: String,
}

#[derive(Debug, Serialize)]
pub struct SelectResponse {
    pub found: bool,
    #[serde(rename = "activeId")]
    pub active_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AppendResponse {
    pub appended: bool,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

/// GET /api/conversations
async fn list_handler(current: CurrentWorkspace) -> Json<ConversationList> {
    let ws = current.workspace.lock();
    Json(ConversationList {
        active_id: ws.conversations.active_id().map(str::to_string),
        conversations: ws.conversations.list(),
    })
}

/// POST /api/conversations - save the draft as a new thread.
async fn save_handler(
    current: CurrentWorkspace,
    Json(req): Json<SaveRequest>,
) -> Result<(StatusCode, Json<ThreadView>), ApiError> {
    let mut ws = current.workspace.lock();
    let id = ws.conversations.save_draft(&req.title);
    let view = ws
        .conversations
        .thread(&id)
        .map(|t| t.to_view())
        .ok_or_else(|| (StatusCode::INTERNAL_SERVER_ERROR, "saved thread missing".to_string()))?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// POST /api/conversations/new
async fn new_handler(current: CurrentWorkspace) -> StatusCode {
    current.workspace.lock().conversations.new_conversation();
    StatusCode::NO_CONTENT
}

/// GET /api/conversations/active
async fn active_handler(current: CurrentWorkspace) -> Json<ActiveConversation> {
    let ws = current.workspace.lock();
    Json(ActiveConversation {
        active_id: ws.conversations.active_id().map(str::to_string),
        messages: ws.conversations.active_messages(),
    })
}

/// GET /api/conversations/{id}
async fn get_handler(
    current: CurrentWorkspace,
    Path(id): Path<String>,
) -> Result<Json<ThreadView>, StatusCode> {
    current
        .workspace
        .lock()
        .conversations
        .thread(&id)
        .map(|t| Json(t.to_view()))
        .ok_or(StatusCode::NOT_FOUND)
}

/// POST /api/conversations/{id}/select
///
/// An unknown id resets to a new conversation and reports `found: false`.
async fn select_handler(current: CurrentWorkspace, Path(id): Path<String>) -> Json<SelectResponse> {
    let mut ws = current.workspace.lock();
    let found = ws.conversations.select_conversation(&id);
    Json(SelectResponse {
        found,
        active_id: ws.conversations.active_id().map(str::to_string),
    })
}

/// PATCH /api/conversations/{id}
async fn rename_handler(
    current: CurrentWorkspace,
    Path(id): Path<String>,
    Json(req): Json<RenameRequest>,
) -> Result<StatusCode, ApiError> {
    current
        .workspace
        .lock()
        .conversations
        .rename_conversation(&id, &req.title)
        .map_err(|e| conversation_error(&e))?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/conversations/{id}
async fn delete_handler(current: CurrentWorkspace, Path(id): Path<String>) -> StatusCode {
    if current.workspace.lock().conversations.delete_conversation(&id) {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

/// POST /api/conversations/{id}/messages
///
/// Re-delivering a message id already in the thread is accepted and
/// reported as `appended: false`.
async fn append_handler(
    current: CurrentWorkspace,
    Path(id): Path<String>,
    Json(message): Json<Message>,
) -> Result<Json<AppendResponse>, ApiError> {
    let outcome = current
        .workspace
        .lock()
        .conversations
        .append_message(&id, message)
        .map_err(|e| conversation_error(&e))?;
    Ok(Json(AppendResponse {
        appended: outcome == AppendOutcome::Appended,
    }))
}

/// POST /api/chat
async fn chat_handler(
    State(state): State<AppState>,
    current: CurrentWorkspace,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatExchange>, ApiError> {
    tracing::info!(
        session_id = %current.session_id,
        chars = req.message.chars().count(),
        "Received chat request"
    );

    let exchange = send_message(
        &current.workspace,
        state.model.as_ref(),
        state.memory.as_deref(),
        &req.message,
    )
    .await
    .map_err(|e| validation_error(&e))?;
    Ok(Json(exchange))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/conversations", get(list_handler).post(save_handler))
        .route("/api/conversations/new", post(new_handler))
        .route("/api/conversations/active", get(active_handler))
        .route(
            "/api/conversations/{id}",
            get(get_handler).patch(rename_handler).delete(delete_handler),
        )
        .route("/api/conversations/{id}/select", post(select_handler))
        .route("/api/conversations/{id}/messages", post(append_handler))
        .route("/api/chat", post(chat_handler))
}
