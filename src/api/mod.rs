//! JSON API.
//!
//! Every route except `/health` runs against the caller's workspace, chosen
//! by the `x-session-id` request header. Errors leave handlers as
//! `(StatusCode, String)`.

pub mod assistant;
pub mod auth;
pub mod community;
pub mod conversations;
pub mod memory;

use axum::{
    Router,
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    routing::{get, post},
};

use crate::AppState;
use crate::auth::AuthError;
use crate::bible::BibleError;
use crate::community::CommunityError;
use crate::error::ValidationError;
use crate::flows::FlowError;
use crate::session::ConversationError;
use crate::workspace::SharedWorkspace;

/// Header naming the client session.
pub const SESSION_HEADER: &str = "x-session-id";

/// Longest accepted session id.
const MAX_SESSION_ID_LEN: usize = 128;

pub type ApiError = (StatusCode, String);

/// The workspace of the requesting client session.
#[derive(Debug, Clone)]
pub struct CurrentWorkspace {
    pub session_id: String,
    pub workspace: SharedWorkspace,
}

impl FromRequestParts<AppState> for CurrentWorkspace {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let session_id = parts
            .headers
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                (
                    StatusCode::BAD_REQUEST,
                    format!("missing {SESSION_HEADER} header"),
                )
            })?;
        if session_id.len() > MAX_SESSION_ID_LEN {
            return Err((
                StatusCode::BAD_REQUEST,
                format!("{SESSION_HEADER} must be at most {MAX_SESSION_ID_LEN} bytes"),
            ));
        }

        Ok(Self {
            workspace: state.workspaces.get_or_create(session_id),
            session_id: session_id.to_string(),
        })
    }
}

pub(crate) fn validation_error(e: &ValidationError) -> ApiError {
    (StatusCode::UNPROCESSABLE_ENTITY, e.to_string())
}

pub(crate) fn community_error(e: &CommunityError) -> ApiError {
    let status = match e {
        CommunityError::NotAuthenticated => StatusCode::UNAUTHORIZED,
        CommunityError::NotFound { .. } => StatusCode::NOT_FOUND,
        CommunityError::Forbidden(_) => StatusCode::FORBIDDEN,
        CommunityError::Invalid(_) => StatusCode::UNPROCESSABLE_ENTITY,
    };
    (status, e.to_string())
}

pub(crate) fn conversation_error(e: &ConversationError) -> ApiError {
    let status = match e {
        ConversationError::UnknownConversation(_) | ConversationError::UnknownMessage(_) => {
            StatusCode::NOT_FOUND
        }
        ConversationError::MessageFinalized(_) => StatusCode::CONFLICT,
        ConversationError::EmptyTitle => StatusCode::UNPROCESSABLE_ENTITY,
    };
    (status, e.to_string())
}

pub(crate) fn flow_error(e: &FlowError) -> ApiError {
    let status = match e {
        FlowError::InvalidInput(_) => StatusCode::UNPROCESSABLE_ENTITY,
        FlowError::Model(_) | FlowError::InvalidOutput(_) => StatusCode::BAD_GATEWAY,
    };
    (status, e.to_string())
}

pub(crate) fn auth_error(e: &AuthError) -> ApiError {
    let status = match e {
        AuthError::Invalid(_) => StatusCode::UNPROCESSABLE_ENTITY,
        AuthError::EmailTaken(_) => StatusCode::CONFLICT,
        AuthError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, e.to_string())
}

pub(crate) fn bible_error(e: &BibleError) -> ApiError {
    let status = match e {
        BibleError::Invalid(_) => StatusCode::UNPROCESSABLE_ENTITY,
        BibleError::Status(404) => StatusCode::NOT_FOUND,
        BibleError::Http(_) | BibleError::Status(_) => StatusCode::BAD_GATEWAY,
    };
    (status, e.to_string())
}

async fn health() -> &'static str {
    "ok"
}

/// All API routes, without middleware.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .merge(auth::router())
        .merge(conversations::router())
        .merge(community::router())
        .merge(assistant::router())
        .route(
            "/api/memory",
            post(memory::store_handler).get(memory::retrieve_handler),
        )
}
