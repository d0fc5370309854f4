use axum::{Json, Router, http::StatusCode, routing::{get, post}};
use serde::Deserialize;

use super::{ApiError, CurrentWorkspace, auth_error};
use crate::AppState;
use crate::auth::AuthState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub display_name: String,
    pub email: String,
    pub password: String,
}

/// GET /api/auth
async fn state_handler(current: CurrentWorkspace) -> Json<AuthState> {
    Json(current.workspace.lock().auth_state().clone())
}

/// POST /api/auth/login
async fn login_handler(
    current: CurrentWorkspace,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthState>, ApiError> {
    let state = current
        .workspace
        .lock()
        .login(&req.email, &req.password)
        .map_err(|e| auth_error(&e))?;
    Ok(Json(state))
}

/// POST /api/auth/signup
async fn signup_handler(
    current: CurrentWorkspace,
    Json(req): Json<SignupRequest>,
) -> Result<(StatusCode, Json<AuthState>), ApiError> {
    let state = current
        .workspace
        .lock()
        .signup(&req.display_name, &req.email, &req.password)
        .map_err(|e| auth_error(&e))?;
    Ok((StatusCode::CREATED, Json(state)))
}

/// POST /api/auth/logout
async fn logout_handler(current: CurrentWorkspace) -> Result<StatusCode, ApiError> {
    current
        .workspace
        .lock()
        .logout()
        .map_err(|e| auth_error(&e))?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/auth", get(state_handler))
        .route("/api/auth/login", post(login_handler))
        .route("/api/auth/signup", post(signup_handler))
        .route("/api/auth/logout", post(logout_handler))
}
