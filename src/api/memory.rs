//! Long-term memory for the signed-in member.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};
use serde::Deserialize;

use super::{ApiError, CurrentWorkspace, community_error};
use crate::AppState;
use crate::community::CommunityError;
use crate::memory::{LongTermMemory, RetrieveResult, StoreResult};

const DEFAULT_RETRIEVE_LIMIT: usize = 5;

#[derive(Debug, Deserialize)]
pub struct StoreMemoryRequest {
    pub text: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct RetrieveMemoryQuery {
    pub q: String,
    #[serde(default)]
    pub limit: Option<usize>,
}

fn memory_and_user(
    state: &AppState,
    current: &CurrentWorkspace,
) -> Result<(Arc<dyn LongTermMemory>, String), ApiError> {
    let memory = state
        .memory
        .as_ref()
        .map(Arc::clone)
        .ok_or((StatusCode::SERVICE_UNAVAILABLE, "Memory not enabled".to_string()))?;
    let user_id = current
        .workspace
        .lock()
        .community
        .current_user()
        .map(|p| p.id.clone())
        .ok_or_else(|| community_error(&CommunityError::NotAuthenticated))?;
    Ok((memory, user_id))
}

/// POST /api/memory
pub async fn store_handler(
    State(state): State<AppState>,
    current: CurrentWorkspace,
    Json(req): Json<StoreMemoryRequest>,
) -> Result<(StatusCode, Json<StoreResult>), ApiError> {
    let (memory, user_id) = memory_and_user(&state, &current)?;
    let metadata = if req.metadata.is_null() {
        serde_json::json!({})
    } else {
        req.metadata
    };

    let result = memory.store(&user_id, &req.text, metadata).await;
    let status = if result.success {
        StatusCode::CREATED
    } else {
        StatusCode::UNPROCESSABLE_ENTITY
    };
    Ok((status, Json(result)))
}

/// GET /api/memory?q=&limit=
pub async fn retrieve_handler(
    State(state): State<AppState>,
    current: CurrentWorkspace,
    Query(query): Query<RetrieveMemoryQuery>,
) -> Result<Json<RetrieveResult>, ApiError> {
    let (memory, user_id) = memory_and_user(&state, &current)?;
    let limit = query.limit.unwrap_or(DEFAULT_RETRIEVE_LIMIT);
    Ok(Json(memory.retrieve(&user_id, &query.q, limit).await))
}
