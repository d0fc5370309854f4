//! Sermon archive, sermon notes, and the model-backed study helpers.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;

use super::{ApiError, CurrentWorkspace, bible_error, community_error, flow_error, validation_error};
use crate::AppState;
use crate::bible::{Passage, PassageRequest};
use crate::flows::run_flow;
use crate::flows::sermon::{SummarizeSermon, SummarizeSermonInput, SummarizeSermonOutput};
use crate::flows::sermon_search::{SermonSearchInput, search_sermons};
use crate::flows::verse::{ExplainVerse, ExplainVerseInput, ExplainVerseOutput};
use crate::sermons::{self, Sermon, SermonNote};

/// Either an archived sermon id or free text. Explicit fields override the
/// archived sermon's title and summary.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummarizeRequest {
    #[serde(default)]
    pub sermon_id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

/// Explain inline text, or a passage fetched first from the Bible service.
#[derive(Debug, Default, Deserialize)]
pub struct ExplainRequest {
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub passage: Option<PassageRequest>,
    #[serde(default)]
    pub question: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NoteRequest {
    pub text: String,
}

/// GET /api/sermons
async fn list_sermons(State(state): State<AppState>) -> Json<Vec<Sermon>> {
    Json(state.sermons.as_ref().clone())
}

/// GET /api/sermons/{id}
async fn get_sermon(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Sermon>, StatusCode> {
    sermons::find(&state.sermons, &id)
        .cloned()
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

/// POST /api/sermons/search
async fn search_handler(
    State(state): State<AppState>,
    Json(input): Json<SermonSearchInput>,
) -> Result<Json<Vec<Sermon>>, ApiError> {
    search_sermons(&state.sermons, &input)
        .map(Json)
        .map_err(|e| validation_error(&e))
}

/// POST /api/sermons/summarize
async fn summarize_handler(
    State(state): State<AppState>,
    Json(req): Json<SummarizeRequest>,
) -> Result<Json<SummarizeSermonOutput>, ApiError> {
    let archived = match req.sermon_id.as_deref() {
        Some(id) => Some(sermons::find(&state.sermons, id).ok_or_else(|| {
            (StatusCode::NOT_FOUND, format!("sermon {id} not found"))
        })?),
        None => None,
    };

    let input = SummarizeSermonInput {
        title: req
            .title
            .or_else(|| archived.map(|s| s.title.clone()))
            .unwrap_or_default(),
        content: req
            .content
            .or_else(|| archived.map(|s| s.summary.clone()))
            .unwrap_or_default(),
    };

    let output = run_flow(state.model.as_ref(), &SummarizeSermon, &input)
        .await
        .map_err(|e| flow_error(&e))?;
    Ok(Json(output))
}

/// GET /api/sermons/{id}/note
async fn get_note(
    current: CurrentWorkspace,
    Path(id): Path<String>,
) -> Result<Json<SermonNote>, StatusCode> {
    current
        .workspace
        .lock()
        .community
        .note(&id)
        .cloned()
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

/// PUT /api/sermons/{id}/note - blank text deletes the note.
async fn save_note(
    current: CurrentWorkspace,
    Path(id): Path<String>,
    Json(req): Json<NoteRequest>,
) -> Result<Response, ApiError> {
    let saved = current
        .workspace
        .lock()
        .community
        .save_note(&id, &req.text)
        .map_err(|e| community_error(&e))?;
    Ok(match saved {
        Some(note) => Json(note).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    })
}

/// GET /api/bible/passage?book=&chapter=&verse=&endVerse=
async fn passage_handler(
    State(state): State<AppState>,
    Query(req): Query<PassageRequest>,
) -> Result<Json<Passage>, ApiError> {
    state
        .bible
        .fetch_passage(&req)
        .await
        .map(Json)
        .map_err(|e| bible_error(&e))
}

/// POST /api/verses/explain
async fn explain_handler(
    State(state): State<AppState>,
    Json(req): Json<ExplainRequest>,
) -> Result<Json<ExplainVerseOutput>, ApiError> {
    let input = match (req.passage, req.reference, req.text) {
        (_, Some(reference), Some(text)) => ExplainVerseInput {
            reference,
            text,
            question: req.question,
        },
        (Some(passage), _, _) => {
            let fetched = state
                .bible
                .fetch_passage(&passage)
                .await
                .map_err(|e| bible_error(&e))?;
            ExplainVerseInput::from_passage(&fetched, req.question)
        }
        (None, reference, text) => ExplainVerseInput {
            reference: reference.unwrap_or_default(),
            text: text.unwrap_or_default(),
            question: req.question,
        },
    };

    let output = run_flow(state.model.as_ref(), &ExplainVerse, &input)
        .await
        .map_err(|e| flow_error(&e))?;
    Ok(Json(output))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/sermons", get(list_sermons))
        .route("/api/sermons/search", post(search_handler))
        .route("/api/sermons/summarize", post(summarize_handler))
        .route("/api/sermons/{id}", get(get_sermon))
        .route("/api/sermons/{id}/note", get(get_note).put(save_note))
        .route("/api/bible/passage", get(passage_handler))
        .route("/api/verses/explain", post(explain_handler))
}
