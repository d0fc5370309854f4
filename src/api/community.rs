//! Profile, directory, feed, prayer, and event routes.

use axum::{
    Json, Router,
    extract::{Path, Query},
    http::StatusCode,
    routing::{get, post},
};
use chrono::Utc;
use serde::Deserialize;

use super::{ApiError, CurrentWorkspace, community_error};
use crate::AppState;
use crate::community::{
    CommunityError, DirectoryEntry, Event, Post, PrayerRequest, Profile, ProfilePatch,
};

#[derive(Debug, Default, Deserialize)]
pub struct MemberQuery {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostRequest {
    pub content: String,
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePrayerRequest {
    pub title: String,
    #[serde(default)]
    pub details: String,
    #[serde(default)]
    pub is_anonymous: bool,
}

/// GET /api/profile
async fn get_profile(current: CurrentWorkspace) -> Result<Json<Profile>, ApiError> {
    current
        .workspace
        .lock()
        .community
        .current_user()
        .cloned()
        .map(Json)
        .ok_or_else(|| community_error(&CommunityError::NotAuthenticated))
}

/// PATCH /api/profile
async fn update_profile(
    current: CurrentWorkspace,
    Json(patch): Json<ProfilePatch>,
) -> Result<Json<Profile>, ApiError> {
    let profile = current
        .workspace
        .lock()
        .update_profile(patch)
        .map_err(|e| community_error(&e))?;
    Ok(Json(profile))
}

/// GET /api/members?q=
async fn search_members(
    current: CurrentWorkspace,
    Query(query): Query<MemberQuery>,
) -> Json<Vec<DirectoryEntry>> {
    let members = current.workspace.lock().community.search_members(&query.q);
    Json(members.iter().map(DirectoryEntry::from).collect())
}

/// GET /api/members/{id}
async fn get_member(
    current: CurrentWorkspace,
    Path(id): Path<String>,
) -> Result<Json<DirectoryEntry>, StatusCode> {
    current
        .workspace
        .lock()
        .community
        .profile(&id)
        .map(|p| Json(DirectoryEntry::from(p)))
        .ok_or(StatusCode::NOT_FOUND)
}

/// GET /api/posts
async fn list_posts(current: CurrentWorkspace) -> Json<Vec<Post>> {
    Json(current.workspace.lock().community.posts().to_vec())
}

/// POST /api/posts
async fn create_post(
    current: CurrentWorkspace,
    Json(req): Json<CreatePostRequest>,
) -> Result<(StatusCode, Json<Post>), ApiError> {
    let post = current
        .workspace
        .lock()
        .community
        .create_post(&req.content, req.image_url)
        .map_err(|e| community_error(&e))?;
    Ok((StatusCode::CREATED, Json(post)))
}

/// POST /api/posts/{id}/like
async fn toggle_like(
    current: CurrentWorkspace,
    Path(id): Path<String>,
) -> Result<Json<Post>, ApiError> {
    let post = current
        .workspace
        .lock()
        .community
        .toggle_like(&id)
        .map_err(|e| community_error(&e))?;
    Ok(Json(post))
}

/// GET /api/prayers
async fn list_prayers(current: CurrentWorkspace) -> Json<Vec<PrayerRequest>> {
    Json(current.workspace.lock().community.prayers())
}

/// POST /api/prayers
async fn create_prayer(
    current: CurrentWorkspace,
    Json(req): Json<CreatePrayerRequest>,
) -> Result<(StatusCode, Json<PrayerRequest>), ApiError> {
    let prayer = current
        .workspace
        .lock()
        .community
        .create_prayer(&req.title, &req.details, req.is_anonymous)
        .map_err(|e| community_error(&e))?;
    Ok((StatusCode::CREATED, Json(prayer)))
}

/// POST /api/prayers/{id}/pray
async fn toggle_prayed(
    current: CurrentWorkspace,
    Path(id): Path<String>,
) -> Result<Json<PrayerRequest>, ApiError> {
    let prayer = current
        .workspace
        .lock()
        .community
        .toggle_prayed(&id)
        .map_err(|e| community_error(&e))?;
    Ok(Json(prayer))
}

/// POST /api/prayers/{id}/answered
async fn mark_answered(
    current: CurrentWorkspace,
    Path(id): Path<String>,
) -> Result<Json<PrayerRequest>, ApiError> {
    let prayer = current
        .workspace
        .lock()
        .community
        .mark_answered(&id)
        .map_err(|e| community_error(&e))?;
    Ok(Json(prayer))
}

/// GET /api/events - upcoming only, soonest first.
async fn list_events(current: CurrentWorkspace) -> Json<Vec<Event>> {
    Json(current.workspace.lock().community.upcoming_events(Utc::now()))
}

/// POST /api/events/{id}/rsvp
async fn toggle_rsvp(
    current: CurrentWorkspace,
    Path(id): Path<String>,
) -> Result<Json<Event>, ApiError> {
    let event = current
        .workspace
        .lock()
        .community
        .toggle_rsvp(&id)
        .map_err(|e| community_error(&e))?;
    Ok(Json(event))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/profile", get(get_profile).patch(update_profile))
        .route("/api/members", get(search_members))
        .route("/api/members/{id}", get(get_member))
        .route("/api/posts", get(list_posts).post(create_post))
        .route("/api/posts/{id}/like", post(toggle_like))
        .route("/api/prayers", get(list_prayers).post(create_prayer))
        .route("/api/prayers/{id}/pray", post(toggle_prayed))
        .route("/api/prayers/{id}/answered", post(mark_answered))
        .route("/api/events", get(list_events))
        .route("/api/events/{id}/rsvp", post(toggle_rsvp))
}
