use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use readalong_core::{Difficulty, StoryId};
use readalong_store::stories::{StoryRepo, StoryRow, StorySummary};

use crate::error::ApiError;
use crate::extract::{AdminUser, AuthUser};
use crate::server::AppState;

#[derive(Debug, Deserialize)]
pub struct StoryPayload {
    pub title: String,
    pub text: String,
    pub video_url: Option<String>,
    #[serde(default)]
    pub difficulty: Difficulty,
}

#[derive(Debug, Serialize)]
pub struct CreatedStory {
    pub id: StoryId,
}

pub async fn list(
    State(state): State<AppState>,
    _user: AuthUser,
) -> Result<Json<Vec<StorySummary>>, ApiError> {
    let stories = StoryRepo::new(state.db.clone()).list()?;
    Ok(Json(stories))
}

pub async fn get(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<StoryRow>, ApiError> {
    let story = StoryRepo::new(state.db.clone()).get(StoryId::from_raw(id))?;
    Ok(Json(story))
}

pub async fn create(
    State(state): State<AppState>,
    admin: AdminUser,
    Json(payload): Json<StoryPayload>,
) -> Result<(StatusCode, Json<CreatedStory>), ApiError> {
    if payload.title.trim().is_empty() || payload.text.trim().is_empty() {
        return Err(ApiError::BadRequest("title and text are required".to_string()));
    }

    let story = StoryRepo::new(state.db.clone()).create(
        &payload.title,
        &payload.text,
        payload.video_url.as_deref(),
        payload.difficulty,
    )?;

    tracing::info!(story_id = %story.id, admin = %admin.0.id, "story created");

    Ok((StatusCode::CREATED, Json(CreatedStory { id: story.id })))
}

pub async fn update(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<i64>,
    Json(payload): Json<StoryPayload>,
) -> Result<StatusCode, ApiError> {
    StoryRepo::new(state.db.clone()).update(
        StoryId::from_raw(id),
        &payload.title,
        &payload.text,
        payload.video_url.as_deref(),
        payload.difficulty,
    )?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn remove(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    StoryRepo::new(state.db.clone()).delete(StoryId::from_raw(id))?;
    Ok(StatusCode::NO_CONTENT)
}
