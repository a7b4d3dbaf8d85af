use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use readalong_core::{SessionId, StoryId};
use readalong_scoring::align::{self, Mismatch};
use readalong_store::sessions::{SessionDetail, SessionRepo, SessionSummary, UserStats};
use readalong_store::stories::StoryRepo;

use crate::error::ApiError;
use crate::extract::AuthUser;
use crate::server::AppState;

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub story_id: i64,
    pub spoken_text: String,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub session_id: SessionId,
    pub accuracy: f64,
    pub correct_words: u32,
    pub total_words: u32,
    pub mistakes: u32,
    pub mistakes_details: Vec<Mismatch>,
}

/// Score a transcript against a story and persist the session.
///
/// The story lookup happens first: an unknown story id returns 404 before
/// any scoring or persistence.
pub async fn analyze(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let story_id = StoryId::from_raw(req.story_id);
    let story = StoryRepo::new(state.db.clone()).get(story_id)?;

    let report = align::score_texts(&story.text, &req.spoken_text);
    let session = SessionRepo::new(state.db.clone()).record(user.id, story_id, &report)?;

    tracing::info!(
        session_id = %session.id,
        user_id = %user.id,
        story_id = %story_id,
        accuracy = session.accuracy,
        "reading scored"
    );

    Ok(Json(AnalyzeResponse {
        session_id: session.id,
        accuracy: session.accuracy,
        correct_words: session.correct_words,
        total_words: session.total_words,
        mistakes: session.mistakes,
        mistakes_details: report.mismatches,
    }))
}

pub async fn list(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<SessionSummary>>, ApiError> {
    let sessions = SessionRepo::new(state.db.clone()).list_for_user(user.id)?;
    Ok(Json(sessions))
}

pub async fn stats(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<UserStats>, ApiError> {
    let stats = SessionRepo::new(state.db.clone()).stats_for_user(user.id)?;
    Ok(Json(stats))
}

pub async fn detail(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<SessionDetail>, ApiError> {
    let detail =
        SessionRepo::new(state.db.clone()).get_for_user(SessionId::from_raw(id), user.id)?;
    Ok(Json(detail))
}
