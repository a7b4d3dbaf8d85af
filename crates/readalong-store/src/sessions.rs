use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use readalong_core::{SessionId, StoryId, UserId};
use readalong_scoring::align::{self, AlignmentReport};

use crate::database::Database;
use crate::error::StoreError;
use crate::row_helpers;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionRow {
    pub id: SessionId,
    pub user_id: UserId,
    pub story_id: StoryId,
    pub accuracy: f64,
    pub correct_words: u32,
    pub total_words: u32,
    pub mistakes: u32,
    pub created_at: String,
}

/// A session joined with its story title, for history listings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionSummary {
    #[serde(flatten)]
    pub session: SessionRow,
    pub story_title: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MistakeRow {
    pub expected_word: String,
    pub spoken_word: String,
    pub position: u32,
}

/// Full session view: the row, its story, and the ordered mismatch log.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionDetail {
    #[serde(flatten)]
    pub session: SessionRow,
    pub story_title: String,
    pub story_text: String,
    pub mistakes_detail: Vec<MistakeRow>,
}

/// Aggregates over one user's reading history.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UserStats {
    pub total_sessions: u32,
    pub average_accuracy: f64,
    pub total_correct_words: u64,
    pub total_mistakes: u64,
}

pub struct SessionRepo {
    db: Database,
}

impl SessionRepo {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Persist a scored reading: one session row plus one mistakes_log row
    /// per mismatch, in position order, atomically. The session id is the
    /// rowid SQLite assigns on insert.
    #[instrument(skip(self, report), fields(user_id = %user_id, story_id = %story_id))]
    pub fn record(
        &self,
        user_id: UserId,
        story_id: StoryId,
        report: &AlignmentReport,
    ) -> Result<SessionRow, StoreError> {
        self.db.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            let now = Utc::now().to_rfc3339();
            let accuracy = align::round2(report.accuracy);

            tx.execute(
                "INSERT INTO reading_sessions
                    (user_id, story_id, accuracy, correct_words, total_words, mistakes, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    user_id.as_i64(),
                    story_id.as_i64(),
                    accuracy,
                    report.correct_words as i64,
                    report.total_words as i64,
                    report.mistakes as i64,
                    now,
                ],
            )?;
            let session_id = SessionId::from_raw(tx.last_insert_rowid());

            {
                let mut stmt = tx.prepare(
                    "INSERT INTO mistakes_log
                        (session_id, expected_word, spoken_word, position, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                )?;
                for mismatch in &report.mismatches {
                    stmt.execute(rusqlite::params![
                        session_id.as_i64(),
                        mismatch.expected,
                        mismatch.spoken,
                        mismatch.position as i64,
                        now,
                    ])?;
                }
            }

            tx.commit()?;

            Ok(SessionRow {
                id: session_id,
                user_id,
                story_id,
                accuracy,
                correct_words: report.correct_words as u32,
                total_words: report.total_words as u32,
                mistakes: report.mistakes as u32,
                created_at: now,
            })
        })
    }

    /// List one user's sessions with story titles, newest first.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub fn list_for_user(&self, user_id: UserId) -> Result<Vec<SessionSummary>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT rs.id, rs.user_id, rs.story_id, rs.accuracy, rs.correct_words,
                        rs.total_words, rs.mistakes, rs.created_at, s.title
                 FROM reading_sessions rs
                 JOIN stories s ON rs.story_id = s.id
                 WHERE rs.user_id = ?1
                 ORDER BY rs.created_at DESC, rs.id DESC",
            )?;
            let mut rows = stmt.query([user_id.as_i64()])?;
            let mut results = Vec::new();
            while let Some(row) = rows.next()? {
                results.push(SessionSummary {
                    session: row_to_session(row)?,
                    story_title: row_helpers::get(row, 8, "stories", "title")?,
                });
            }
            Ok(results)
        })
    }

    /// Get one session with its mismatch log, scoped to its owner.
    /// NotFound both when the id is absent and when it belongs to another
    /// user, so callers cannot probe other readers' history.
    #[instrument(skip(self), fields(session_id = %id, user_id = %user_id))]
    pub fn get_for_user(
        &self,
        id: SessionId,
        user_id: UserId,
    ) -> Result<SessionDetail, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT rs.id, rs.user_id, rs.story_id, rs.accuracy, rs.correct_words,
                        rs.total_words, rs.mistakes, rs.created_at, s.title, s.text
                 FROM reading_sessions rs
                 JOIN stories s ON rs.story_id = s.id
                 WHERE rs.id = ?1 AND rs.user_id = ?2",
            )?;
            let mut rows = stmt.query(rusqlite::params![id.as_i64(), user_id.as_i64()])?;
            let (session, story_title, story_text) = match rows.next()? {
                Some(row) => (
                    row_to_session(row)?,
                    row_helpers::get::<String>(row, 8, "stories", "title")?,
                    row_helpers::get::<String>(row, 9, "stories", "text")?,
                ),
                None => return Err(StoreError::NotFound(format!("session {id}"))),
            };

            let mut stmt = conn.prepare(
                "SELECT expected_word, spoken_word, position
                 FROM mistakes_log WHERE session_id = ?1 ORDER BY position",
            )?;
            let mistakes_detail = stmt
                .query_map([id.as_i64()], |row| {
                    Ok(MistakeRow {
                        expected_word: row.get(0)?,
                        spoken_word: row.get(1)?,
                        position: row.get(2)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(SessionDetail {
                session,
                story_title,
                story_text,
                mistakes_detail,
            })
        })
    }

    /// Aggregate stats over one user's sessions. All zeros when the user has
    /// no history (AVG over no rows is NULL, not an error).
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub fn stats_for_user(&self, user_id: UserId) -> Result<UserStats, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT COUNT(*), AVG(accuracy),
                        COALESCE(SUM(correct_words), 0), COALESCE(SUM(mistakes), 0)
                 FROM reading_sessions WHERE user_id = ?1",
            )?;
            let mut rows = stmt.query([user_id.as_i64()])?;
            let row = rows.next()?.ok_or_else(|| {
                StoreError::Database("aggregate query returned no row".to_string())
            })?;

            Ok(UserStats {
                total_sessions: row_helpers::get(row, 0, "reading_sessions", "count")?,
                average_accuracy: row_helpers::get_opt::<f64>(
                    row,
                    1,
                    "reading_sessions",
                    "avg_accuracy",
                )?
                .unwrap_or(0.0),
                total_correct_words: row_helpers::get::<i64>(
                    row,
                    2,
                    "reading_sessions",
                    "sum_correct",
                )? as u64,
                total_mistakes: row_helpers::get::<i64>(row, 3, "reading_sessions", "sum_mistakes")?
                    as u64,
            })
        })
    }
}

fn row_to_session(row: &rusqlite::Row<'_>) -> Result<SessionRow, StoreError> {
    Ok(SessionRow {
        id: SessionId::from_raw(row_helpers::get::<i64>(row, 0, "reading_sessions", "id")?),
        user_id: UserId::from_raw(row_helpers::get::<i64>(row, 1, "reading_sessions", "user_id")?),
        story_id: StoryId::from_raw(row_helpers::get::<i64>(
            row,
            2,
            "reading_sessions",
            "story_id",
        )?),
        accuracy: row_helpers::get(row, 3, "reading_sessions", "accuracy")?,
        correct_words: row_helpers::get(row, 4, "reading_sessions", "correct_words")?,
        total_words: row_helpers::get(row, 5, "reading_sessions", "total_words")?,
        mistakes: row_helpers::get(row, 6, "reading_sessions", "mistakes")?,
        created_at: row_helpers::get(row, 7, "reading_sessions", "created_at")?,
    })
}
