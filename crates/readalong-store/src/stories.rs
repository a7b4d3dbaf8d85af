use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use readalong_core::{Difficulty, StoryId};

use crate::database::Database;
use crate::error::StoreError;
use crate::row_helpers;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoryRow {
    pub id: StoryId,
    pub title: String,
    pub text: String,
    pub video_url: Option<String>,
    pub difficulty: Difficulty,
    pub created_at: String,
}

/// List-view projection: the full text is only fetched per story.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorySummary {
    pub id: StoryId,
    pub title: String,
    pub difficulty: Difficulty,
    pub created_at: String,
}

pub struct StoryRepo {
    db: Database,
}

impl StoryRepo {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    #[instrument(skip(self, text), fields(title))]
    pub fn create(
        &self,
        title: &str,
        text: &str,
        video_url: Option<&str>,
        difficulty: Difficulty,
    ) -> Result<StoryRow, StoreError> {
        self.db.with_conn(|conn| {
            let now = Utc::now().to_rfc3339();
            conn.execute(
                "INSERT INTO stories (title, text, video_url, difficulty, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![title, text, video_url, difficulty.to_string(), now],
            )?;

            Ok(StoryRow {
                id: StoryId::from_raw(conn.last_insert_rowid()),
                title: title.to_string(),
                text: text.to_string(),
                video_url: video_url.map(str::to_owned),
                difficulty,
                created_at: now,
            })
        })
    }

    /// Get a story by ID. NotFound when absent.
    #[instrument(skip(self), fields(story_id = %id))]
    pub fn get(&self, id: StoryId) -> Result<StoryRow, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, title, text, video_url, difficulty, created_at
                 FROM stories WHERE id = ?1",
            )?;
            let mut rows = stmt.query([id.as_i64()])?;
            match rows.next()? {
                Some(row) => row_to_story(row),
                None => Err(StoreError::NotFound(format!("story {id}"))),
            }
        })
    }

    /// List story summaries, newest first.
    #[instrument(skip(self))]
    pub fn list(&self) -> Result<Vec<StorySummary>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, title, difficulty, created_at
                 FROM stories ORDER BY created_at DESC, id DESC",
            )?;
            let mut rows = stmt.query([])?;
            let mut results = Vec::new();
            while let Some(row) = rows.next()? {
                let difficulty_str: String = row_helpers::get(row, 2, "stories", "difficulty")?;
                results.push(StorySummary {
                    id: StoryId::from_raw(row_helpers::get::<i64>(row, 0, "stories", "id")?),
                    title: row_helpers::get(row, 1, "stories", "title")?,
                    difficulty: row_helpers::parse_enum(&difficulty_str, "stories", "difficulty")?,
                    created_at: row_helpers::get(row, 3, "stories", "created_at")?,
                });
            }
            Ok(results)
        })
    }

    /// Replace a story's fields. NotFound when the id does not exist.
    #[instrument(skip(self, text), fields(story_id = %id))]
    pub fn update(
        &self,
        id: StoryId,
        title: &str,
        text: &str,
        video_url: Option<&str>,
        difficulty: Difficulty,
    ) -> Result<(), StoreError> {
        self.db.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE stories SET title = ?1, text = ?2, video_url = ?3, difficulty = ?4
                 WHERE id = ?5",
                rusqlite::params![title, text, video_url, difficulty.to_string(), id.as_i64()],
            )?;
            if changed == 0 {
                return Err(StoreError::NotFound(format!("story {id}")));
            }
            Ok(())
        })
    }

    /// Delete a story. Cascades to its reading sessions and their mismatch
    /// logs via foreign keys.
    #[instrument(skip(self), fields(story_id = %id))]
    pub fn delete(&self, id: StoryId) -> Result<(), StoreError> {
        self.db.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM stories WHERE id = ?1", [id.as_i64()])?;
            if changed == 0 {
                return Err(StoreError::NotFound(format!("story {id}")));
            }
            Ok(())
        })
    }
}

fn row_to_story(row: &rusqlite::Row<'_>) -> Result<StoryRow, StoreError> {
    let difficulty_str: String = row_helpers::get(row, 4, "stories", "difficulty")?;

    Ok(StoryRow {
        id: StoryId::from_raw(row_helpers::get::<i64>(row, 0, "stories", "id")?),
        title: row_helpers::get(row, 1, "stories", "title")?,
        text: row_helpers::get(row, 2, "stories", "text")?,
        video_url: row_helpers::get_opt(row, 3, "stories", "video_url")?,
        difficulty: row_helpers::parse_enum(&difficulty_str, "stories", "difficulty")?,
        created_at: row_helpers::get(row, 5, "stories", "created_at")?,
    })
}
