use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use readalong_core::{Role, UserId};

use crate::database::Database;
use crate::error::StoreError;
use crate::row_helpers;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UserRow {
    pub id: UserId,
    pub name: String,
    pub email: String,
    /// Opaque digest string owned by the credential service.
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub created_at: String,
}

pub struct UserRepo {
    db: Database,
}

impl UserRepo {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Create a user. Email addresses are unique; a duplicate is a Conflict.
    #[instrument(skip(self, password_hash), fields(email))]
    pub fn create(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
        role: Role,
    ) -> Result<UserRow, StoreError> {
        self.db.with_conn(|conn| {
            let exists: Option<i64> = conn
                .query_row("SELECT id FROM users WHERE email = ?1", [email], |row| {
                    row.get(0)
                })
                .ok();
            if exists.is_some() {
                return Err(StoreError::Conflict(format!("user {email}")));
            }

            let now = Utc::now().to_rfc3339();
            conn.execute(
                "INSERT INTO users (name, email, password_hash, role, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![name, email, password_hash, role.to_string(), now],
            )?;

            Ok(UserRow {
                id: UserId::from_raw(conn.last_insert_rowid()),
                name: name.to_string(),
                email: email.to_string(),
                password_hash: password_hash.to_string(),
                role,
                created_at: now,
            })
        })
    }

    /// Look a user up by email (login path). NotFound when absent.
    #[instrument(skip(self), fields(email))]
    pub fn find_by_email(&self, email: &str) -> Result<UserRow, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, email, password_hash, role, created_at
                 FROM users WHERE email = ?1",
            )?;
            let mut rows = stmt.query([email])?;
            match rows.next()? {
                Some(row) => row_to_user(row),
                None => Err(StoreError::NotFound(format!("user {email}"))),
            }
        })
    }

    /// Get a user by ID.
    #[instrument(skip(self), fields(user_id = %id))]
    pub fn get(&self, id: UserId) -> Result<UserRow, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, email, password_hash, role, created_at
                 FROM users WHERE id = ?1",
            )?;
            let mut rows = stmt.query([id.as_i64()])?;
            match rows.next()? {
                Some(row) => row_to_user(row),
                None => Err(StoreError::NotFound(format!("user {id}"))),
            }
        })
    }
}

fn row_to_user(row: &rusqlite::Row<'_>) -> Result<UserRow, StoreError> {
    let role_str: String = row_helpers::get(row, 4, "users", "role")?;

    Ok(UserRow {
        id: UserId::from_raw(row_helpers::get::<i64>(row, 0, "users", "id")?),
        name: row_helpers::get(row, 1, "users", "name")?,
        email: row_helpers::get(row, 2, "users", "email")?,
        password_hash: row_helpers::get(row, 3, "users", "password_hash")?,
        role: row_helpers::parse_enum(&role_str, "users", "role")?,
        created_at: row_helpers::get(row, 5, "users", "created_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Database {
        Database::in_memory().unwrap()
    }

    #[test]
    fn create_user() {
        let repo = UserRepo::new(test_db());
        let user = repo
            .create("Student User", "student@example.com", "v1$s$h", Role::Student)
            .unwrap();
        assert!(user.id.as_i64() > 0);
        assert_eq!(user.email, "student@example.com");
        assert_eq!(user.role, Role::Student);
    }

    #[test]
    fn duplicate_email_is_conflict() {
        let repo = UserRepo::new(test_db());
        repo.create("A", "same@example.com", "h1", Role::Student)
            .unwrap();
        let result = repo.create("B", "same@example.com", "h2", Role::Student);
        assert!(matches!(result, Err(StoreError::Conflict(_))));
    }

    #[test]
    fn find_by_email() {
        let repo = UserRepo::new(test_db());
        let created = repo
            .create("Admin", "admin@example.com", "h", Role::Admin)
            .unwrap();
        let found = repo.find_by_email("admin@example.com").unwrap();
        assert_eq!(found.id, created.id);
        assert_eq!(found.role, Role::Admin);
        assert_eq!(found.password_hash, "h");
    }

    #[test]
    fn find_unknown_email_fails() {
        let repo = UserRepo::new(test_db());
        let result = repo.find_by_email("nobody@example.com");
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[test]
    fn get_by_id() {
        let repo = UserRepo::new(test_db());
        let created = repo.create("A", "a@example.com", "h", Role::Student).unwrap();
        let fetched = repo.get(created.id).unwrap();
        assert_eq!(fetched.email, "a@example.com");
    }

    #[test]
    fn get_nonexistent_fails() {
        let repo = UserRepo::new(test_db());
        assert!(repo.get(UserId::from_raw(999)).is_err());
    }

    #[test]
    fn invalid_role_returns_corrupt_row() {
        let db = test_db();
        db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (name, email, password_hash, role, created_at)
                 VALUES ('X', 'x@example.com', 'h', 'student', '2026-01-01T00:00:00Z')",
                [],
            )?;
            // Bypass the CHECK constraint to simulate a corrupt row.
            conn.execute_batch(
                "PRAGMA ignore_check_constraints = ON;
                 UPDATE users SET role = 'wizard' WHERE email = 'x@example.com';",
            )?;
            Ok(())
        })
        .unwrap();

        let repo = UserRepo::new(db);
        let result = repo.find_by_email("x@example.com");
        assert!(matches!(result, Err(StoreError::CorruptRow { .. })));
    }
}
