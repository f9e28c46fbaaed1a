//! SQLite backend.
//!
//! Two tables:
//! - `users` — one row per identity, unique on `external_id` and `username`
//! - `generations` — append-only, indexed on `(user_id, created_at)` for
//!   the history listing
//!
//! Timestamps are stored as fixed-width RFC 3339 text so that lexical order
//! matches chronological order.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use codeweaver_core::Language;
use codeweaver_core::error::StoreError;
use codeweaver_core::generation::{Generation, NewGeneration, User};
use codeweaver_core::store::GenerationStore;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow, SqliteSynchronous,
};
use sqlx::{Row, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

/// A persistent store over a pooled SQLite database.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (or create) the database at `url` and run migrations.
    ///
    /// `sqlite::memory:` gives a private in-process database, handy in tests.
    pub async fn new(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| StoreError::Unavailable(format!("Invalid SQLite URL: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .pragma("foreign_keys", "ON");

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Unavailable(format!("Failed to open SQLite: {e}")))?;

        let store = Self { pool };
        store.run_migrations().await?;
        info!("SQLite store initialized at {url}");
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                iid          INTEGER PRIMARY KEY AUTOINCREMENT,
                id           TEXT UNIQUE NOT NULL,
                external_id  TEXT UNIQUE NOT NULL,
                username     TEXT UNIQUE,
                created_at   TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Migration(format!("users table: {e}")))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS generations (
                iid          INTEGER PRIMARY KEY AUTOINCREMENT,
                id           TEXT UNIQUE NOT NULL,
                user_id      TEXT NOT NULL REFERENCES users(id),
                prompt       TEXT NOT NULL,
                language     TEXT NOT NULL,
                code         TEXT NOT NULL,
                created_at   TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Migration(format!("generations table: {e}")))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_generations_user_created
             ON generations(user_id, created_at DESC)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Migration(format!("generations index: {e}")))?;

        debug!("SQLite migrations complete");
        Ok(())
    }

    async fn user_by_external_id(&self, external_id: &str) -> Result<Option<User>, StoreError> {
        let row = sqlx::query(
            "SELECT id, external_id, username, created_at FROM users WHERE external_id = ?1",
        )
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| query_error("select user", e))?;

        row.as_ref().map(row_to_user).transpose()
    }
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Query(format!("bad timestamp '{raw}': {e}")))
}

/// Connection-level failures are reported as unavailability; everything
/// else is a query failure.
fn query_error(context: &str, e: sqlx::Error) -> StoreError {
    match e {
        sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::WorkerCrashed => StoreError::Unavailable(format!("{context}: {e}")),
        other => StoreError::Query(format!("{context}: {other}")),
    }
}

fn row_to_user(row: &SqliteRow) -> Result<User, StoreError> {
    let created_at: String = row
        .try_get("created_at")
        .map_err(|e| StoreError::Query(e.to_string()))?;

    Ok(User {
        id: row.try_get("id").map_err(|e| StoreError::Query(e.to_string()))?,
        external_id: row
            .try_get("external_id")
            .map_err(|e| StoreError::Query(e.to_string()))?,
        username: row
            .try_get("username")
            .map_err(|e| StoreError::Query(e.to_string()))?,
        created_at: parse_timestamp(&created_at)?,
    })
}

fn row_to_generation(row: &SqliteRow) -> Result<Generation, StoreError> {
    let language: String = row
        .try_get("language")
        .map_err(|e| StoreError::Query(e.to_string()))?;
    let created_at: String = row
        .try_get("created_at")
        .map_err(|e| StoreError::Query(e.to_string()))?;

    Ok(Generation {
        id: row.try_get("id").map_err(|e| StoreError::Query(e.to_string()))?,
        user_id: row
            .try_get("user_id")
            .map_err(|e| StoreError::Query(e.to_string()))?,
        prompt: row
            .try_get("prompt")
            .map_err(|e| StoreError::Query(e.to_string()))?,
        language: Language::from_str(&language).map_err(StoreError::Query)?,
        code: row
            .try_get("code")
            .map_err(|e| StoreError::Query(e.to_string()))?,
        created_at: parse_timestamp(&created_at)?,
    })
}

#[async_trait]
impl GenerationStore for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn upsert_user_by_external_id(&self, external_id: &str) -> Result<User, StoreError> {
        sqlx::query(
            "INSERT INTO users (id, external_id, username, created_at)
             VALUES (?1, ?2, NULL, ?3)
             ON CONFLICT(external_id) DO NOTHING",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(external_id)
        .bind(timestamp(Utc::now()))
        .execute(&self.pool)
        .await
        .map_err(|e| query_error("upsert user", e))?;

        self.user_by_external_id(external_id)
            .await?
            .ok_or_else(|| StoreError::Query(format!("user '{external_id}' vanished after upsert")))
    }

    async fn upsert_user_by_username(
        &self,
        username: &str,
        external_id: &str,
    ) -> Result<User, StoreError> {
        sqlx::query(
            "INSERT INTO users (id, external_id, username, created_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT DO NOTHING",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(external_id)
        .bind(username)
        .bind(timestamp(Utc::now()))
        .execute(&self.pool)
        .await
        .map_err(|e| query_error("upsert user", e))?;

        let row = sqlx::query(
            "SELECT id, external_id, username, created_at FROM users WHERE username = ?1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| query_error("select user", e))?;

        match row {
            Some(row) => row_to_user(&row),
            None => Err(StoreError::Query(format!(
                "external id '{external_id}' already belongs to another user"
            ))),
        }
    }

    async fn find_user_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<User>, StoreError> {
        self.user_by_external_id(external_id).await
    }

    async fn create_generation(&self, generation: NewGeneration) -> Result<Generation, StoreError> {
        let record = Generation {
            id: Uuid::new_v4().to_string(),
            user_id: generation.user_id,
            prompt: generation.prompt,
            language: generation.language,
            code: generation.code,
            created_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO generations (id, user_id, prompt, language, code, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(&record.id)
        .bind(&record.user_id)
        .bind(&record.prompt)
        .bind(record.language.as_str())
        .bind(&record.code)
        .bind(timestamp(record.created_at))
        .execute(&self.pool)
        .await
        .map_err(|e| query_error("insert generation", e))?;

        debug!(id = %record.id, user_id = %record.user_id, "Stored generation");
        Ok(record)
    }

    async fn list_generations(
        &self,
        user_id: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Generation>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, user_id, prompt, language, code, created_at
             FROM generations
             WHERE user_id = ?1
             ORDER BY created_at DESC, iid DESC
             LIMIT ?2 OFFSET ?3",
        )
        .bind(user_id)
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .bind(i64::try_from(offset).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| query_error("list generations", e))?;

        rows.iter().map(row_to_generation).collect()
    }

    async fn count_generations(&self, user_id: &str) -> Result<usize, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM generations WHERE user_id = ?1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| query_error("count generations", e))?;

        Ok(usize::try_from(count).unwrap_or_default())
    }
}
