use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::{migrate::MigrateError, sqlite::SqlitePoolOptions, SqlitePool};
use thiserror::Error;
use tracing::debug;

use email_memory_core::types::{EmailRecord, RECORD_VERSION};

/// Document id used by the single-user client.
pub const DEFAULT_DOCUMENT_ID: &str = "user_email";

/// Top-level database handle that owns the SQLite connection pool.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Establishes a new SQLite connection pool for the provided connection string.
    pub async fn connect(database_url: &str) -> Result<Self, StorageError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .map_err(StorageError::Connect)?;

        apply_pragmas(&pool).await?;

        Ok(Self { pool })
    }

    /// Applies migrations located under `migrations/`.
    pub async fn run_migrations(&self) -> Result<(), StorageError> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(StorageError::Migration)?;
        Ok(())
    }

    /// Returns a handle for reading and writing remembered emails.
    pub fn preferences(&self) -> PreferenceRepository {
        PreferenceRepository {
            pool: self.pool.clone(),
        }
    }

    /// Exposes the inner pool when lower level access is required.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

async fn apply_pragmas(pool: &SqlitePool) -> Result<(), StorageError> {
    sqlx::query("PRAGMA foreign_keys = ON;")
        .execute(pool)
        .await
        .map_err(StorageError::Pragma)?;

    sqlx::query("PRAGMA journal_mode = WAL;")
        .fetch_one(pool)
        .await
        .map_err(StorageError::Pragma)?;

    sqlx::query("PRAGMA synchronous = NORMAL;")
        .execute(pool)
        .await
        .map_err(StorageError::Pragma)?;

    sqlx::query("PRAGMA busy_timeout = 5000;")
        .execute(pool)
        .await
        .map_err(StorageError::Pragma)?;

    Ok(())
}

/// General storage level errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to connect to sqlite: {0}")]
    Connect(sqlx::Error),
    #[error("failed to apply pragma: {0}")]
    Pragma(sqlx::Error),
    #[error("failed to run database migrations: {0}")]
    Migration(MigrateError),
}

/// Repository over the `email_preferences` table.
#[derive(Clone)]
pub struct PreferenceRepository {
    pool: SqlitePool,
}

impl PreferenceRepository {
    /// Writes the email under `document_id`, replacing any previous record.
    ///
    /// Both timestamps and the version are overwritten, matching a full
    /// document `set`.
    pub async fn save(
        &self,
        document_id: &str,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<EmailRecord, PreferenceStoreError> {
        let stamp = to_rfc3339(now);
        sqlx::query(
            "INSERT INTO email_preferences (id, email, timestamp, last_updated, version) \
             VALUES (?, ?, ?, ?, ?) \
             ON CONFLICT(id) DO UPDATE SET \
                 email = excluded.email, \
                 timestamp = excluded.timestamp, \
                 last_updated = excluded.last_updated, \
                 version = excluded.version",
        )
        .bind(document_id)
        .bind(email)
        .bind(&stamp)
        .bind(&stamp)
        .bind(RECORD_VERSION)
        .execute(&self.pool)
        .await?;

        debug!(stage = "storage", document_id, "email preference saved");

        Ok(EmailRecord {
            email: email.to_string(),
            timestamp: now,
            last_updated: now,
            version: RECORD_VERSION.to_string(),
        })
    }

    /// Loads the record stored under `document_id`.
    pub async fn load(&self, document_id: &str) -> Result<Option<EmailRecord>, PreferenceStoreError> {
        let row = sqlx::query_as::<_, PreferenceRow>(
            "SELECT email, timestamp, last_updated, version FROM email_preferences WHERE id = ?",
        )
        .bind(document_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(PreferenceRow::into_domain).transpose()
    }

    /// Deletes the record stored under `document_id`.
    ///
    /// Returns `true` when a row was removed. Deleting a missing record is not an error.
    pub async fn delete(&self, document_id: &str) -> Result<bool, PreferenceStoreError> {
        let result = sqlx::query("DELETE FROM email_preferences WHERE id = ?")
            .bind(document_id)
            .execute(&self.pool)
            .await?;

        let removed = result.rows_affected() > 0;
        debug!(stage = "storage", document_id, removed, "email preference deleted");
        Ok(removed)
    }

    /// Lists every stored record, oldest update first.
    pub async fn list_all(&self) -> Result<Vec<EmailRecord>, PreferenceStoreError> {
        let rows = sqlx::query_as::<_, PreferenceRow>(
            "SELECT email, timestamp, last_updated, version FROM email_preferences \
             ORDER BY last_updated, id",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(PreferenceRow::into_domain).collect()
    }
}

/// Raw row as stored in SQLite; timestamps are RFC 3339 text.
#[derive(Debug, sqlx::FromRow)]
pub struct PreferenceRow {
    pub email: String,
    pub timestamp: String,
    pub last_updated: String,
    pub version: String,
}

impl PreferenceRow {
    pub fn into_domain(self) -> Result<EmailRecord, PreferenceStoreError> {
        Ok(EmailRecord {
            email: self.email,
            timestamp: parse_rfc3339(&self.timestamp)?,
            last_updated: parse_rfc3339(&self.last_updated)?,
            version: self.version,
        })
    }
}

/// Errors raised by [`PreferenceRepository`].
#[derive(Debug, Error)]
pub enum PreferenceStoreError {
    #[error("invalid timestamp stored in email_preferences: {0}")]
    Timestamp(#[from] chrono::ParseError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

fn to_rfc3339(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_rfc3339(value: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(value).map(|parsed| parsed.with_timezone(&Utc))
}
