//! SQLite checkpoint store
//!
//! Durable backend built on sqlx. Each project is one row holding the full
//! serialized checkpoint; `thread_id` is indexed so scope resolution does not
//! scan the table.
//!
//! ```text
//! checkpoints(project_id TEXT PRIMARY KEY, thread_id TEXT, payload TEXT,
//!             created_at TEXT, updated_at TEXT)
//! ```

use crate::checkpoint::ProjectCheckpoint;
use crate::error::{CheckpointError, Result};
use crate::traits::{save_timestamps, CheckpointStore};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

const SCHEMA: [&str; 2] = [
    r#"
    CREATE TABLE IF NOT EXISTS checkpoints (
        project_id TEXT PRIMARY KEY,
        thread_id TEXT NOT NULL,
        payload TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_checkpoints_thread_id ON checkpoints(thread_id)",
];

/// SQLite-backed checkpoint store
#[derive(Clone, Debug)]
pub struct SqliteCheckpointStore {
    pool: SqlitePool,
}

impl SqliteCheckpointStore {
    /// Open (or create) the database file and ensure the schema exists
    pub async fn connect<P: AsRef<Path>>(database_path: P) -> Result<Self> {
        let path = database_path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    CheckpointError::Database(format!("Failed to create database directory: {}", e))
                })?;
            }
        }

        debug!(path = %path.display(), "Connecting to checkpoint database");

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| CheckpointError::Database(format!("Failed to connect to database: {}", e)))?;

        let store = Self { pool };
        store.init_schema().await?;

        info!(path = %path.display(), "Checkpoint database ready");
        Ok(store)
    }

    /// Open a private in-memory database (single connection)
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| CheckpointError::Database(format!("Failed to open in-memory database: {}", e)))?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| CheckpointError::Database(format!("Failed to create schema: {}", e)))?;
        }
        Ok(())
    }

    /// Close the connection pool
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn format_timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| CheckpointError::Invalid(format!("Bad timestamp '{}': {}", value, e)))
}

fn row_to_checkpoint(row: &SqliteRow) -> Result<ProjectCheckpoint> {
    let payload: String = row.get("payload");
    Ok(serde_json::from_str(&payload)?)
}

#[async_trait]
impl CheckpointStore for SqliteCheckpointStore {
    async fn save(&self, checkpoint: &ProjectCheckpoint) -> Result<String> {
        if checkpoint.project_id.is_empty() {
            return Err(CheckpointError::Invalid("project_id is required".to_string()));
        }

        let mut tx = self.pool.begin().await?;

        let existing = sqlx::query("SELECT created_at, updated_at FROM checkpoints WHERE project_id = ?")
            .bind(&checkpoint.project_id)
            .fetch_optional(&mut *tx)
            .await?;

        let existing = match existing {
            Some(row) => {
                let created: String = row.get("created_at");
                let updated: String = row.get("updated_at");
                Some((parse_timestamp(&created)?, parse_timestamp(&updated)?))
            }
            None => None,
        };
        let (created_at, updated_at) = save_timestamps(checkpoint, existing);

        let mut stored = checkpoint.clone();
        stored.created_at = created_at;
        stored.updated_at = updated_at;
        let payload = serde_json::to_string(&stored)?;

        sqlx::query(
            r#"
            INSERT INTO checkpoints (project_id, thread_id, payload, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(project_id) DO UPDATE SET
                thread_id = excluded.thread_id,
                payload = excluded.payload,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&stored.project_id)
        .bind(&stored.thread_id)
        .bind(&payload)
        .bind(format_timestamp(created_at))
        .bind(format_timestamp(updated_at))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        debug!(project_id = %stored.project_id, state = %stored.workflow_state, "Saved checkpoint");
        Ok(stored.project_id)
    }

    async fn load(&self, project_id: &str) -> Result<Option<ProjectCheckpoint>> {
        let row = sqlx::query("SELECT payload FROM checkpoints WHERE project_id = ?")
            .bind(project_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_checkpoint).transpose()
    }

    async fn list(&self) -> Result<Vec<ProjectCheckpoint>> {
        let rows = sqlx::query("SELECT payload FROM checkpoints ORDER BY updated_at DESC")
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(row_to_checkpoint).collect()
    }

    async fn delete(&self, project_id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM checkpoints WHERE project_id = ?")
            .bind(project_id)
            .execute(&self.pool)
            .await?;

        debug!(project_id = %project_id, rows = result.rows_affected(), "Deleted checkpoint");
        Ok(())
    }

    async fn find_by_thread_id(&self, thread_id: &str) -> Result<Option<ProjectCheckpoint>> {
        let row = sqlx::query(
            "SELECT payload FROM checkpoints WHERE thread_id = ? ORDER BY updated_at DESC LIMIT 1",
        )
        .bind(thread_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_checkpoint).transpose()
    }
}
