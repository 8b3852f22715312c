// SQLite-backed audit log store.
//
// One table:
// - audit_log: one row per evaluated comment, append-only

use crate::core::moderation::{AuditEntry, AuditError, AuditLogStore, LogRetention};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Row, Sqlite};
use std::path::Path;

pub struct SqliteAuditStore {
    pool: Pool<Sqlite>,
}

impl SqliteAuditStore {
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        // Ensure the file exists if it's a file path
        let path_str = database_url.trim_start_matches("sqlite://");
        if !database_url.contains(":memory:") && !Path::new(path_str).exists() {
            if let Some(parent) = Path::new(path_str).parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::File::create(path_str)?;
        }

        let conn_str = if database_url.starts_with("sqlite:") {
            database_url.to_string()
        } else {
            format!("sqlite://{}", database_url)
        };

        let pool = SqlitePoolOptions::new().connect(&conn_str).await?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS audit_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                comment_author TEXT NOT NULL,
                comment_content TEXT NOT NULL,
                api_status_code INTEGER,
                ai_score INTEGER,
                action_taken TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_audit_log_created_at
                ON audit_log(created_at);
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    fn entry_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<AuditEntry, AuditError> {
        let created_at_str: String = row.get("created_at");
        let created_at = DateTime::parse_from_rfc3339(&created_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| AuditError::StorageError(e.to_string()))?;
        let action: String = row.get("action_taken");

        Ok(AuditEntry {
            comment_author: row.get("comment_author"),
            comment_content: row.get("comment_content"),
            api_status_code: row
                .get::<Option<i64>, _>("api_status_code")
                .map(|code| code as u16),
            ai_score: row.get::<Option<i64>, _>("ai_score").map(|score| score as u8),
            action_taken: action.parse().map_err(AuditError::StorageError)?,
            created_at,
        })
    }
}

#[async_trait]
impl AuditLogStore for SqliteAuditStore {
    async fn insert(&self, entry: AuditEntry, retention: LogRetention) -> Result<(), AuditError> {
        // Retention is the store's policy to apply - the builder always
        // hands over the entry.
        if retention == LogRetention::Disabled {
            return Ok(());
        }

        sqlx::query(
            r#"
            INSERT INTO audit_log (
                comment_author, comment_content, api_status_code,
                ai_score, action_taken, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&entry.comment_author)
        .bind(&entry.comment_content)
        .bind(entry.api_status_code.map(|code| code as i64))
        .bind(entry.ai_score.map(|score| score as i64))
        .bind(entry.action_taken.to_string())
        .bind(entry.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| AuditError::StorageError(e.to_string()))?;
        Ok(())
    }

    async fn list_page(&self, page: u32, page_size: u32) -> Result<Vec<AuditEntry>, AuditError> {
        let offset = (page.max(1) - 1) as i64 * page_size as i64;
        let rows = sqlx::query(
            r#"
            SELECT comment_author, comment_content, api_status_code,
                   ai_score, action_taken, created_at
            FROM audit_log
            ORDER BY id DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(page_size as i64)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AuditError::StorageError(e.to_string()))?;

        rows.iter().map(Self::entry_from_row).collect()
    }

    async fn count(&self) -> Result<u64, AuditError> {
        let row = sqlx::query("SELECT COUNT(*) AS total FROM audit_log")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AuditError::StorageError(e.to_string()))?;

        Ok(row.get::<i64, _>("total") as u64)
    }

    async fn clear_all(&self) -> Result<(), AuditError> {
        sqlx::query("DELETE FROM audit_log")
            .execute(&self.pool)
            .await
            .map_err(|e| AuditError::StorageError(e.to_string()))?;
        Ok(())
    }

    async fn expire_older_than(&self, days: u32) -> Result<u64, AuditError> {
        let cutoff = Utc::now() - chrono::Duration::days(days as i64);
        let result = sqlx::query("DELETE FROM audit_log WHERE created_at < ?")
            .bind(cutoff.to_rfc3339())
            .execute(&self.pool)
            .await
            .map_err(|e| AuditError::StorageError(e.to_string()))?;

        Ok(result.rows_affected())
    }
}
