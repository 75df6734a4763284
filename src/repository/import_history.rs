//! Import history repository

use sqlx::{types::Json, Pool, Postgres};

use crate::{
    error::AppResult,
    models::{ImportHistoryEntry, NewImportHistory},
};

#[derive(Clone)]
pub struct ImportHistoryRepository {
    pool: Pool<Postgres>,
}

impl ImportHistoryRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn create(&self, entry: &NewImportHistory) -> AppResult<ImportHistoryEntry> {
        let row = sqlx::query_as::<_, ImportHistoryEntry>(
            r#"
            INSERT INTO import_history (
                user_id, source, file_name, total_rows, success_count, skip_count, error_count, errors
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(entry.user_id)
        .bind(&entry.source)
        .bind(&entry.file_name)
        .bind(entry.total_rows)
        .bind(entry.success_count)
        .bind(entry.skip_count)
        .bind(entry.error_count)
        .bind(Json(&entry.errors))
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    /// Most recent runs first
    pub async fn list(&self, user_id: i64, limit: i64) -> AppResult<Vec<ImportHistoryEntry>> {
        let rows = sqlx::query_as::<_, ImportHistoryEntry>(
            "SELECT * FROM import_history WHERE user_id = $1 ORDER BY imported_at DESC, id DESC LIMIT $2",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
