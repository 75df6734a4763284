//! Collections repository

use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::{Collection, NewCollection},
};

#[derive(Clone)]
pub struct CollectionsRepository {
    pool: Pool<Postgres>,
}

impl CollectionsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Find a user's collection by name, ignoring case
    pub async fn find_by_name(&self, user_id: i64, name: &str) -> AppResult<Option<Collection>> {
        let row = sqlx::query_as::<_, Collection>(
            "SELECT * FROM collections WHERE user_id = $1 AND lower(name) = lower($2)",
        )
        .bind(user_id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Create a collection. If another request created the same name first,
    /// that collection is returned instead.
    pub async fn create(&self, user_id: i64, collection: &NewCollection) -> AppResult<Collection> {
        let inserted = sqlx::query_as::<_, Collection>(
            r#"
            INSERT INTO collections (user_id, name, icon, color)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id, lower(name)) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(&collection.name)
        .bind(&collection.icon)
        .bind(&collection.color)
        .fetch_optional(&self.pool)
        .await?;

        match inserted {
            Some(created) => Ok(created),
            None => self.find_by_name(user_id, &collection.name).await?.ok_or_else(|| {
                AppError::Conflict(format!("Collection '{}' could not be created", collection.name))
            }),
        }
    }

    /// Attach a book to a collection (no-op when already attached)
    pub async fn add_book(&self, collection_id: i64, book_id: i64) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO book_collections (book_id, collection_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(book_id)
        .bind(collection_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
