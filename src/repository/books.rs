//! Books repository

use sqlx::{Pool, Postgres};

use super::InsertPolicy;
use crate::{
    error::{AppError, AppResult},
    models::{duplicate_match, Book, ExistingBook, NewBook},
};

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Books of a user with the given ISBN (case-insensitive)
    pub async fn find_by_isbn(&self, user_id: i64, isbn: &str) -> AppResult<Vec<ExistingBook>> {
        let rows = sqlx::query_as::<_, ExistingBook>(
            "SELECT id, isbn FROM books WHERE user_id = $1 AND lower(isbn) = lower($2) ORDER BY id",
        )
        .bind(user_id)
        .bind(isbn)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Books of a user with the given title and author (case-insensitive)
    pub async fn find_by_title_author(&self, user_id: i64, title: &str, author: &str) -> AppResult<Vec<ExistingBook>> {
        let rows = sqlx::query_as::<_, ExistingBook>(
            r#"
            SELECT id, isbn FROM books
            WHERE user_id = $1 AND lower(title) = lower($2) AND lower(author) = lower($3)
            ORDER BY id
            "#,
        )
        .bind(user_id)
        .bind(title)
        .bind(author)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Insert a book.
    ///
    /// With [`InsertPolicy::RejectDuplicates`] the insert runs under a per-user
    /// advisory lock and the duplicate policy is checked again inside the same
    /// transaction, so two concurrent imports cannot both insert the same book.
    pub async fn create(&self, user_id: i64, book: &NewBook, policy: InsertPolicy) -> AppResult<Book> {
        let mut tx = self.pool.begin().await?;

        if policy == InsertPolicy::RejectDuplicates {
            sqlx::query("SELECT pg_advisory_xact_lock($1)")
                .bind(user_id)
                .execute(&mut *tx)
                .await?;

            let isbn_matches = match book.isbn.as_deref() {
                Some(isbn) => {
                    sqlx::query_as::<_, ExistingBook>(
                        "SELECT id, isbn FROM books WHERE user_id = $1 AND lower(isbn) = lower($2)",
                    )
                    .bind(user_id)
                    .bind(isbn)
                    .fetch_all(&mut *tx)
                    .await?
                }
                None => Vec::new(),
            };
            let title_author_matches = sqlx::query_as::<_, ExistingBook>(
                "SELECT id, isbn FROM books WHERE user_id = $1 AND lower(title) = lower($2) AND lower(author) = lower($3)",
            )
            .bind(user_id)
            .bind(&book.title)
            .bind(&book.author)
            .fetch_all(&mut *tx)
            .await?;

            if let Some(existing_id) = duplicate_match(book.isbn.as_deref(), &isbn_matches, &title_author_matches) {
                return Err(AppError::Duplicate(format!(
                    "'{}' by {} already exists (book {})",
                    book.title, book.author, existing_id
                )));
            }
        }

        let created = sqlx::query_as::<_, Book>(
            r#"
            INSERT INTO books (
                user_id, title, author, isbn, series, series_number, reading_status, rating,
                genre, description, cover_url, page_count, publisher, published_date,
                date_added, date_finished
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.isbn)
        .bind(&book.series)
        .bind(book.series_number)
        .bind(book.reading_status.as_str())
        .bind(book.rating)
        .bind(&book.genre)
        .bind(&book.description)
        .bind(&book.cover_url)
        .bind(book.page_count)
        .bind(&book.publisher)
        .bind(&book.published_date)
        .bind(book.date_added)
        .bind(book.date_finished)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(created)
    }
}
