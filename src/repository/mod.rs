//! Repository layer for database operations

pub mod books;
pub mod collections;
pub mod import_history;

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use crate::{
    error::AppResult,
    models::{Book, Collection, ExistingBook, ImportHistoryEntry, NewBook, NewCollection, NewImportHistory},
};

/// How `create_book` treats an existing matching book
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertPolicy {
    /// Fail with `AppError::Duplicate` if a matching book exists at insert time
    RejectDuplicates,
    AllowDuplicates,
}

/// Library storage as seen by the import services
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LibraryStore: Send + Sync {
    async fn find_books_by_isbn(&self, user_id: i64, isbn: &str) -> AppResult<Vec<ExistingBook>>;

    async fn find_books_by_title_author(
        &self,
        user_id: i64,
        title: &str,
        author: &str,
    ) -> AppResult<Vec<ExistingBook>>;

    async fn create_book(&self, user_id: i64, book: &NewBook, policy: InsertPolicy) -> AppResult<Book>;

    async fn find_collection_by_name(&self, user_id: i64, name: &str) -> AppResult<Option<Collection>>;

    async fn create_collection(&self, user_id: i64, collection: &NewCollection) -> AppResult<Collection>;

    async fn add_book_to_collection(&self, collection_id: i64, book_id: i64) -> AppResult<()>;

    async fn create_import_history(&self, entry: &NewImportHistory) -> AppResult<ImportHistoryEntry>;

    async fn list_import_history(&self, user_id: i64, limit: i64) -> AppResult<Vec<ImportHistoryEntry>>;
}

/// Main repository struct holding database connection pool
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
    pub books: books::BooksRepository,
    pub collections: collections::CollectionsRepository,
    pub import_history: import_history::ImportHistoryRepository,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            books: books::BooksRepository::new(pool.clone()),
            collections: collections::CollectionsRepository::new(pool.clone()),
            import_history: import_history::ImportHistoryRepository::new(pool.clone()),
            pool,
        }
    }
}

#[async_trait]
impl LibraryStore for Repository {
    async fn find_books_by_isbn(&self, user_id: i64, isbn: &str) -> AppResult<Vec<ExistingBook>> {
        self.books.find_by_isbn(user_id, isbn).await
    }

    async fn find_books_by_title_author(
        &self,
        user_id: i64,
        title: &str,
        author: &str,
    ) -> AppResult<Vec<ExistingBook>> {
        self.books.find_by_title_author(user_id, title, author).await
    }

    async fn create_book(&self, user_id: i64, book: &NewBook, policy: InsertPolicy) -> AppResult<Book> {
        self.books.create(user_id, book, policy).await
    }

    async fn find_collection_by_name(&self, user_id: i64, name: &str) -> AppResult<Option<Collection>> {
        self.collections.find_by_name(user_id, name).await
    }

    async fn create_collection(&self, user_id: i64, collection: &NewCollection) -> AppResult<Collection> {
        self.collections.create(user_id, collection).await
    }

    async fn add_book_to_collection(&self, collection_id: i64, book_id: i64) -> AppResult<()> {
        self.collections.add_book(collection_id, book_id).await
    }

    async fn create_import_history(&self, entry: &NewImportHistory) -> AppResult<ImportHistoryEntry> {
        self.import_history.create(entry).await
    }

    async fn list_import_history(&self, user_id: i64, limit: i64) -> AppResult<Vec<ImportHistoryEntry>> {
        self.import_history.list(user_id, limit).await
    }
}
