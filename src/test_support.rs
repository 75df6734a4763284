// Test support utilities for unit tests

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use crate::{
    error::{AppError, AppResult},
    models::{
        duplicate_match, Book, Collection, ExistingBook, ImportHistoryEntry, NewBook, NewCollection,
        NewImportHistory,
    },
    repository::{InsertPolicy, LibraryStore},
};

/// Library store kept in memory.
///
/// Inserts can be made to fail for chosen book titles or collection names,
/// and history persistence can be made to fail, to exercise error paths of
/// the import.
#[derive(Default)]
pub struct InMemoryLibraryStore {
    books: Mutex<Vec<Book>>,
    collections: Mutex<Vec<Collection>>,
    memberships: Mutex<Vec<(i64, i64)>>,
    history: Mutex<Vec<ImportHistoryEntry>>,
    failing_titles: Mutex<HashSet<String>>,
    failing_collections: Mutex<HashSet<String>>,
    fail_history: AtomicBool,
    next_id: AtomicI64,
}

impl InMemoryLibraryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// `create_book` fails with a database error for this title
    pub fn fail_on_title(&self, title: &str) {
        self.failing_titles.lock().unwrap().insert(title.to_string());
    }

    /// `create_collection` fails with a database error for this name
    pub fn fail_on_collection(&self, name: &str) {
        self.failing_collections.lock().unwrap().insert(name.to_string());
    }

    pub fn fail_history(&self) {
        self.fail_history.store(true, Ordering::SeqCst);
    }

    pub fn books(&self) -> Vec<Book> {
        self.books.lock().unwrap().clone()
    }

    pub fn history(&self) -> Vec<ImportHistoryEntry> {
        self.history.lock().unwrap().clone()
    }

    pub fn collection_names(&self) -> Vec<String> {
        self.collections.lock().unwrap().iter().map(|c| c.name.clone()).collect()
    }

    pub fn memberships(&self) -> Vec<(i64, i64)> {
        self.memberships.lock().unwrap().clone()
    }

    fn next_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::SeqCst) + 1
    }
}

fn same_text(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

fn isbn_matches(books: &[Book], user_id: i64, isbn: &str) -> Vec<ExistingBook> {
    books
        .iter()
        .filter(|b| b.user_id == user_id && b.isbn.as_deref().is_some_and(|i| same_text(i, isbn)))
        .map(|b| ExistingBook { id: b.id, isbn: b.isbn.clone() })
        .collect()
}

fn title_author_matches(books: &[Book], user_id: i64, title: &str, author: &str) -> Vec<ExistingBook> {
    books
        .iter()
        .filter(|b| b.user_id == user_id && same_text(&b.title, title) && same_text(&b.author, author))
        .map(|b| ExistingBook { id: b.id, isbn: b.isbn.clone() })
        .collect()
}

#[async_trait]
impl LibraryStore for InMemoryLibraryStore {
    async fn find_books_by_isbn(&self, user_id: i64, isbn: &str) -> AppResult<Vec<ExistingBook>> {
        Ok(isbn_matches(&self.books.lock().unwrap(), user_id, isbn))
    }

    async fn find_books_by_title_author(
        &self,
        user_id: i64,
        title: &str,
        author: &str,
    ) -> AppResult<Vec<ExistingBook>> {
        Ok(title_author_matches(&self.books.lock().unwrap(), user_id, title, author))
    }

    async fn create_book(&self, user_id: i64, book: &NewBook, policy: InsertPolicy) -> AppResult<Book> {
        if self.failing_titles.lock().unwrap().contains(&book.title) {
            return Err(AppError::Database(sqlx::Error::PoolTimedOut));
        }

        let mut books = self.books.lock().unwrap();
        if policy == InsertPolicy::RejectDuplicates {
            let by_isbn = match book.isbn.as_deref() {
                Some(isbn) => isbn_matches(&books, user_id, isbn),
                None => Vec::new(),
            };
            let by_title_author = title_author_matches(&books, user_id, &book.title, &book.author);
            if let Some(id) = duplicate_match(book.isbn.as_deref(), &by_isbn, &by_title_author) {
                return Err(AppError::Duplicate(format!("book {} already exists", id)));
            }
        }

        let now = Utc::now();
        let created = Book {
            id: self.next_id(),
            user_id,
            title: book.title.clone(),
            author: book.author.clone(),
            isbn: book.isbn.clone(),
            series: book.series.clone(),
            series_number: book.series_number,
            reading_status: book.reading_status.as_str().to_string(),
            rating: book.rating,
            genre: book.genre.clone(),
            description: book.description.clone(),
            cover_url: book.cover_url.clone(),
            page_count: book.page_count,
            publisher: book.publisher.clone(),
            published_date: book.published_date.clone(),
            date_added: book.date_added,
            date_finished: book.date_finished,
            created_at: now,
            updated_at: now,
        };
        books.push(created.clone());
        Ok(created)
    }

    async fn find_collection_by_name(&self, user_id: i64, name: &str) -> AppResult<Option<Collection>> {
        Ok(self
            .collections
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.user_id == user_id && same_text(&c.name, name))
            .cloned())
    }

    async fn create_collection(&self, user_id: i64, collection: &NewCollection) -> AppResult<Collection> {
        if self.failing_collections.lock().unwrap().contains(&collection.name) {
            return Err(AppError::Database(sqlx::Error::PoolTimedOut));
        }
        let mut collections = self.collections.lock().unwrap();
        if let Some(existing) = collections
            .iter()
            .find(|c| c.user_id == user_id && same_text(&c.name, &collection.name))
        {
            return Ok(existing.clone());
        }
        let created = Collection {
            id: self.next_id(),
            user_id,
            name: collection.name.clone(),
            icon: collection.icon.clone(),
            color: collection.color.clone(),
            created_at: Utc::now(),
        };
        collections.push(created.clone());
        Ok(created)
    }

    async fn add_book_to_collection(&self, collection_id: i64, book_id: i64) -> AppResult<()> {
        let mut memberships = self.memberships.lock().unwrap();
        if !memberships.contains(&(book_id, collection_id)) {
            memberships.push((book_id, collection_id));
        }
        Ok(())
    }

    async fn create_import_history(&self, entry: &NewImportHistory) -> AppResult<ImportHistoryEntry> {
        if self.fail_history.load(Ordering::SeqCst) {
            return Err(AppError::Database(sqlx::Error::PoolTimedOut));
        }
        let created = ImportHistoryEntry {
            id: self.next_id(),
            user_id: entry.user_id,
            source: entry.source.clone(),
            file_name: entry.file_name.clone(),
            total_rows: entry.total_rows,
            success_count: entry.success_count,
            skip_count: entry.skip_count,
            error_count: entry.error_count,
            errors: serde_json::to_value(&entry.errors).unwrap_or_default(),
            imported_at: Utc::now(),
        };
        self.history.lock().unwrap().push(created.clone());
        Ok(created)
    }

    async fn list_import_history(&self, user_id: i64, limit: i64) -> AppResult<Vec<ImportHistoryEntry>> {
        let history = self.history.lock().unwrap();
        Ok(history
            .iter()
            .rev()
            .filter(|h| h.user_id == user_id)
            .take(usize::try_from(limit).unwrap_or(0))
            .cloned()
            .collect())
    }
}
