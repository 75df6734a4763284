//! Duplicate detection against the user's existing library

use std::sync::Arc;

use crate::{
    error::AppResult,
    models::{duplicate_match, NewBook},
    repository::LibraryStore,
};

#[derive(Clone)]
pub struct DeduplicationChecker {
    store: Arc<dyn LibraryStore>,
}

impl DeduplicationChecker {
    pub fn new(store: Arc<dyn LibraryStore>) -> Self {
        Self { store }
    }

    /// Id of an existing book of `user_id` that `book` duplicates, if any.
    pub async fn find_duplicate(&self, user_id: i64, book: &NewBook) -> AppResult<Option<i64>> {
        let isbn_matches = match book.isbn.as_deref() {
            Some(isbn) => self.store.find_books_by_isbn(user_id, isbn).await?,
            None => Vec::new(),
        };
        if let Some(id) = duplicate_match(book.isbn.as_deref(), &isbn_matches, &[]) {
            return Ok(Some(id));
        }

        let title_author_matches = self
            .store
            .find_books_by_title_author(user_id, &book.title, &book.author)
            .await?;
        Ok(duplicate_match(book.isbn.as_deref(), &isbn_matches, &title_author_matches))
    }

    pub async fn is_duplicate(&self, user_id: i64, book: &NewBook) -> AppResult<bool> {
        Ok(self.find_duplicate(user_id, book).await?.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ExistingBook, NormalizedCandidate};
    use crate::repository::MockLibraryStore;

    fn book(isbn: Option<&str>) -> NewBook {
        NewBook::from_candidate(&NormalizedCandidate {
            title: "Dune".to_string(),
            author: "Frank Herbert".to_string(),
            isbn: isbn.map(String::from),
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_isbn_match_skips_title_lookup() {
        let mut store = MockLibraryStore::new();
        store
            .expect_find_books_by_isbn()
            .times(1)
            .returning(|_, _| Ok(vec![ExistingBook { id: 9, isbn: Some("9780441013593".to_string()) }]));
        store.expect_find_books_by_title_author().never();

        let checker = DeduplicationChecker::new(Arc::new(store));
        let found = checker.find_duplicate(1, &book(Some("9780441013593"))).await.unwrap();
        assert_eq!(found, Some(9));
    }

    #[tokio::test]
    async fn test_title_author_match_without_isbn() {
        let mut store = MockLibraryStore::new();
        store.expect_find_books_by_isbn().never();
        store
            .expect_find_books_by_title_author()
            .times(1)
            .returning(|_, _, _| Ok(vec![ExistingBook { id: 3, isbn: Some("0441013597".to_string()) }]));

        let checker = DeduplicationChecker::new(Arc::new(store));
        assert!(checker.is_duplicate(1, &book(None)).await.unwrap());
    }

    #[tokio::test]
    async fn test_other_edition_is_not_duplicate() {
        let mut store = MockLibraryStore::new();
        store.expect_find_books_by_isbn().returning(|_, _| Ok(vec![]));
        store
            .expect_find_books_by_title_author()
            .returning(|_, _, _| Ok(vec![ExistingBook { id: 3, isbn: Some("0441013597".to_string()) }]));

        let checker = DeduplicationChecker::new(Arc::new(store));
        assert!(!checker.is_duplicate(1, &book(Some("9780441013593"))).await.unwrap());
    }
}
