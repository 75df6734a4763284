//! Book model and the partial metadata used by enrichment and manual overrides.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use super::import::{NormalizedCandidate, ReadingStatus};

/// Book row as stored in the personal library
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub author: String,
    pub isbn: Option<String>,
    pub series: Option<String>,
    pub series_number: Option<i32>,
    pub reading_status: String,
    pub rating: Option<i16>,
    pub genre: Option<String>,
    pub description: Option<String>,
    pub cover_url: Option<String>,
    pub page_count: Option<i32>,
    pub publisher: Option<String>,
    pub published_date: Option<String>,
    pub date_added: Option<NaiveDate>,
    pub date_finished: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Minimal projection used by duplicate detection
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct ExistingBook {
    pub id: i64,
    pub isbn: Option<String>,
}

/// Duplicate policy shared by the pre-check and the insert-time re-check.
///
/// An ISBN match counts when the incoming book has an ISBN (rows found by ISBN
/// carry one too). A case-insensitive title and author match counts only when
/// one of the two sides has no ISBN, so distinct editions are not merged.
/// Returns the id of the matched book.
pub fn duplicate_match(
    isbn: Option<&str>,
    isbn_matches: &[ExistingBook],
    title_author_matches: &[ExistingBook],
) -> Option<i64> {
    if isbn.is_some() {
        if let Some(existing) = isbn_matches.first() {
            return Some(existing.id);
        }
    }
    title_author_matches
        .iter()
        .find(|existing| isbn.is_none() || existing.isbn.is_none())
        .map(|existing| existing.id)
}

/// Partial bibliographic metadata.
///
/// Returned by the enrichment lookup and supplied by the caller as a manual
/// override for a given row. Every field is optional; `None` means "unknown".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub isbn: Option<String>,
    #[validate(url(message = "Cover URL must be a valid URL"))]
    pub cover_url: Option<String>,
    pub description: Option<String>,
    pub genre: Option<String>,
    #[validate(range(min = 1, message = "Page count must be positive"))]
    pub page_count: Option<i32>,
    pub publisher: Option<String>,
    pub published_date: Option<String>,
}

impl BookMetadata {
    pub fn is_empty(&self) -> bool {
        *self == BookMetadata::default()
    }

    /// True when every field enrichment can supply is known.
    pub fn is_complete(&self) -> bool {
        self.cover_url.is_some()
            && self.description.is_some()
            && self.genre.is_some()
            && self.page_count.is_some()
            && self.publisher.is_some()
            && self.published_date.is_some()
    }

    /// Copy fields from `other` into `self` where `self` has none.
    pub fn fill_gaps_from(&mut self, other: &BookMetadata) {
        fill(&mut self.title, &other.title);
        fill(&mut self.author, &other.author);
        fill(&mut self.isbn, &other.isbn);
        fill(&mut self.cover_url, &other.cover_url);
        fill(&mut self.description, &other.description);
        fill(&mut self.genre, &other.genre);
        fill(&mut self.page_count, &other.page_count);
        fill(&mut self.publisher, &other.publisher);
        fill(&mut self.published_date, &other.published_date);
    }
}

fn fill<T: Clone>(slot: &mut Option<T>, value: &Option<T>) {
    if slot.is_none() {
        slot.clone_from(value);
    }
}

fn overwrite<T: Clone>(slot: &mut Option<T>, value: &Option<T>) {
    if value.is_some() {
        slot.clone_from(value);
    }
}

/// Book ready to be inserted
#[derive(Debug, Clone, PartialEq)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub isbn: Option<String>,
    pub series: Option<String>,
    pub series_number: Option<i32>,
    pub reading_status: ReadingStatus,
    pub rating: Option<i16>,
    pub genre: Option<String>,
    pub description: Option<String>,
    pub cover_url: Option<String>,
    pub page_count: Option<i32>,
    pub publisher: Option<String>,
    pub published_date: Option<String>,
    pub date_added: Option<NaiveDate>,
    pub date_finished: Option<NaiveDate>,
}

impl NewBook {
    /// Start from the spreadsheet values of a normalized row.
    pub fn from_candidate(candidate: &NormalizedCandidate) -> Self {
        Self {
            title: candidate.title.clone(),
            author: candidate.author.clone(),
            isbn: candidate.isbn.clone(),
            series: candidate.series.clone(),
            series_number: candidate.series_number.and_then(|n| i32::try_from(n).ok()),
            reading_status: candidate.reading_status,
            rating: candidate.rating,
            genre: candidate.genre.clone(),
            description: None,
            cover_url: None,
            page_count: candidate.page_count,
            publisher: candidate.publisher.clone(),
            published_date: candidate.published_date.clone(),
            date_added: candidate.date_added,
            date_finished: candidate.date_finished,
        }
    }

    /// Caller-supplied values replace whatever the spreadsheet had.
    pub fn apply_override(&mut self, manual: &BookMetadata) {
        if let Some(title) = manual.title.as_deref().filter(|t| !t.trim().is_empty()) {
            self.title = title.trim().to_string();
        }
        if let Some(author) = manual.author.as_deref().filter(|a| !a.trim().is_empty()) {
            self.author = author.trim().to_string();
        }
        overwrite(&mut self.isbn, &manual.isbn);
        overwrite(&mut self.cover_url, &manual.cover_url);
        overwrite(&mut self.description, &manual.description);
        overwrite(&mut self.genre, &manual.genre);
        overwrite(&mut self.page_count, &manual.page_count);
        overwrite(&mut self.publisher, &manual.publisher);
        overwrite(&mut self.published_date, &manual.published_date);
    }

    /// Enriched values only land in fields that are still empty.
    pub fn fill_gaps(&mut self, enriched: &BookMetadata) {
        fill(&mut self.isbn, &enriched.isbn);
        fill(&mut self.cover_url, &enriched.cover_url);
        fill(&mut self.description, &enriched.description);
        fill(&mut self.genre, &enriched.genre);
        fill(&mut self.page_count, &enriched.page_count);
        fill(&mut self.publisher, &enriched.publisher);
        fill(&mut self.published_date, &enriched.published_date);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate() -> NormalizedCandidate {
        NormalizedCandidate {
            source_row_index: 0,
            title: "Dune".to_string(),
            author: "Frank Herbert".to_string(),
            publisher: Some("Chilton".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_enrichment_fills_only_gaps() {
        let mut book = NewBook::from_candidate(&candidate());
        book.fill_gaps(&BookMetadata {
            publisher: Some("Ace".to_string()),
            page_count: Some(412),
            ..Default::default()
        });
        assert_eq!(book.publisher.as_deref(), Some("Chilton"));
        assert_eq!(book.page_count, Some(412));
    }

    #[test]
    fn test_override_beats_csv_and_enrichment() {
        let mut book = NewBook::from_candidate(&candidate());
        book.apply_override(&BookMetadata {
            publisher: Some("Hodder".to_string()),
            ..Default::default()
        });
        book.fill_gaps(&BookMetadata {
            publisher: Some("Ace".to_string()),
            ..Default::default()
        });
        assert_eq!(book.publisher.as_deref(), Some("Hodder"));
    }

    #[test]
    fn test_blank_override_title_is_ignored() {
        let mut book = NewBook::from_candidate(&candidate());
        book.apply_override(&BookMetadata {
            title: Some("  ".to_string()),
            ..Default::default()
        });
        assert_eq!(book.title, "Dune");
    }

    #[test]
    fn test_duplicate_match_policy() {
        let with_isbn = ExistingBook {
            id: 1,
            isbn: Some("9780441013593".to_string()),
        };
        let without_isbn = ExistingBook { id: 2, isbn: None };

        assert_eq!(duplicate_match(Some("9780441013593"), &[with_isbn.clone()], &[]), Some(1));
        assert_eq!(duplicate_match(None, &[], &[with_isbn.clone()]), Some(1));
        assert_eq!(duplicate_match(Some("0441013597"), &[], &[without_isbn]), Some(2));
        // Same title and author, different editions
        assert_eq!(duplicate_match(Some("0441013597"), &[], &[with_isbn]), None);
        assert_eq!(duplicate_match(None, &[], &[]), None);
    }

    #[test]
    fn test_metadata_validation() {
        let bad = BookMetadata {
            cover_url: Some("not a url".to_string()),
            page_count: Some(0),
            ..Default::default()
        };
        assert!(bad.validate().is_err());
        assert!(BookMetadata::default().validate().is_ok());
    }
}
