//! Standardization of parsed spreadsheet rows
//!
//! Pure functions with no shared state: author credits, titles with embedded
//! series information, and reading-status vocabulary. [`standardize_candidate`]
//! composes them and types the remaining passthrough fields.

pub mod author;
pub mod status;
pub mod title;

use chrono::NaiveDate;

use crate::models::{CandidateRecord, NormalizedCandidate};

pub use author::{standardize_author, UNKNOWN_AUTHOR};
pub use status::{lookup_reading_status, standardize_reading_status};
pub use title::{standardize_title, title_case, TitleParts, UNTITLED};

const DATE_FORMATS: &[&str] = &["%Y/%m/%d", "%Y-%m-%d", "%m/%d/%Y"];

/// Canonicalize one parsed row.
pub fn standardize_candidate(record: CandidateRecord) -> NormalizedCandidate {
    let TitleParts {
        title,
        series,
        series_number,
    } = standardize_title(&record.title);

    NormalizedCandidate {
        source_row_index: record.source_row_index,
        title,
        series,
        series_number,
        author: standardize_author(&record.author),
        reading_status: standardize_reading_status(record.status_raw.as_deref().unwrap_or("")),
        isbn: record.isbn,
        genre: non_empty(record.genre_raw),
        rating: record.rating_raw.as_deref().and_then(parse_rating),
        shelves: record.shelves_raw,
        date_added: record.date_added_raw.as_deref().and_then(parse_date),
        date_finished: record.date_finished_raw.as_deref().and_then(parse_date),
        publisher: non_empty(record.publisher_raw),
        page_count: record.pages_raw.as_deref().and_then(parse_page_count),
        published_date: non_empty(record.year_published_raw),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// 1 to 5 stars. Trackers export 0 for "not rated".
fn parse_rating(raw: &str) -> Option<i16> {
    let rating = raw.trim().parse::<f32>().ok()?.round() as i16;
    (1..=5).contains(&rating).then_some(rating)
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let parsed = DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(raw, format).ok());
    if parsed.is_none() {
        tracing::debug!(value = %raw, "Unparseable date ignored");
    }
    parsed
}

fn parse_page_count(raw: &str) -> Option<i32> {
    raw.trim().parse::<i32>().ok().filter(|pages| *pages > 0)
}
