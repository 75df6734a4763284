//! Tolerant CSV parser for reading-library exports
//!
//! Headers are matched case-insensitively against an alias table so column
//! order and naming may vary between trackers. A bad row never aborts the
//! parse: it is dropped and reported in the diagnostics.

use csv::{Reader, ReaderBuilder, StringRecord, Trim};

use super::isbn::normalize_isbn;
use crate::models::import::{CandidateRecord, ParsedSheet};

/// Logical columns the importer understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    Title,
    Author,
    AdditionalAuthors,
    Isbn,
    Isbn13,
    Genre,
    Rating,
    Status,
    ExclusiveShelf,
    Shelves,
    DateAdded,
    DateFinished,
    Publisher,
    Pages,
    YearPublished,
}

/// Header aliases (lower-case) for each column
const HEADER_ALIASES: &[(Column, &[&str])] = &[
    (Column::Title, &["title", "book title", "name"]),
    (Column::Author, &["author", "author(s)", "authors", "book author"]),
    (Column::AdditionalAuthors, &["additional authors", "co-authors"]),
    (Column::Isbn, &["isbn", "isbn10", "isbn-10"]),
    (Column::Isbn13, &["isbn13", "isbn-13", "ean"]),
    (Column::Genre, &["genre", "genres", "category"]),
    (Column::Rating, &["my rating", "rating", "star rating"]),
    (Column::Status, &["read status", "reading status", "status"]),
    (Column::ExclusiveShelf, &["exclusive shelf"]),
    (Column::Shelves, &["bookshelves", "shelves", "tags", "collections"]),
    (Column::DateAdded, &["date added", "added"]),
    (Column::DateFinished, &["date read", "date finished", "finished"]),
    (Column::Publisher, &["publisher"]),
    (Column::Pages, &["number of pages", "pages", "page count"]),
    (
        Column::YearPublished,
        &["year published", "original publication year", "publication year"],
    ),
];

fn column_for_header(header: &str) -> Option<Column> {
    let header = header.trim().to_lowercase();
    HEADER_ALIASES
        .iter()
        .find(|(_, aliases)| aliases.iter().any(|a| *a == header))
        .map(|(column, _)| *column)
}

/// Trim a cell and unwrap spreadsheet formula escapes such as `="0439023483"`.
fn clean_cell(value: &str) -> Option<String> {
    let mut value = value.trim();
    if let Some(inner) = value.strip_prefix("=\"").and_then(|v| v.strip_suffix('"')) {
        value = inner.trim();
    }
    (!value.is_empty()).then(|| value.to_string())
}

/// Split a multi-valued shelf cell on commas and semicolons.
fn split_shelves(value: &str, into: &mut Vec<String>) {
    for shelf in value.split([',', ';']).map(str::trim).filter(|s| !s.is_empty()) {
        if !into.iter().any(|s| s.eq_ignore_ascii_case(shelf)) {
            into.push(shelf.to_string());
        }
    }
}

/// When a quote opened at or after `start` is never closed, the reader has
/// consumed the rest of the input as one field. Returns the offset just past
/// the line holding that quote.
fn unterminated_quote_resume(input: &str, start: usize) -> Option<usize> {
    let mut open = None;
    for (offset, byte) in input.bytes().enumerate().skip(start) {
        if byte == b'"' {
            open = match open {
                Some(_) => None,
                None => Some(offset),
            };
        }
    }
    let open = open?;
    input[open..].find('\n').map(|newline| open + newline + 1)
}

/// CSV parser producing [`CandidateRecord`]s
#[derive(Debug, Clone)]
pub struct CsvParser {
    delimiter: u8,
}

impl Default for CsvParser {
    fn default() -> Self {
        Self::new()
    }
}

impl CsvParser {
    pub fn new() -> Self {
        Self { delimiter: b',' }
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    fn reader<'a>(&self, input: &'a str, has_headers: bool) -> Reader<&'a [u8]> {
        ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(has_headers)
            .flexible(true)
            .trim(Trim::None)
            .from_reader(input.as_bytes())
    }

    /// Parse raw CSV text. Never fails: unreadable rows become diagnostics.
    pub fn parse(&self, raw: &str) -> ParsedSheet {
        let text = raw.strip_prefix('\u{feff}').unwrap_or(raw);
        let mut sheet = ParsedSheet::default();

        let mut reader = self.reader(text, true);
        let headers = match reader.headers() {
            Ok(headers) => headers.clone(),
            Err(e) => {
                tracing::warn!("CSV header row could not be read: {}", e);
                return sheet;
            }
        };
        let columns: Vec<Option<Column>> = headers.iter().map(column_for_header).collect();
        tracing::debug!(
            "CSV header mapped {} of {} columns",
            columns.iter().filter(|c| c.is_some()).count(),
            columns.len()
        );

        // Offset of the reader's input within `text`
        let mut base = 0;
        let mut row_index = 0;
        while let Some(resume) = self.read_rows(&mut reader, &text[base..], &columns, &mut row_index, &mut sheet) {
            base += resume;
            reader = self.reader(&text[base..], false);
        }

        tracing::info!(
            "Parsed {} rows: {} kept, {} dropped, {} warnings",
            sheet.total_rows,
            sheet.records.len(),
            sheet.diagnostics.errors.len(),
            sheet.diagnostics.warnings.len()
        );
        sheet
    }

    /// Read records until the input ends or a row with an unterminated quote
    /// is found. In the latter case the row is dropped and the offset in
    /// `input` where reading must restart is returned.
    fn read_rows(
        &self,
        reader: &mut Reader<&[u8]>,
        input: &str,
        columns: &[Option<Column>],
        row_index: &mut usize,
        sheet: &mut ParsedSheet,
    ) -> Option<usize> {
        for result in reader.records() {
            let current = *row_index;
            *row_index += 1;
            sheet.total_rows += 1;

            let record = match result {
                Ok(record) => record,
                Err(e) => {
                    tracing::warn!("Row {} dropped: {}", current, e);
                    sheet.diagnostics.error(current, format!("Malformed row: {}", e));
                    continue;
                }
            };

            if record.iter().any(|field| field.contains('\n')) {
                let start = record.position().map_or(0, |p| p.byte() as usize);
                if let Some(resume) = unterminated_quote_resume(input, start) {
                    tracing::warn!("Row {} dropped: unterminated quoted field", current);
                    sheet
                        .diagnostics
                        .error(current, "Malformed row: unterminated quoted field");
                    return Some(resume);
                }
            }

            if record.len() != columns.len() {
                tracing::warn!(
                    "Row {} dropped: expected {} fields, found {}",
                    current,
                    columns.len(),
                    record.len()
                );
                sheet.diagnostics.error(
                    current,
                    format!(
                        "Malformed row: expected {} fields, found {}",
                        columns.len(),
                        record.len()
                    ),
                );
                continue;
            }

            self.parse_row(columns, &record, current, sheet);
        }
        None
    }

    fn parse_row(
        &self,
        columns: &[Option<Column>],
        record: &StringRecord,
        row_index: usize,
        sheet: &mut ParsedSheet,
    ) {
        let mut candidate = CandidateRecord {
            source_row_index: row_index,
            ..Default::default()
        };
        let mut additional_authors = None;
        let mut isbn10 = None;
        let mut isbn13 = None;
        let mut exclusive_shelf = None;

        for (column, value) in columns.iter().zip(record.iter()) {
            let Some(column) = column else { continue };
            let Some(value) = clean_cell(value) else { continue };

            match column {
                Column::Title => candidate.title = value,
                Column::Author => candidate.author = value,
                Column::AdditionalAuthors => additional_authors = Some(value),
                Column::Isbn => isbn10 = Some(value),
                Column::Isbn13 => isbn13 = Some(value),
                Column::Genre => candidate.genre_raw = Some(value),
                Column::Rating => candidate.rating_raw = Some(value),
                Column::Status => candidate.status_raw = Some(value),
                Column::ExclusiveShelf => {
                    split_shelves(&value, &mut candidate.shelves_raw);
                    exclusive_shelf = Some(value);
                }
                Column::Shelves => split_shelves(&value, &mut candidate.shelves_raw),
                Column::DateAdded => candidate.date_added_raw = Some(value),
                Column::DateFinished => candidate.date_finished_raw = Some(value),
                Column::Publisher => candidate.publisher_raw = Some(value),
                Column::Pages => candidate.pages_raw = Some(value),
                Column::YearPublished => {
                    candidate.year_published_raw.get_or_insert(value);
                }
            }
        }

        let mut missing = Vec::new();
        if candidate.title.is_empty() {
            missing.push("title");
        }
        if candidate.author.is_empty() {
            missing.push("author");
        }
        if !missing.is_empty() {
            tracing::warn!("Row {} dropped: missing {}", row_index, missing.join(", "));
            sheet.diagnostics.error(
                row_index,
                format!("Missing required field(s): {}", missing.join(", ")),
            );
            return;
        }

        if let Some(extra) = additional_authors {
            candidate.author = format!("{}; {}", candidate.author, extra);
        }
        if candidate.status_raw.is_none() {
            candidate.status_raw = exclusive_shelf;
        }

        candidate.isbn = isbn13
            .as_deref()
            .and_then(normalize_isbn)
            .or_else(|| isbn10.as_deref().and_then(normalize_isbn));
        if candidate.isbn.is_none() {
            match isbn13.or(isbn10) {
                Some(raw) => sheet.diagnostics.warn(
                    row_index,
                    format!("No ISBN found (ignored invalid value '{}')", raw),
                ),
                None => sheet.diagnostics.warn(row_index, "No ISBN found"),
            }
        }

        sheet.records.push(candidate);
    }
}
