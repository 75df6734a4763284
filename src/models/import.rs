//! Spreadsheet import models: parsed rows, normalized candidates, run options,
//! per-row outcomes, the streamed events and the persisted audit record.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{DateTime, NaiveDate, Utc};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use super::book::BookMetadata;
use crate::error::{AppError, AppResult};

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// A typed spreadsheet row before normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CandidateRecord {
    pub title: String,
    pub author: String,
    pub isbn: Option<String>,
    pub genre_raw: Option<String>,
    pub rating_raw: Option<String>,
    pub status_raw: Option<String>,
    pub shelves_raw: Vec<String>,
    pub date_added_raw: Option<String>,
    pub date_finished_raw: Option<String>,
    pub publisher_raw: Option<String>,
    pub pages_raw: Option<String>,
    pub year_published_raw: Option<String>,
    pub source_row_index: usize,
}

/// One parser diagnostic, tied to the 0-based data row it concerns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RowDiagnostic {
    pub row_index: usize,
    pub reason: String,
}

/// Dropped rows (`errors`) and rows kept in a degraded state (`warnings`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct ParseDiagnostics {
    pub errors: Vec<RowDiagnostic>,
    pub warnings: Vec<RowDiagnostic>,
}

impl ParseDiagnostics {
    pub fn error(&mut self, row_index: usize, reason: impl Into<String>) {
        self.errors.push(RowDiagnostic {
            row_index,
            reason: reason.into(),
        });
    }

    /// Records a warning unless the row already has one.
    pub fn warn(&mut self, row_index: usize, reason: impl Into<String>) {
        if self.warnings.iter().any(|w| w.row_index == row_index) {
            return;
        }
        self.warnings.push(RowDiagnostic {
            row_index,
            reason: reason.into(),
        });
    }
}

/// Parser output: surviving rows plus diagnostics
#[derive(Debug, Clone, Default)]
pub struct ParsedSheet {
    pub records: Vec<CandidateRecord>,
    pub diagnostics: ParseDiagnostics,
    /// Data rows seen, including dropped ones
    pub total_rows: usize,
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// Canonical reading status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum ReadingStatus {
    #[default]
    WantToRead,
    CurrentlyReading,
    Finished,
}

impl ReadingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReadingStatus::WantToRead => "want-to-read",
            ReadingStatus::CurrentlyReading => "currently-reading",
            ReadingStatus::Finished => "finished",
        }
    }
}

impl std::fmt::Display for ReadingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A row after author, title, series and status canonicalization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedCandidate {
    pub source_row_index: usize,
    pub title: String,
    pub series: Option<String>,
    pub series_number: Option<u32>,
    pub author: String,
    pub reading_status: ReadingStatus,
    pub isbn: Option<String>,
    pub genre: Option<String>,
    pub rating: Option<i16>,
    pub shelves: Vec<String>,
    pub date_added: Option<NaiveDate>,
    pub date_finished: Option<NaiveDate>,
    pub publisher: Option<String>,
    pub page_count: Option<i32>,
    pub published_date: Option<String>,
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Options recognized by an import run
#[derive(Debug, Clone, PartialEq)]
pub struct ImportOptions {
    pub preview_only: bool,
    /// Skip rows matching an existing book instead of inserting them again
    pub skip_duplicates: bool,
    pub create_collections: bool,
    pub enrich_from_external_source: bool,
    pub fast_enrichment: bool,
    /// Caller-supplied metadata per source row; wins over spreadsheet and enrichment
    pub manual_overrides: BTreeMap<usize, BookMetadata>,
    pub selected_row_indices: Option<BTreeSet<usize>>,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            preview_only: false,
            skip_duplicates: true,
            create_collections: false,
            enrich_from_external_source: false,
            fast_enrichment: false,
            manual_overrides: BTreeMap::new(),
            selected_row_indices: None,
        }
    }
}

impl ImportOptions {
    /// Build options from multipart text fields.
    ///
    /// Booleans accept `true/false`, `1/0`, `on/off`, `yes/no`. `selectedIndices`
    /// is a JSON array of row indices and `manuallySelectedBooks` a JSON object
    /// keyed by row index.
    pub fn from_form_fields(fields: &HashMap<String, String>) -> AppResult<Self> {
        let defaults = Self::default();
        let flag = |name: &str, default: bool| -> AppResult<bool> {
            match fields.get(name) {
                None => Ok(default),
                Some(raw) => parse_flag(raw)
                    .ok_or_else(|| AppError::Validation(format!("Invalid boolean for {}: {}", name, raw))),
            }
        };

        let selected_row_indices = match fields.get("selectedIndices").map(|s| s.trim()) {
            None | Some("") | Some("null") => None,
            Some(raw) => Some(
                serde_json::from_str::<BTreeSet<usize>>(raw)
                    .map_err(|e| AppError::Validation(format!("Invalid selectedIndices: {}", e)))?,
            ),
        };

        let manual_overrides = match fields.get("manuallySelectedBooks").map(|s| s.trim()) {
            None | Some("") | Some("null") => BTreeMap::new(),
            Some(raw) => {
                let by_key: HashMap<String, BookMetadata> = serde_json::from_str(raw)
                    .map_err(|e| AppError::Validation(format!("Invalid manuallySelectedBooks: {}", e)))?;
                let mut overrides = BTreeMap::new();
                for (key, metadata) in by_key {
                    let index = key.trim().parse::<usize>().map_err(|_| {
                        AppError::Validation(format!("Invalid row index in manuallySelectedBooks: {}", key))
                    })?;
                    metadata.validate().map_err(|e| {
                        AppError::Validation(format!("Invalid metadata for row {}: {}", index, e))
                    })?;
                    overrides.insert(index, metadata);
                }
                overrides
            }
        };

        Ok(Self {
            preview_only: flag("previewOnly", defaults.preview_only)?,
            skip_duplicates: flag("skipDuplicates", defaults.skip_duplicates)?,
            create_collections: flag("createCollections", defaults.create_collections)?,
            enrich_from_external_source: flag("enrichFromExternalSource", defaults.enrich_from_external_source)?,
            fast_enrichment: flag("fastMode", defaults.fast_enrichment)?,
            manual_overrides,
            selected_row_indices,
        })
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "1" | "on" | "yes" => Some(true),
        "false" | "0" | "off" | "no" | "" => Some(false),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// What happened to one row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum ItemOutcome {
    Imported,
    SkippedDuplicate,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImportItemResult {
    pub source_row_index: usize,
    pub outcome: ItemOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub created_collections: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ImportErrorEntry {
    pub book: String,
    pub error: String,
}

/// Aggregate returned once at the end of a run.
///
/// `total_processed == imported + skipped + failed` holds after every call to
/// [`ImportResult::record`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImportResult {
    pub total_processed: usize,
    pub imported: usize,
    pub skipped: usize,
    pub failed: usize,
    pub errors: Vec<ImportErrorEntry>,
    #[schema(value_type = Vec<String>)]
    pub collections_created: IndexSet<String>,
}

impl ImportResult {
    pub fn record(&mut self, book_title: &str, item: &ImportItemResult) {
        self.total_processed += 1;
        match item.outcome {
            ItemOutcome::Imported => self.imported += 1,
            ItemOutcome::SkippedDuplicate => self.skipped += 1,
            ItemOutcome::Failed => {
                self.failed += 1;
                self.errors.push(ImportErrorEntry {
                    book: book_title.to_string(),
                    error: item.error.clone().unwrap_or_else(|| "Unknown error".to_string()),
                });
            }
        }
        for name in &item.created_collections {
            self.collections_created.insert(name.clone());
        }
    }
}

/// Event written to the progress stream, one JSON object per line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ImportEvent {
    Progress {
        current: usize,
        total: usize,
        #[serde(rename = "currentBook")]
        current_book: String,
    },
    Complete {
        result: ImportResult,
    },
    Error {
        error: String,
    },
}

impl ImportEvent {
    /// Serialize as a newline-terminated JSON line
    pub fn to_ndjson_line(&self) -> String {
        let mut line = serde_json::to_string(self).unwrap_or_else(|e| {
            format!(r#"{{"type":"error","error":"failed to encode event: {}"}}"#, e)
        });
        line.push('\n');
        line
    }
}

/// Response returned when `previewOnly` is set
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImportPreview {
    pub candidates: Vec<NormalizedCandidate>,
    pub diagnostics: ParseDiagnostics,
    pub total_rows: usize,
}

/// States of a single import run. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ImportPhase {
    Idle,
    Parsing,
    Normalizing,
    Importing,
    Finalizing,
    Completed,
    Aborted,
}

// ---------------------------------------------------------------------------
// History
// ---------------------------------------------------------------------------

/// Persisted audit record of one run
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct ImportHistoryEntry {
    pub id: i64,
    pub user_id: i64,
    pub source: String,
    pub file_name: String,
    pub total_rows: i32,
    pub success_count: i32,
    pub skip_count: i32,
    pub error_count: i32,
    #[schema(value_type = Object)]
    pub errors: serde_json::Value,
    pub imported_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewImportHistory {
    pub user_id: i64,
    pub source: String,
    pub file_name: String,
    pub total_rows: i32,
    pub success_count: i32,
    pub skip_count: i32,
    pub error_count: i32,
    pub errors: Vec<ImportErrorEntry>,
}
