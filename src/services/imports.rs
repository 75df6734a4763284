//! Spreadsheet import service
//!
//! Drives one import run through `Parsing -> Normalizing -> Importing ->
//! Finalizing` and ends in `Completed` or `Aborted`. Rows are processed one at
//! a time in source order; a failing row is recorded and the run continues.
//! Progress goes out over a single channel per run.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::Instrument;
use uuid::Uuid;

use super::{
    collections::CollectionResolver, dedup::DeduplicationChecker, enrichment::EnrichmentClient,
};
use crate::{
    config::ImportConfig,
    csv_import::CsvParser,
    error::{AppError, AppResult},
    models::{
        ImportEvent, ImportHistoryEntry, ImportItemResult, ImportOptions, ImportPhase, ImportPreview,
        ImportResult, ItemOutcome, NewBook, NewImportHistory, NormalizedCandidate, ParseDiagnostics,
    },
    normalize::standardize_candidate,
    repository::{InsertPolicy, LibraryStore},
};

/// Largest history page a caller may request
pub const MAX_HISTORY_LIMIT: i64 = 100;

/// Rows ready for the import loop
#[derive(Debug, Clone)]
pub struct PreparedImport {
    pub candidates: Vec<NormalizedCandidate>,
    pub diagnostics: ParseDiagnostics,
    pub total_rows: usize,
}

/// Forward-only phase bookkeeping for one run
struct RunPhase {
    current: ImportPhase,
}

impl RunPhase {
    fn new() -> Self {
        Self {
            current: ImportPhase::Idle,
        }
    }

    fn advance(&mut self, next: ImportPhase) -> ImportPhase {
        debug_assert!(next > self.current, "import phase moved from {:?} to {:?}", self.current, next);
        tracing::debug!(from = ?self.current, to = ?next, "Import phase");
        self.current = next;
        next
    }
}

#[derive(Clone)]
pub struct ImportService {
    store: Arc<dyn LibraryStore>,
    dedup: DeduplicationChecker,
    enrichment: EnrichmentClient,
    parser: CsvParser,
    config: ImportConfig,
}

impl ImportService {
    pub fn new(store: Arc<dyn LibraryStore>, enrichment: EnrichmentClient, config: ImportConfig) -> Self {
        Self {
            dedup: DeduplicationChecker::new(store.clone()),
            store,
            enrichment,
            parser: CsvParser::new(),
            config,
        }
    }

    pub fn config(&self) -> &ImportConfig {
        &self.config
    }

    /// Check an uploaded file before any parsing and decode it.
    pub fn validate_upload(&self, file_name: &str, bytes: &[u8]) -> AppResult<String> {
        if !file_name.to_lowercase().ends_with(".csv") {
            return Err(AppError::Validation(format!(
                "Only .csv files can be imported (got '{}')",
                file_name
            )));
        }
        if bytes.is_empty() {
            return Err(AppError::Validation("Uploaded file is empty".to_string()));
        }
        if bytes.len() > self.config.max_file_size_bytes {
            return Err(AppError::Validation(format!(
                "File is {} bytes, the limit is {} bytes",
                bytes.len(),
                self.config.max_file_size_bytes
            )));
        }
        String::from_utf8(bytes.to_vec())
            .map_err(|_| AppError::Validation("File is not valid UTF-8 text".to_string()))
    }

    /// Parse and normalize, keeping only the selected rows.
    ///
    /// Fails with a validation error when no row survives parsing.
    pub fn prepare(&self, text: &str, options: &ImportOptions) -> AppResult<PreparedImport> {
        let sheet = self.parser.parse(text);
        for dropped in &sheet.diagnostics.errors {
            tracing::warn!(row = dropped.row_index, reason = %dropped.reason, "Row dropped");
        }
        if sheet.records.is_empty() {
            return Err(AppError::Validation(format!(
                "No valid rows found in CSV file ({} rows read, {} rejected)",
                sheet.total_rows,
                sheet.diagnostics.errors.len()
            )));
        }

        let candidates: Vec<NormalizedCandidate> = sheet
            .records
            .into_iter()
            .filter(|record| {
                options
                    .selected_row_indices
                    .as_ref()
                    .map_or(true, |selected| selected.contains(&record.source_row_index))
            })
            .map(standardize_candidate)
            .collect();

        if candidates.is_empty() {
            return Err(AppError::Validation("None of the selected rows can be imported".to_string()));
        }

        Ok(PreparedImport {
            candidates,
            diagnostics: sheet.diagnostics,
            total_rows: sheet.total_rows,
        })
    }

    /// Normalized rows and diagnostics, without touching the library.
    pub fn preview(&self, text: &str, options: &ImportOptions) -> AppResult<ImportPreview> {
        let prepared = self.prepare(text, options)?;
        Ok(ImportPreview {
            candidates: prepared.candidates,
            diagnostics: prepared.diagnostics,
            total_rows: prepared.total_rows,
        })
    }

    /// Run a whole import from raw text. Returns the terminal phase.
    pub async fn run(
        &self,
        user_id: i64,
        file_name: &str,
        text: &str,
        options: &ImportOptions,
        events: mpsc::Sender<ImportEvent>,
    ) -> ImportPhase {
        let mut phase = RunPhase::new();
        phase.advance(ImportPhase::Parsing);

        match self.prepare(text, options) {
            Ok(prepared) => self.execute(user_id, file_name, prepared, options, events).await,
            Err(e) => {
                tracing::warn!(error = %e, file = %file_name, "Import aborted before any row was processed");
                let _ = events.send(ImportEvent::Error { error: e.to_string() }).await;
                phase.advance(ImportPhase::Aborted)
            }
        }
    }

    /// Import prepared rows, streaming one progress event per row.
    pub async fn execute(
        &self,
        user_id: i64,
        file_name: &str,
        prepared: PreparedImport,
        options: &ImportOptions,
        events: mpsc::Sender<ImportEvent>,
    ) -> ImportPhase {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("import_run", %run_id, user_id, file = %file_name);
        self.execute_inner(user_id, file_name, prepared, options, events)
            .instrument(span)
            .await
    }

    async fn execute_inner(
        &self,
        user_id: i64,
        file_name: &str,
        prepared: PreparedImport,
        options: &ImportOptions,
        events: mpsc::Sender<ImportEvent>,
    ) -> ImportPhase {
        let mut phase = RunPhase::new();
        phase.advance(ImportPhase::Normalizing);
        phase.advance(ImportPhase::Importing);

        let total = prepared.candidates.len();
        tracing::info!(
            rows = total,
            dropped = prepared.diagnostics.errors.len(),
            enrich = options.enrich_from_external_source,
            "Import started"
        );

        let mut result = ImportResult::default();
        let mut resolver = CollectionResolver::new(self.store.clone(), user_id);
        let mut cancelled = false;

        for (position, candidate) in prepared.candidates.iter().enumerate() {
            if events.is_closed() {
                tracing::warn!(processed = position, total, "Progress stream closed by client, stopping import");
                cancelled = true;
                break;
            }

            let outcome = self.import_row(user_id, candidate, options, &mut resolver).await;
            // Collections made before a row failed still exist
            let created = resolver.take_created();
            let item = match outcome {
                Ok(item) => item,
                Err(e) => {
                    tracing::warn!(row = candidate.source_row_index, title = %candidate.title, error = %e, "Row failed");
                    ImportItemResult {
                        source_row_index: candidate.source_row_index,
                        outcome: ItemOutcome::Failed,
                        error: Some(e.to_string()),
                        created_collections: created.clone(),
                    }
                }
            };
            tracing::debug!(row = candidate.source_row_index, outcome = ?item.outcome, "Row processed");
            result.record(&candidate.title, &item);
            result.collections_created.extend(created);

            let _ = events
                .send(ImportEvent::Progress {
                    current: position + 1,
                    total,
                    current_book: candidate.title.clone(),
                })
                .await;
        }

        phase.advance(ImportPhase::Finalizing);
        let history = NewImportHistory {
            user_id,
            source: self.config.source_tag.clone(),
            file_name: file_name.to_string(),
            total_rows: count(total),
            success_count: count(result.imported),
            skip_count: count(result.skipped),
            error_count: count(result.failed),
            errors: result.errors.clone(),
        };

        if let Err(e) = self.store.create_import_history(&history).await {
            let err = AppError::HistoryPersist(e.to_string());
            tracing::error!(error = %err, imported = result.imported, "Import history could not be saved");
            let _ = events.send(ImportEvent::Error { error: err.to_string() }).await;
            return phase.advance(ImportPhase::Aborted);
        }

        tracing::info!(
            processed = result.total_processed,
            imported = result.imported,
            skipped = result.skipped,
            failed = result.failed,
            collections = result.collections_created.len(),
            "Import finished"
        );

        if cancelled {
            return phase.advance(ImportPhase::Aborted);
        }
        let _ = events.send(ImportEvent::Complete { result }).await;
        phase.advance(ImportPhase::Completed)
    }

    /// Dedup, enrich, persist and attach collections for one row.
    async fn import_row(
        &self,
        user_id: i64,
        candidate: &NormalizedCandidate,
        options: &ImportOptions,
        resolver: &mut CollectionResolver,
    ) -> AppResult<ImportItemResult> {
        let skipped = ImportItemResult {
            source_row_index: candidate.source_row_index,
            outcome: ItemOutcome::SkippedDuplicate,
            error: None,
            created_collections: Vec::new(),
        };

        let mut draft = NewBook::from_candidate(candidate);
        if let Some(manual) = options.manual_overrides.get(&candidate.source_row_index) {
            draft.apply_override(manual);
        }

        if options.skip_duplicates {
            if let Some(existing) = self.dedup.find_duplicate(user_id, &draft).await? {
                tracing::debug!(row = candidate.source_row_index, existing, "Duplicate skipped");
                return Ok(skipped);
            }
        }

        if options.enrich_from_external_source && self.enrichment.is_enabled() {
            let found = self.enrichment.enrich(&draft, options.fast_enrichment).await;
            draft.fill_gaps(&found);
        }

        let policy = if options.skip_duplicates {
            InsertPolicy::RejectDuplicates
        } else {
            InsertPolicy::AllowDuplicates
        };
        let book = match self.store.create_book(user_id, &draft, policy).await {
            Ok(book) => book,
            Err(AppError::Duplicate(reason)) => {
                tracing::debug!(row = candidate.source_row_index, %reason, "Duplicate rejected at insert");
                return Ok(skipped);
            }
            Err(e) => return Err(e),
        };

        let shelves = resolver.resolve(&candidate.shelves, options.create_collections).await?;
        for collection in &shelves.collections {
            self.store.add_book_to_collection(collection.id, book.id).await?;
        }

        Ok(ImportItemResult {
            source_row_index: candidate.source_row_index,
            outcome: ItemOutcome::Imported,
            error: None,
            created_collections: shelves.created,
        })
    }

    /// Most recent import runs of a user
    pub async fn list_history(&self, user_id: i64, limit: Option<i64>) -> AppResult<Vec<ImportHistoryEntry>> {
        let limit = limit
            .unwrap_or(self.config.history_limit)
            .clamp(1, MAX_HISTORY_LIMIT);
        self.store.list_import_history(user_id, limit).await
    }
}

fn count(n: usize) -> i32 {
    i32::try_from(n).unwrap_or(i32::MAX)
}
