//! Data models for Readshelf

pub mod book;
pub mod collection;
pub mod import;
pub mod user;

// Re-export commonly used types
pub use book::{duplicate_match, Book, BookMetadata, ExistingBook, NewBook};
pub use collection::{Collection, CollectionRef, NewCollection};
pub use import::{
    CandidateRecord, ImportEvent, ImportHistoryEntry, ImportItemResult, ImportOptions, ImportPhase,
    ImportPreview, ImportResult, ItemOutcome, NewImportHistory, NormalizedCandidate, ParseDiagnostics,
    ParsedSheet, ReadingStatus,
};
pub use user::UserClaims;
