//! Reading-tracker spreadsheet parsing
//!
//! Turns third-party CSV exports (Goodreads and look-alikes) into typed
//! candidate records plus per-row diagnostics.

pub mod isbn;
pub mod parser;

pub use isbn::normalize_isbn;
pub use parser::CsvParser;
