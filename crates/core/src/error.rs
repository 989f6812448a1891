//! Error types for transcript generation.

use thiserror::Error;
use transcripts_sheet::SheetError;

/// Result type for transcript operations.
pub type TranscriptResult<T> = Result<T, TranscriptError>;

/// Errors that abort a run.
///
/// Per-student problems are not errors: they are reported as
/// [`StudentOutcome::Skipped`](crate::StudentOutcome::Skipped) or as
/// [`FieldIssue`](crate::FieldIssue)s on a written outcome.
#[derive(Debug, Error)]
pub enum TranscriptError {
    /// A required sheet is absent from the input workbook.
    #[error("Missing sheet: {0}")]
    MissingSheet(String),

    /// The input file is not an `.xlsx` workbook.
    #[error("Unsupported file format: {0} (expected .xlsx)")]
    UnsupportedFormat(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Workbook read/write error.
    #[error(transparent)]
    Sheet(#[from] SheetError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TranscriptError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}
