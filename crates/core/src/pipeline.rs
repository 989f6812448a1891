//! The transcript run: load, partition, aggregate, write.

use crate::aggregate::aggregate;
use crate::config::RunConfig;
use crate::error::{TranscriptError, TranscriptResult};
use crate::partition::{Partitioner, Placement, StudentOutcome};
use crate::record::{load_records, LoadOptions};
use crate::writer::write_outputs;
use indexmap::IndexMap;
use serde::Serialize;
use std::path::{Path, PathBuf};
use transcripts_sheet::{Book, SheetError};

/// In-memory result of splitting a source workbook.
#[derive(Debug)]
pub struct Split {
    /// Output workbooks keyed by intake, in first-seen order.
    pub outputs: IndexMap<String, Book>,
    /// One outcome per raw record, in input order.
    pub outcomes: Vec<StudentOutcome>,
}

/// Summary of a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub input: PathBuf,
    pub records: usize,
    pub outcomes: Vec<StudentOutcome>,
    pub files: Vec<PathBuf>,
}

impl RunReport {
    pub fn written_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_written()).count()
    }

    pub fn skipped_count(&self) -> usize {
        self.outcomes.len() - self.written_count()
    }

    /// Number of non-numeric course values across written students.
    pub fn field_issue_count(&self) -> usize {
        self.outcomes
            .iter()
            .map(|o| match o {
                StudentOutcome::Written { field_issues, .. } => field_issues.len(),
                StudentOutcome::Skipped { .. } => 0,
            })
            .sum()
    }
}

/// Split a loaded source workbook into per-intake transcript workbooks.
pub fn split_book(source: &Book, config: &RunConfig) -> TranscriptResult<Split> {
    let records = load_records(
        source,
        &config.raw_sheet,
        LoadOptions {
            stop_at_blank_row: config.stop_at_blank_row,
        },
    )?;

    let mut partitioner = Partitioner::new(source, config);
    let mut outcomes = Vec::with_capacity(records.len());

    for record in &records {
        let outcome = match partitioner.place(record)? {
            Placement::Sheet {
                intake,
                student_no,
                sheet,
            } => {
                let aggregation = aggregate(record, sheet, &intake, config)?;
                tracing::info!(
                    student = %student_no,
                    intake = %intake,
                    "{}",
                    aggregation.averages
                );
                StudentOutcome::Written {
                    intake,
                    student_no,
                    averages: aggregation.averages,
                    field_issues: aggregation.issues,
                }
            }
            Placement::Skipped {
                intake,
                student_no,
                reason,
            } => {
                tracing::warn!(
                    row = record.row(),
                    student = student_no.as_deref().unwrap_or("-"),
                    intake = intake.as_deref().unwrap_or("-"),
                    "skipping student: {reason}"
                );
                StudentOutcome::Skipped {
                    row: record.row(),
                    student_no,
                    intake,
                    reason,
                }
            }
        };
        outcomes.push(outcome);
    }

    Ok(Split {
        outputs: partitioner.into_outputs(),
        outcomes,
    })
}

/// Reject anything that is not an `.xlsx` path before touching the file.
pub fn check_input_format(input: &Path) -> TranscriptResult<()> {
    let is_xlsx = input
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("xlsx"));
    if is_xlsx {
        Ok(())
    } else {
        Err(TranscriptError::UnsupportedFormat(
            input.display().to_string(),
        ))
    }
}

/// Load the source workbook. A file that cannot be opened as an xlsx
/// package is an unsupported format, whatever its extension.
pub fn load_input(input: &Path) -> TranscriptResult<Book> {
    check_input_format(input)?;
    Book::from_xlsx(input).map_err(|e| match e {
        SheetError::Zip(_) | SheetError::Xlsx(_) => {
            tracing::debug!("cannot open {} as xlsx: {e}", input.display());
            TranscriptError::UnsupportedFormat(input.display().to_string())
        }
        other => other.into(),
    })
}

/// Read `input`, generate every intake workbook and write them to `out_dir`.
pub fn run(input: &Path, out_dir: &Path, config: &RunConfig) -> TranscriptResult<RunReport> {
    let source = load_input(input)?;
    tracing::debug!(
        input = %input.display(),
        sheets = source.sheet_count(),
        "loaded workbook"
    );
    run_book(&source, input, out_dir, config)
}

/// Generate and write every intake workbook from an already loaded source.
/// `input` is recorded in the report only.
pub fn run_book(
    source: &Book,
    input: &Path,
    out_dir: &Path,
    config: &RunConfig,
) -> TranscriptResult<RunReport> {
    let split = split_book(source, config)?;
    let files = write_outputs(&split.outputs, out_dir, config)?;

    let report = RunReport {
        input: input.to_path_buf(),
        records: split.outcomes.len(),
        outcomes: split.outcomes,
        files,
    };
    tracing::info!(
        written = report.written_count(),
        skipped = report.skipped_count(),
        files = report.files.len(),
        "all transcripts generated in {}",
        out_dir.display()
    );
    Ok(report)
}
