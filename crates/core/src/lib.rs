//! # transcripts-core
//!
//! Splits a student workbook into per-intake transcript workbooks.
//!
//! The source workbook holds a raw sheet with one row per student and one
//! template sheet per intake. Each student with a known intake gets a full
//! copy of that intake's template, named by student number, with course
//! values placed on the matching course rows and the average attendance and
//! grade written to the intake's aggregate cells.
//!
//! This crate provides:
//! - Run configuration
//! - Record loading from the raw sheet
//! - Intake partitioning and template cloning
//! - Course aggregation
//! - Output writing
//! - Structural validation of input sheets
//! - Low-average alerts

/// Course value placement and averages.
pub mod aggregate;
/// Alert records.
pub mod alert;
/// Run configuration.
pub mod config;
/// Error types and result aliases.
pub mod error;
/// Per-intake partitioning and student outcomes.
pub mod partition;
/// End-to-end run.
pub mod pipeline;
/// Raw sheet records.
pub mod record;
/// Input validation.
pub mod validate;
/// Output workbook persistence.
pub mod writer;

pub use aggregate::{
    aggregate, numeric_value, parse_course_header, round2, Aggregation, Averages, CourseField,
    FieldIssue,
};
pub use alert::{build_alerts, build_alerts_at, Alert};
pub use config::{AggregateCells, RunConfig, Thresholds};
/// Re-export core error types.
pub use error::{TranscriptError, TranscriptResult};
pub use partition::{Partitioner, Placement, SkipReason, StudentOutcome};
pub use pipeline::{
    check_input_format, load_input, run, run_book, split_book, RunReport, Split,
};
pub use record::{headers, load_records, read_records, LoadOptions, StudentRecord};
pub use validate::{
    validate_book, validate_sheet, Severity, SheetReport, ValidationIssue, ValidationReport,
    ValidationScope, ValueClass,
};
pub use writer::write_outputs;
