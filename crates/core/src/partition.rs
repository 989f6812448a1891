//! Grouping of students into per-intake output workbooks.

use crate::aggregate::{Averages, FieldIssue};
use crate::config::RunConfig;
use crate::error::TranscriptResult;
use crate::record::StudentRecord;
use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;
use transcripts_sheet::{clone_sheet, Book, Sheet};

/// Why a record produced no transcript sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    MissingIntake,
    MissingStudentNo,
    NoTemplate,
    /// The intake's workbook already has a sheet for this student number.
    DuplicateStudent,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SkipReason::MissingIntake => "missing intake",
            SkipReason::MissingStudentNo => "missing student number",
            SkipReason::NoTemplate => "no template sheet for intake",
            SkipReason::DuplicateStudent => "duplicate student number in intake",
        };
        f.write_str(text)
    }
}

/// What happened to one record of the raw sheet.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StudentOutcome {
    Written {
        intake: String,
        student_no: String,
        averages: Averages,
        field_issues: Vec<FieldIssue>,
    },
    Skipped {
        row: u32,
        student_no: Option<String>,
        intake: Option<String>,
        reason: SkipReason,
    },
}

impl StudentOutcome {
    pub fn is_written(&self) -> bool {
        matches!(self, StudentOutcome::Written { .. })
    }
}

/// Where a record goes.
#[derive(Debug)]
pub enum Placement<'a> {
    /// A fresh copy of the intake template, already added to the intake's
    /// output workbook under the student number.
    Sheet {
        intake: String,
        student_no: String,
        sheet: &'a mut Sheet,
    },
    Skipped {
        intake: Option<String>,
        student_no: Option<String>,
        reason: SkipReason,
    },
}

/// Routes records to template copies inside per-intake workbooks.
///
/// Every sheet of the source workbook other than the raw sheet is a
/// template, looked up by the trimmed intake value. Output workbooks are
/// created on the first student of their intake and kept in first-seen order.
pub struct Partitioner<'a> {
    templates: IndexMap<&'a str, &'a Sheet>,
    config: &'a RunConfig,
    outputs: IndexMap<String, Book>,
}

impl<'a> Partitioner<'a> {
    pub fn new(source: &'a Book, config: &'a RunConfig) -> Self {
        let templates = source
            .sheets()
            .filter(|(name, _)| *name != config.raw_sheet)
            .collect();
        Partitioner {
            templates,
            config,
            outputs: IndexMap::new(),
        }
    }

    /// Template sheet names in workbook order.
    pub fn template_names(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().copied()
    }

    /// Resolve a record to its destination sheet, cloning the template.
    pub fn place(&mut self, record: &StudentRecord) -> TranscriptResult<Placement<'_>> {
        let intake = record.text(&self.config.intake_header);
        let student_no = record.text(&self.config.student_no_header);

        let (intake, student_no) = match (intake, student_no) {
            (Some(intake), Some(student_no)) => (intake, student_no),
            (None, student_no) => {
                return Ok(Placement::Skipped {
                    intake: None,
                    student_no,
                    reason: SkipReason::MissingIntake,
                })
            }
            (intake, None) => {
                return Ok(Placement::Skipped {
                    intake,
                    student_no: None,
                    reason: SkipReason::MissingStudentNo,
                })
            }
        };

        let Some(template) = self.templates.get(intake.as_str()).copied() else {
            return Ok(Placement::Skipped {
                intake: Some(intake),
                student_no: Some(student_no),
                reason: SkipReason::NoTemplate,
            });
        };

        let book = self
            .outputs
            .entry(intake.clone())
            .or_insert_with(|| Book::with_name(&intake));
        // Sheet names collide regardless of case
        if book.is_name_taken(&student_no) {
            return Ok(Placement::Skipped {
                intake: Some(intake),
                student_no: Some(student_no),
                reason: SkipReason::DuplicateStudent,
            });
        }

        let sheet = book.add_sheet(&student_no, clone_sheet(template, &student_no))?;
        Ok(Placement::Sheet {
            intake,
            student_no,
            sheet,
        })
    }

    /// Output workbooks keyed by intake, in first-seen order.
    pub fn outputs(&self) -> &IndexMap<String, Book> {
        &self.outputs
    }

    pub fn into_outputs(self) -> IndexMap<String, Book> {
        self.outputs
    }
}
