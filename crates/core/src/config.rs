//! Run configuration.

use crate::error::{TranscriptError, TranscriptResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use transcripts_sheet::{CellRef, ColIndex};

/// Where the two averages go for intakes starting with `prefix`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateCells {
    pub prefix: String,
    /// Cell receiving the average attendance, in A1 notation.
    pub attendance: String,
    /// Cell receiving the average grade, in A1 notation.
    pub grade: String,
}

impl AggregateCells {
    pub fn new(prefix: &str, attendance: &str, grade: &str) -> Self {
        AggregateCells {
            prefix: prefix.to_string(),
            attendance: attendance.to_string(),
            grade: grade.to_string(),
        }
    }
}

/// Alert thresholds. Averages strictly below these raise an alert.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub min_grade: f64,
    pub min_attendance: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Thresholds {
            min_grade: 40.0,
            min_attendance: 60.0,
        }
    }
}

/// Configuration for one transcript run.
///
/// Column numbers are 1-based, as shown in Excel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub raw_sheet: String,
    pub student_no_header: String,
    pub intake_header: String,
    pub course_code_column: u16,
    pub attendance_column: u16,
    pub grade_column: u16,
    pub output_suffix: String,
    pub stop_at_blank_row: bool,
    pub aggregate_cells: Vec<AggregateCells>,
    pub thresholds: Thresholds,
    pub archive_name: String,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            raw_sheet: "Raw".to_string(),
            student_no_header: "Student No".to_string(),
            intake_header: "Intake".to_string(),
            course_code_column: 1,
            attendance_column: 5,
            grade_column: 6,
            output_suffix: "_Transcripts.xlsx".to_string(),
            stop_at_blank_row: true,
            aggregate_cells: vec![
                AggregateCells::new("BM", "E19", "F19"),
                AggregateCells::new("BA", "E11", "F11"),
            ],
            thresholds: Thresholds::default(),
            archive_name: "All_Transcripts.zip".to_string(),
        }
    }
}

impl RunConfig {
    /// Load a configuration file. `.yaml`/`.yml` is read as YAML, anything
    /// else as JSON. Missing keys take their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> TranscriptResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let is_yaml = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"));

        let config: RunConfig = if is_yaml {
            serde_yaml::from_str(&text)
                .map_err(|e| TranscriptError::config(format!("{}: {e}", path.display())))?
        } else {
            serde_json::from_str(&text)
                .map_err(|e| TranscriptError::config(format!("{}: {e}", path.display())))?
        };
        config.validate()?;
        Ok(config)
    }

    /// Check that column numbers and aggregate cell addresses are usable.
    pub fn validate(&self) -> TranscriptResult<()> {
        for (name, column) in [
            ("course_code_column", self.course_code_column),
            ("attendance_column", self.attendance_column),
            ("grade_column", self.grade_column),
        ] {
            if column == 0 {
                return Err(TranscriptError::config(format!(
                    "{name} is 1-based and must be at least 1"
                )));
            }
        }
        for cells in &self.aggregate_cells {
            for address in [&cells.attendance, &cells.grade] {
                address.parse::<CellRef>().map_err(|e| {
                    TranscriptError::config(format!("aggregate cell for {}: {e}", cells.prefix))
                })?;
            }
        }
        if self.output_suffix.is_empty() {
            return Err(TranscriptError::config("output_suffix must not be empty"));
        }
        Ok(())
    }

    /// Zero-based course code column.
    pub(crate) fn course_code_col(&self) -> ColIndex {
        self.course_code_column.saturating_sub(1)
    }

    pub(crate) fn attendance_col(&self) -> ColIndex {
        self.attendance_column.saturating_sub(1)
    }

    pub(crate) fn grade_col(&self) -> ColIndex {
        self.grade_column.saturating_sub(1)
    }

    /// Aggregate cells for an intake: the first entry whose prefix the
    /// intake starts with.
    pub fn aggregate_cells_for(&self, intake: &str) -> Option<&AggregateCells> {
        self.aggregate_cells
            .iter()
            .find(|cells| intake.starts_with(cells.prefix.as_str()))
    }

    /// Output file name for an intake.
    pub fn output_file_name(&self, intake: &str) -> String {
        format!("{intake}{}", self.output_suffix)
    }
}
