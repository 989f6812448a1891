//! Structural quality checks for input sheets.

use crate::error::{TranscriptError, TranscriptResult};
use crate::record::headers;
use serde::Serialize;
use std::fmt;
use transcripts_sheet::{Book, CellValue, ColIndex, RowIndex, Sheet};

/// How many empty cells are listed by position.
const EMPTY_CELL_EXAMPLES: usize = 10;
/// How many mismatching values are kept per column.
const MISMATCH_EXAMPLES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

/// Coarse type of a cell value, used for per-column consistency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueClass {
    Text,
    Number,
    Other,
}

impl ValueClass {
    fn of(value: &CellValue) -> Option<Self> {
        match value {
            CellValue::Null => None,
            CellValue::String(_) => Some(ValueClass::Text),
            CellValue::Int(_) | CellValue::Float(_) => Some(ValueClass::Number),
            CellValue::Bool(_) | CellValue::DateTime(_) => Some(ValueClass::Other),
        }
    }
}

impl fmt::Display for ValueClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ValueClass::Text => "text",
            ValueClass::Number => "number",
            ValueClass::Other => "other",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationIssue {
    /// 1-based positions of header cells that are blank.
    UnnamedColumns { positions: Vec<usize> },
    RepeatedColumns { names: Vec<String> },
    /// Values whose class differs from the column's first value.
    TypeMismatch {
        column: String,
        expected: ValueClass,
        examples: Vec<CellValue>,
    },
    /// Named columns without a single non-blank value.
    EmptyColumns { names: Vec<String> },
    EmptyCells { total: usize, examples: Vec<String> },
}

impl ValidationIssue {
    pub fn severity(&self) -> Severity {
        match self {
            ValidationIssue::EmptyCells { .. } => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::UnnamedColumns { positions } => {
                write!(f, "Unnamed columns at positions: {positions:?}")
            }
            ValidationIssue::RepeatedColumns { names } => {
                write!(f, "Repeated column names: {names:?}")
            }
            ValidationIssue::TypeMismatch {
                column,
                expected,
                examples,
            } => {
                let examples: Vec<String> = examples.iter().map(ToString::to_string).collect();
                write!(
                    f,
                    "Type mismatch in column {column}: expected {expected}, examples {examples:?}"
                )
            }
            ValidationIssue::EmptyColumns { names } => {
                write!(f, "Empty columns with no values: {names:?}")
            }
            ValidationIssue::EmptyCells { total, examples } => {
                write!(f, "{total} empty cells, first {}: {examples:?}", examples.len())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SheetReport {
    pub sheet: String,
    pub issues: Vec<ValidationIssue>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ValidationReport {
    pub sheets: Vec<SheetReport>,
}

impl ValidationReport {
    /// True when some issue has error severity.
    pub fn has_errors(&self) -> bool {
        self.issues().any(|(_, issue)| issue.severity() == Severity::Error)
    }

    pub fn is_clean(&self) -> bool {
        self.sheets.iter().all(|s| s.issues.is_empty())
    }

    /// All issues with the sheet they belong to.
    pub fn issues(&self) -> impl Iterator<Item = (&str, &ValidationIssue)> {
        self.sheets
            .iter()
            .flat_map(|s| s.issues.iter().map(move |i| (s.sheet.as_str(), i)))
    }
}

/// Which sheets of a workbook to inspect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationScope<'a> {
    /// Only the named sheet; it must exist.
    Sheet(&'a str),
    AllSheets,
}

/// Check a workbook's header row and data for structural problems.
pub fn validate_book(book: &Book, scope: ValidationScope<'_>) -> TranscriptResult<ValidationReport> {
    let sheets: Vec<&Sheet> = match scope {
        ValidationScope::Sheet(name) => vec![book
            .get_sheet(name)
            .map_err(|_| TranscriptError::MissingSheet(name.to_string()))?],
        ValidationScope::AllSheets => book.sheets().map(|(_, sheet)| sheet).collect(),
    };

    let mut report = ValidationReport::default();
    for sheet in sheets {
        let issues = validate_sheet(sheet);
        for issue in &issues {
            match issue.severity() {
                Severity::Error => tracing::warn!(sheet = sheet.name(), "{issue}"),
                Severity::Warning => tracing::debug!(sheet = sheet.name(), "{issue}"),
            }
        }
        report.sheets.push(SheetReport {
            sheet: sheet.name().to_string(),
            issues,
        });
    }
    Ok(report)
}

/// Check one sheet. Row 1 is the header row.
pub fn validate_sheet(sheet: &Sheet) -> Vec<ValidationIssue> {
    let headers = headers(sheet);
    let data_rows: Vec<RowIndex> = (1..sheet.row_count()).map(|r| r as RowIndex).collect();
    let mut issues = Vec::new();

    let positions: Vec<usize> = headers
        .iter()
        .enumerate()
        .filter(|(_, h)| h.is_empty())
        .map(|(i, _)| i + 1)
        .collect();
    if !positions.is_empty() {
        issues.push(ValidationIssue::UnnamedColumns { positions });
    }

    let mut seen: Vec<&str> = Vec::new();
    let mut repeated: Vec<String> = Vec::new();
    for header in headers.iter().filter(|h| !h.is_empty()) {
        if seen.contains(&header.as_str()) {
            if !repeated.contains(header) {
                repeated.push(header.clone());
            }
        } else {
            seen.push(header);
        }
    }
    if !repeated.is_empty() {
        issues.push(ValidationIssue::RepeatedColumns { names: repeated });
    }

    let named = || {
        headers
            .iter()
            .enumerate()
            .filter(|(_, h)| !h.is_empty())
            .map(|(c, h)| (c as ColIndex, h))
    };

    for (col, header) in named() {
        let mut expected = None;
        let mut examples = Vec::new();
        for &row in &data_rows {
            let value = sheet.get(row, col);
            let Some(class) = ValueClass::of(value) else {
                continue;
            };
            match expected {
                None => expected = Some(class),
                Some(first) if first != class => {
                    if examples.len() < MISMATCH_EXAMPLES {
                        examples.push(value.clone());
                    }
                }
                Some(_) => {}
            }
        }
        if let (Some(expected), false) = (expected, examples.is_empty()) {
            issues.push(ValidationIssue::TypeMismatch {
                column: header.clone(),
                expected,
                examples,
            });
        }
    }

    let empty_columns: Vec<String> = named()
        .filter(|&(col, _)| data_rows.iter().all(|&row| sheet.get(row, col).is_blank()))
        .map(|(_, h)| h.clone())
        .collect();
    if !empty_columns.is_empty() {
        issues.push(ValidationIssue::EmptyColumns {
            names: empty_columns,
        });
    }

    let mut total = 0;
    let mut examples = Vec::new();
    for &row in &data_rows {
        for col in 0..sheet.col_count() {
            if !sheet.get(row, col as ColIndex).is_blank() {
                continue;
            }
            total += 1;
            if examples.len() < EMPTY_CELL_EXAMPLES {
                let label = match headers.get(col).filter(|h| !h.is_empty()) {
                    Some(header) => header.clone(),
                    None => format!("Col{}", col + 1),
                };
                examples.push(format!("{label} (row {})", row + 1));
            }
        }
    }
    if total > 0 {
        issues.push(ValidationIssue::EmptyCells { total, examples });
    }

    issues
}
