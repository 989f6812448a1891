//! Per-course value placement and average computation.

use crate::config::RunConfig;
use crate::error::{TranscriptError, TranscriptResult};
use crate::record::StudentRecord;
use serde::Serialize;
use std::fmt;
use transcripts_sheet::{CellRef, CellValue, ColIndex, Sheet};

/// The metric a composite course header carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CourseField {
    Attendance,
    Grade,
}

/// Split a composite header such as `"MATH101 Attendance"` at its last
/// space into the course code and field. The field is matched
/// case-insensitively; headers without a space or with another trailing
/// word are not course columns.
pub fn parse_course_header(header: &str) -> Option<(&str, CourseField)> {
    let (code, field) = header.rsplit_once(' ')?;
    let field = match field.to_lowercase().as_str() {
        "attendance" => CourseField::Attendance,
        "grade" => CourseField::Grade,
        _ => return None,
    };
    Some((code, field))
}

/// Numeric reading of a raw value: numbers, or text that parses as one.
pub fn numeric_value(value: &CellValue) -> Option<f64> {
    match value {
        CellValue::Int(i) => Some(*i as f64),
        CellValue::Float(f) => Some(*f),
        CellValue::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        CellValue::Null | CellValue::Bool(_) | CellValue::DateTime(_) => None,
    }
}

/// Round half away from zero to two decimals.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Average attendance and grade of one student.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Averages {
    pub attendance: Option<f64>,
    pub grade: Option<f64>,
}

impl fmt::Display for Averages {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |v: Option<f64>| v.map_or_else(|| "-".to_string(), |v| format!("{v:.2}"));
        write!(
            f,
            "attendance {}, grade {}",
            show(self.attendance),
            show(self.grade)
        )
    }
}

/// A course value that could not be read as a number. The value is still
/// placed on the sheet but takes no part in the averages.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldIssue {
    pub header: String,
    pub value: CellValue,
}

impl fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "non-numeric value '{}' in {}", self.value, self.header)
    }
}

/// Result of aggregating one record into its sheet.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Aggregation {
    pub averages: Averages,
    pub issues: Vec<FieldIssue>,
}

#[derive(Debug, Default)]
struct Mean {
    sum: f64,
    count: usize,
}

impl Mean {
    fn push(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    fn value(&self) -> Option<f64> {
        (self.count > 0).then(|| round2(self.sum / self.count as f64))
    }
}

/// Place a record's course values on its cloned sheet and write the
/// averages to the intake's aggregate cells.
///
/// Every row whose course-code cell holds exactly the course code receives
/// the raw value; the cell keeps its template style. Numeric values count
/// toward the averages whether or not a row matched.
pub fn aggregate(
    record: &StudentRecord,
    sheet: &mut Sheet,
    intake: &str,
    config: &RunConfig,
) -> TranscriptResult<Aggregation> {
    let mut attendance = Mean::default();
    let mut grade = Mean::default();
    let mut issues = Vec::new();

    for (header, value) in record.fields() {
        let Some((code, field)) = parse_course_header(header) else {
            continue;
        };

        match numeric_value(value) {
            Some(n) => match field {
                CourseField::Attendance => attendance.push(n),
                CourseField::Grade => grade.push(n),
            },
            None if !value.is_blank() => {
                let issue = FieldIssue {
                    header: header.to_string(),
                    value: value.clone(),
                };
                tracing::warn!(sheet = sheet.name(), "{issue}");
                issues.push(issue);
            }
            None => {}
        }

        let col: ColIndex = match field {
            CourseField::Attendance => config.attendance_col(),
            CourseField::Grade => config.grade_col(),
        };
        let rows = sheet.rows_where(config.course_code_col(), |v| v.as_text() == Some(code));
        if rows.is_empty() {
            tracing::debug!(sheet = sheet.name(), course = code, "no row for course");
        }
        for row in rows {
            tracing::debug!(
                sheet = sheet.name(),
                cell = %CellRef::new(row, col),
                "{header} = {value}"
            );
            sheet.set(row, col, value.clone());
        }
    }

    let averages = Averages {
        attendance: attendance.value(),
        grade: grade.value(),
    };

    if let Some(cells) = config.aggregate_cells_for(intake) {
        for (address, average) in [
            (&cells.attendance, averages.attendance),
            (&cells.grade, averages.grade),
        ] {
            let at: CellRef = address
                .parse()
                .map_err(|e| TranscriptError::config(format!("aggregate cell {address}: {e}")))?;
            sheet.set(at.row, at.col, CellValue::from(average));
        }
    } else {
        tracing::debug!(intake, "no aggregate cells for intake");
    }

    Ok(Aggregation { averages, issues })
}

#[cfg(test)]
mod tests {
    use super::*;
    use transcripts_sheet::{Cell, CellStyle};

    fn template() -> Sheet {
        let mut sheet = Sheet::with_name("001");
        sheet.set(4, 0, "CS101");
        sheet.set(5, 0, "MATH101");
        sheet.set(8, 0, "CS101");
        let mut boxed = CellStyle::default();
        boxed.border.bottom.style = Some("thin".to_string());
        sheet.set_cell(4, 4, Cell::styled(CellValue::Null, boxed));
        sheet
    }

    fn record(fields: Vec<(&str, CellValue)>) -> StudentRecord {
        StudentRecord::new(2, fields)
    }

    #[test]
    fn test_parse_course_header() {
        assert_eq!(
            parse_course_header("MATH101 Attendance"),
            Some(("MATH101", CourseField::Attendance))
        );
        assert_eq!(
            parse_course_header("CS101 GRADE"),
            Some(("CS101", CourseField::Grade))
        );
        assert_eq!(
            parse_course_header("Intro CS Grade"),
            Some(("Intro CS", CourseField::Grade))
        );
        assert_eq!(parse_course_header("Grade"), None);
        assert_eq!(parse_course_header("First Name"), None);
        assert_eq!(parse_course_header("CS101 Grades"), None);
    }

    #[test]
    fn test_numeric_value() {
        assert_eq!(numeric_value(&CellValue::Int(95)), Some(95.0));
        assert_eq!(numeric_value(&CellValue::Float(88.5)), Some(88.5));
        assert_eq!(numeric_value(&CellValue::from(" 72 ")), Some(72.0));
        assert_eq!(numeric_value(&CellValue::from("A+")), None);
        assert_eq!(numeric_value(&CellValue::from("NaN")), None);
        assert_eq!(numeric_value(&CellValue::Bool(true)), None);
        assert_eq!(numeric_value(&CellValue::Null), None);
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(90.0), 90.0);
        assert_eq!(round2(86.666_666), 86.67);
        assert_eq!(round2(0.125), 0.13);
    }

    #[test]
    fn test_values_placed_on_every_matching_row() {
        let config = RunConfig::default();
        let mut sheet = template();
        let rec = record(vec![
            ("CS101 Attendance", CellValue::Int(95)),
            ("CS101 Grade", CellValue::Int(88)),
        ]);

        aggregate(&rec, &mut sheet, "BM01", &config).unwrap();

        assert_eq!(sheet.get_a1("E5").unwrap(), &CellValue::Int(95));
        assert_eq!(sheet.get_a1("F5").unwrap(), &CellValue::Int(88));
        assert_eq!(sheet.get_a1("E9").unwrap(), &CellValue::Int(95));
        assert_eq!(sheet.get_a1("F9").unwrap(), &CellValue::Int(88));
        assert!(sheet.get_a1("E6").unwrap().is_null());
        // Template style on the destination survives
        assert!(sheet.cell(4, 4).unwrap().has_style());
    }

    #[test]
    fn test_averages_and_bm_placement() {
        let config = RunConfig::default();
        let mut sheet = template();
        let rec = record(vec![
            ("CS101 Grade", CellValue::Int(80)),
            ("MATH101 Grade", CellValue::Int(90)),
            ("PHYS101 Grade", CellValue::Int(100)),
            ("CS101 Attendance", CellValue::from("75")),
        ]);

        let result = aggregate(&rec, &mut sheet, "BM2025A", &config).unwrap();
        assert_eq!(result.averages.grade, Some(90.0));
        assert_eq!(result.averages.attendance, Some(75.0));
        assert!(result.issues.is_empty());

        assert_eq!(sheet.get_a1("E19").unwrap(), &CellValue::Float(75.0));
        assert_eq!(sheet.get_a1("F19").unwrap(), &CellValue::Float(90.0));
        // Unmatched course counts toward the average but is not written
        assert!(sheet.rows_where(0, |v| v.as_text() == Some("PHYS101")).is_empty());
    }

    #[test]
    fn test_ba_placement() {
        let config = RunConfig::default();
        let mut sheet = template();
        let rec = record(vec![("CS101 Grade", CellValue::Int(70))]);

        let result = aggregate(&rec, &mut sheet, "BA2024", &config).unwrap();
        assert_eq!(sheet.get_a1("F11").unwrap(), &CellValue::Float(70.0));
        assert!(sheet.get_a1("E11").unwrap().is_null());
        assert!(sheet.get_a1("F19").unwrap().is_null());
        assert_eq!(result.averages.attendance, None);
    }

    #[test]
    fn test_unknown_prefix_gets_no_aggregate_write() {
        let config = RunConfig::default();
        let mut sheet = template();
        let before = sheet.cell_count();
        let rec = record(vec![("CS101 Grade", CellValue::Int(70))]);

        let result = aggregate(&rec, &mut sheet, "XY2025", &config).unwrap();
        assert_eq!(result.averages.grade, Some(70.0));
        assert!(sheet.get_a1("F19").unwrap().is_null());
        assert!(sheet.get_a1("F11").unwrap().is_null());
        // Only the course cells were added
        assert_eq!(sheet.cell_count(), before + 2);
    }

    #[test]
    fn test_non_numeric_value_is_reported_and_written() {
        let config = RunConfig::default();
        let mut sheet = template();
        let rec = record(vec![
            ("CS101 Grade", CellValue::from("Exempt")),
            ("MATH101 Grade", CellValue::Null),
        ]);

        let result = aggregate(&rec, &mut sheet, "BM01", &config).unwrap();
        assert_eq!(result.issues.len(), 1);
        assert_eq!(result.issues[0].header, "CS101 Grade");
        assert_eq!(
            result.issues[0].to_string(),
            "non-numeric value 'Exempt' in CS101 Grade"
        );
        assert_eq!(sheet.get_a1("F5").unwrap().as_text(), Some("Exempt"));
        assert_eq!(result.averages, Averages::default());
    }

    #[test]
    fn test_no_values_means_no_average() {
        let config = RunConfig::default();
        let mut sheet = template();
        let rec = record(vec![("First Name", CellValue::from("Jo"))]);

        let result = aggregate(&rec, &mut sheet, "BM01", &config).unwrap();
        assert_eq!(result.averages.attendance, None);
        assert_eq!(result.averages.grade, None);
        assert!(sheet.get_a1("E19").unwrap().is_null());
    }

    #[test]
    fn test_averages_display() {
        let averages = Averages {
            attendance: Some(90.0),
            grade: None,
        };
        assert_eq!(averages.to_string(), "attendance 90.00, grade -");
    }
}
