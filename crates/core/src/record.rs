//! Student record loading from the raw sheet.

use crate::error::{TranscriptError, TranscriptResult};
use indexmap::IndexMap;
use transcripts_sheet::{Book, CellValue, ColIndex, RowIndex, Sheet};

/// How the raw sheet is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOptions {
    /// Stop at the first fully blank row. When false, the whole sheet is
    /// read and blank rows are skipped.
    pub stop_at_blank_row: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        LoadOptions {
            stop_at_blank_row: true,
        }
    }
}

/// One data row of the raw sheet, keyed by the header row.
///
/// Headers are trimmed; a blank header is the empty string. When two
/// columns share a header the later column's value wins.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StudentRecord {
    row: u32,
    fields: IndexMap<String, CellValue>,
}

impl StudentRecord {
    /// Build a record directly; `row` is the 1-based sheet row.
    pub fn new<I, K, V>(row: u32, fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<CellValue>,
    {
        StudentRecord {
            row,
            fields: fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// 1-based row number in the raw sheet.
    pub fn row(&self) -> u32 {
        self.row
    }

    pub fn get(&self, header: &str) -> Option<&CellValue> {
        self.fields.get(header)
    }

    /// Stringified, trimmed value of a field; `None` when absent or blank.
    pub fn text(&self, header: &str) -> Option<String> {
        self.fields
            .get(header)
            .filter(|v| !v.is_blank())
            .map(|v| v.as_str().trim().to_string())
    }

    /// Fields in column order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &CellValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Trimmed header row of a sheet, through the last used column.
pub fn headers(sheet: &Sheet) -> Vec<String> {
    sheet
        .row_values(0)
        .iter()
        .map(|v| {
            if v.is_null() {
                String::new()
            } else {
                v.as_str().trim().to_string()
            }
        })
        .collect()
}

/// Read every record from a raw sheet.
pub fn read_records(sheet: &Sheet, options: LoadOptions) -> Vec<StudentRecord> {
    let headers = headers(sheet);
    let mut records = Vec::new();

    for r in 1..sheet.row_count() {
        let row = r as RowIndex;
        let values: Vec<&CellValue> = (0..headers.len())
            .map(|c| sheet.get(row, c as ColIndex))
            .collect();

        if values.iter().all(|v| v.is_blank()) {
            if options.stop_at_blank_row {
                tracing::debug!(row = row + 1, "blank row ends the raw data");
                break;
            }
            continue;
        }

        let fields = headers
            .iter()
            .zip(values)
            .map(|(h, v)| (h.clone(), v.clone()))
            .collect();
        records.push(StudentRecord {
            row: row + 1,
            fields,
        });
    }

    records
}

/// Load records from the named raw sheet of a workbook.
pub fn load_records(
    book: &Book,
    raw_sheet: &str,
    options: LoadOptions,
) -> TranscriptResult<Vec<StudentRecord>> {
    let sheet = book
        .get_sheet(raw_sheet)
        .map_err(|_| TranscriptError::MissingSheet(raw_sheet.to_string()))?;
    let records = read_records(sheet, options);
    tracing::debug!(sheet = raw_sheet, records = records.len(), "loaded student records");
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw() -> Sheet {
        Sheet::from_data(vec![
            vec![
                CellValue::from(" Student No "),
                CellValue::from("Intake"),
                CellValue::from("CS101 Grade"),
            ],
            vec![CellValue::from("001"), CellValue::from("BM01"), CellValue::Int(88)],
            vec![CellValue::Float(2.0), CellValue::from("BA01"), CellValue::Null],
            vec![CellValue::Null, CellValue::from("  "), CellValue::Null],
            vec![CellValue::from("003"), CellValue::from("BM01"), CellValue::Int(70)],
        ])
    }

    #[test]
    fn test_records_keyed_by_trimmed_headers() {
        let records = read_records(&raw(), LoadOptions::default());
        assert_eq!(records.len(), 2);

        let first = &records[0];
        assert_eq!(first.row(), 2);
        assert_eq!(first.text("Student No").as_deref(), Some("001"));
        assert_eq!(first.get("CS101 Grade"), Some(&CellValue::Int(88)));
        let keys: Vec<&str> = first.fields().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["Student No", "Intake", "CS101 Grade"]);

        // Numbers stay numbers; text() stringifies them
        assert_eq!(records[1].get("Student No"), Some(&CellValue::Float(2.0)));
        assert_eq!(records[1].text("Student No").as_deref(), Some("2"));
        assert!(records[1].text("CS101 Grade").is_none());
    }

    #[test]
    fn test_read_to_end_skips_blank_rows() {
        let records = read_records(
            &raw(),
            LoadOptions {
                stop_at_blank_row: false,
            },
        );
        assert_eq!(records.len(), 3);
        assert_eq!(records[2].row(), 5);
        assert_eq!(records[2].text("Student No").as_deref(), Some("003"));
    }

    #[test]
    fn test_blank_and_duplicate_headers() {
        let sheet = Sheet::from_data(vec![
            vec![CellValue::from("Grade"), CellValue::Null, CellValue::from("Grade")],
            vec![CellValue::Int(1), CellValue::Int(2), CellValue::Int(3)],
        ]);
        assert_eq!(headers(&sheet), vec!["Grade", "", "Grade"]);

        let records = read_records(&sheet, LoadOptions::default());
        assert_eq!(records[0].len(), 2);
        assert_eq!(records[0].get("Grade"), Some(&CellValue::Int(3)));
        assert_eq!(records[0].get(""), Some(&CellValue::Int(2)));
    }

    #[test]
    fn test_missing_raw_sheet() {
        let book = Book::new();
        let result = load_records(&book, "Raw", LoadOptions::default());
        assert!(matches!(result, Err(TranscriptError::MissingSheet(name)) if name == "Raw"));
    }

    #[test]
    fn test_header_only_sheet() {
        let sheet = Sheet::from_data(vec![vec!["Student No", "Intake"]]);
        assert!(read_records(&sheet, LoadOptions::default()).is_empty());
    }
}
