use crate::a1_notation::{CellRange, CellRef, ColIndex, RowIndex};
use crate::cell::{Cell, CellValue};
use crate::error::Result;
use crate::style::CellStyle;
use std::collections::BTreeMap;

static NULL: CellValue = CellValue::Null;

/// A sparse worksheet: styled cells keyed by zero-based `(row, col)`, plus
/// merged ranges and explicit column widths and row heights.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sheet {
    name: String,
    cells: BTreeMap<(RowIndex, ColIndex), Cell>,
    merged: Vec<CellRange>,
    col_widths: BTreeMap<ColIndex, f64>,
    row_heights: BTreeMap<RowIndex, f64>,
}

impl Sheet {
    /// Create a new empty sheet
    #[must_use]
    pub fn new() -> Self {
        Self::with_name("Sheet1")
    }

    /// Create a new empty sheet with a name
    #[must_use]
    pub fn with_name(name: &str) -> Self {
        Sheet {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Create an unstyled sheet from rows of values, starting at A1
    #[must_use]
    pub fn from_data<T: Into<CellValue> + Clone>(data: Vec<Vec<T>>) -> Self {
        let mut sheet = Sheet::new();
        for (r, row) in data.into_iter().enumerate() {
            for (c, value) in row.into_iter().enumerate() {
                let value = value.into();
                if !value.is_null() {
                    sheet.cells.insert((r as RowIndex, c as ColIndex), Cell::new(value));
                }
            }
        }
        sheet
    }

    /// Get the sheet name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set the sheet name
    pub fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    /// Number of populated (valued or styled) cells
    #[must_use]
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Top-left and bottom-right corners of the used range, if any cell is populated
    #[must_use]
    pub fn dimensions(&self) -> Option<CellRange> {
        let mut keys = self.cells.keys();
        let &(first_row, first_col) = keys.next()?;
        let (mut min_col, mut max_col, mut max_row) = (first_col, first_col, first_row);
        for &(row, col) in self.cells.keys() {
            min_col = min_col.min(col);
            max_col = max_col.max(col);
            max_row = max_row.max(row);
        }
        Some(CellRange::new(
            CellRef::new(first_row, min_col),
            CellRef::new(max_row, max_col),
        ))
    }

    /// Number of rows up to and including the last populated one
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.dimensions().map_or(0, |d| d.last.row as usize + 1)
    }

    /// Number of columns up to and including the last populated one
    #[must_use]
    pub fn col_count(&self) -> usize {
        self.dimensions().map_or(0, |d| d.last.col as usize + 1)
    }

    // ===== Cell Access =====

    /// Get a cell, if populated
    #[must_use]
    pub fn cell(&self, row: RowIndex, col: ColIndex) -> Option<&Cell> {
        self.cells.get(&(row, col))
    }

    /// Get a cell value; unpopulated cells read as `Null`
    #[must_use]
    pub fn get(&self, row: RowIndex, col: ColIndex) -> &CellValue {
        self.cells.get(&(row, col)).map_or(&NULL, |c| &c.value)
    }

    /// Get a cell value by A1 notation
    pub fn get_a1(&self, notation: &str) -> Result<&CellValue> {
        let at: CellRef = notation.parse()?;
        Ok(self.get(at.row, at.col))
    }

    /// Set a cell value, keeping whatever style the cell already has
    pub fn set<T: Into<CellValue>>(&mut self, row: RowIndex, col: ColIndex, value: T) {
        let value = value.into();
        match self.cells.get_mut(&(row, col)) {
            Some(cell) => cell.value = value,
            None if value.is_null() => {}
            None => {
                self.cells.insert((row, col), Cell::new(value));
            }
        }
    }

    /// Set a cell value by A1 notation, keeping the existing style
    pub fn set_a1<T: Into<CellValue>>(&mut self, notation: &str, value: T) -> Result<()> {
        let at: CellRef = notation.parse()?;
        self.set(at.row, at.col, value);
        Ok(())
    }

    /// Replace a cell entirely (value and style)
    pub fn set_cell(&mut self, row: RowIndex, col: ColIndex, cell: Cell) {
        self.cells.insert((row, col), cell);
    }

    /// Attach a style to a cell, creating it if needed
    pub fn set_style(&mut self, row: RowIndex, col: ColIndex, style: CellStyle) {
        self.cells.entry((row, col)).or_default().style = Some(style);
    }

    /// Mutable access to a cell's explicit style, if it has one
    pub fn style_mut(&mut self, row: RowIndex, col: ColIndex) -> Option<&mut CellStyle> {
        self.cells.get_mut(&(row, col)).and_then(|c| c.style.as_mut())
    }

    /// Iterate populated cells in row-major order
    pub fn cells(&self) -> impl Iterator<Item = (CellRef, &Cell)> {
        self.cells
            .iter()
            .map(|(&(row, col), cell)| (CellRef::new(row, col), cell))
    }

    /// Dense values of one row from column A through the last used column
    #[must_use]
    pub fn row_values(&self, row: RowIndex) -> Vec<CellValue> {
        let width = self.col_count();
        (0..width)
            .map(|c| self.get(row, c as ColIndex).clone())
            .collect()
    }

    /// Rows whose value in `col` satisfies the predicate, ascending
    pub fn rows_where<F>(&self, col: ColIndex, mut predicate: F) -> Vec<RowIndex>
    where
        F: FnMut(&CellValue) -> bool,
    {
        self.cells
            .iter()
            .filter(|((_, c), cell)| *c == col && predicate(&cell.value))
            .map(|(&(r, _), _)| r)
            .collect()
    }

    // ===== Layout =====

    /// Register a merged range
    pub fn merge(&mut self, range: CellRange) {
        if !self.merged.contains(&range) {
            self.merged.push(range);
        }
    }

    /// Merged ranges in registration order
    #[must_use]
    pub fn merged_ranges(&self) -> &[CellRange] {
        &self.merged
    }

    pub fn set_column_width(&mut self, col: ColIndex, width: f64) {
        self.col_widths.insert(col, width);
    }

    #[must_use]
    pub fn column_width(&self, col: ColIndex) -> Option<f64> {
        self.col_widths.get(&col).copied()
    }

    /// Explicit column widths keyed by column
    #[must_use]
    pub fn column_widths(&self) -> &BTreeMap<ColIndex, f64> {
        &self.col_widths
    }

    pub fn set_row_height(&mut self, row: RowIndex, height: f64) {
        self.row_heights.insert(row, height);
    }

    #[must_use]
    pub fn row_height(&self, row: RowIndex) -> Option<f64> {
        self.row_heights.get(&row).copied()
    }

    /// Explicit row heights keyed by row
    #[must_use]
    pub fn row_heights(&self) -> &BTreeMap<RowIndex, f64> {
        &self.row_heights
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_data_and_dimensions() {
        let sheet = Sheet::from_data(vec![vec!["a", "b", "c"], vec!["d", "e", "f"]]);
        assert_eq!(sheet.row_count(), 2);
        assert_eq!(sheet.col_count(), 3);
        assert_eq!(sheet.dimensions().unwrap().to_string(), "A1:C2");
    }

    #[test]
    fn test_empty_sheet() {
        let sheet = Sheet::new();
        assert!(sheet.is_empty());
        assert_eq!(sheet.row_count(), 0);
        assert!(sheet.dimensions().is_none());
        assert!(sheet.get(3, 3).is_null());
    }

    #[test]
    fn test_set_keeps_style() {
        let mut sheet = Sheet::new();
        let mut style = CellStyle::default();
        style.font.bold = true;
        sheet.set_style(4, 4, style.clone());

        sheet.set(4, 4, 95);
        let cell = sheet.cell(4, 4).unwrap();
        assert_eq!(cell.value, CellValue::Int(95));
        assert_eq!(cell.style.as_ref(), Some(&style));
    }

    #[test]
    fn test_set_null_on_empty_cell_is_noop() {
        let mut sheet = Sheet::new();
        sheet.set(0, 0, CellValue::Null);
        assert!(sheet.is_empty());
    }

    #[test]
    fn test_a1_access() {
        let mut sheet = Sheet::new();
        sheet.set_a1("E19", 90.5).unwrap();
        assert_eq!(sheet.get(18, 4), &CellValue::Float(90.5));
        assert_eq!(sheet.get_a1("E19").unwrap(), &CellValue::Float(90.5));
        assert!(sheet.set_a1("19E", 1).is_err());
    }

    #[test]
    fn test_rows_where() {
        let sheet = Sheet::from_data(vec![
            vec!["Code"],
            vec!["CS101"],
            vec!["MATH101"],
            vec!["CS101"],
        ]);
        let rows = sheet.rows_where(0, |v| v.as_text() == Some("CS101"));
        assert_eq!(rows, vec![1, 3]);
    }

    #[test]
    fn test_row_values_are_dense() {
        let mut sheet = Sheet::new();
        sheet.set(0, 0, "a");
        sheet.set(0, 2, "c");
        assert_eq!(
            sheet.row_values(0),
            vec![CellValue::from("a"), CellValue::Null, CellValue::from("c")]
        );
    }

    #[test]
    fn test_merge_deduplicates() {
        let mut sheet = Sheet::new();
        let range: CellRange = "A1:C1".parse().unwrap();
        sheet.merge(range);
        sheet.merge(range);
        assert_eq!(sheet.merged_ranges().len(), 1);
    }
}
