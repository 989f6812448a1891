use crate::error::{Result, SheetError};
use std::fmt;
use std::str::FromStr;

/// Zero-based row index, matching the xlsx writer's row type.
pub type RowIndex = u32;
/// Zero-based column index, matching the xlsx writer's column type.
pub type ColIndex = u16;

/// Excel's grid limits.
pub const MAX_ROWS: u32 = 1_048_576;
pub const MAX_COLS: u16 = 16_384;

/// A zero-based cell address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellRef {
    pub row: RowIndex,
    pub col: ColIndex,
}

impl CellRef {
    #[must_use]
    pub fn new(row: RowIndex, col: ColIndex) -> Self {
        CellRef { row, col }
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", to_a1_notation(self.row, self.col))
    }
}

impl FromStr for CellRef {
    type Err = SheetError;

    fn from_str(s: &str) -> Result<Self> {
        let (row, col) = parse_a1(s)?;
        Ok(CellRef { row, col })
    }
}

/// An inclusive rectangular range, always normalized so `first <= last`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellRange {
    pub first: CellRef,
    pub last: CellRef,
}

impl CellRange {
    #[must_use]
    pub fn new(a: CellRef, b: CellRef) -> Self {
        CellRange {
            first: CellRef::new(a.row.min(b.row), a.col.min(b.col)),
            last: CellRef::new(a.row.max(b.row), a.col.max(b.col)),
        }
    }

    /// A range covering one cell only.
    #[must_use]
    pub fn is_single_cell(&self) -> bool {
        self.first == self.last
    }

    #[must_use]
    pub fn contains(&self, cell: CellRef) -> bool {
        (self.first.row..=self.last.row).contains(&cell.row)
            && (self.first.col..=self.last.col).contains(&cell.col)
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_single_cell() {
            write!(f, "{}", self.first)
        } else {
            write!(f, "{}:{}", self.first, self.last)
        }
    }
}

impl FromStr for CellRange {
    type Err = SheetError;

    fn from_str(s: &str) -> Result<Self> {
        let ((sr, sc), (er, ec)) = parse_a1_range(s)?;
        Ok(CellRange::new(CellRef::new(sr, sc), CellRef::new(er, ec)))
    }
}

/// Parse A1-style cell notation (e.g., "A1", "Z99", "AA1")
/// Returns (row, column) as 0-based indices
pub fn parse_a1(notation: &str) -> Result<(RowIndex, ColIndex)> {
    // Absolute markers ($A$1) are accepted and ignored
    let notation = notation.trim().replace('$', "").to_uppercase();
    if notation.is_empty() {
        return Err(SheetError::InvalidCellNotation(notation));
    }

    let Some(split_pos) = notation.bytes().position(|b| b.is_ascii_digit()) else {
        return Err(SheetError::InvalidCellNotation(notation));
    };
    if split_pos == 0 {
        return Err(SheetError::InvalidCellNotation(notation));
    }

    let col = parse_column_letters(&notation[..split_pos])?;
    let row = notation[split_pos..]
        .parse::<u32>()
        .map_err(|_| SheetError::InvalidCellNotation(notation.clone()))?;

    if row == 0 || row > MAX_ROWS {
        return Err(SheetError::InvalidCellNotation(notation));
    }

    Ok((row - 1, col))
}

/// Parse A1-style range notation (e.g., "A1:C3")
/// Returns ((start_row, start_col), (end_row, end_col)) as 0-based indices
pub fn parse_a1_range(
    notation: &str,
) -> Result<((RowIndex, ColIndex), (RowIndex, ColIndex))> {
    let parts: Vec<&str> = notation.split(':').collect();

    if parts.len() != 2 {
        // If no colon, treat as single cell
        let cell = parse_a1(notation)?;
        return Ok((cell, cell));
    }

    let (start_row, start_col) = parse_a1(parts[0])?;
    let (end_row, end_col) = parse_a1(parts[1])?;

    Ok((
        (start_row.min(end_row), start_col.min(end_col)),
        (start_row.max(end_row), start_col.max(end_col)),
    ))
}

/// Convert column letters to 0-based column index
/// A=0, B=1, ... Z=25, AA=26, AB=27, ...
fn parse_column_letters(col_str: &str) -> Result<ColIndex> {
    let mut col: u32 = 0;

    for b in col_str.bytes() {
        if !b.is_ascii_uppercase() {
            return Err(SheetError::InvalidCellNotation(col_str.to_string()));
        }
        col = col * 26 + u32::from(b - b'A') + 1;
        if col > u32::from(MAX_COLS) {
            return Err(SheetError::InvalidCellNotation(col_str.to_string()));
        }
    }

    // Convert to 0-based
    ColIndex::try_from(col - 1).map_err(|_| SheetError::InvalidCellNotation(col_str.to_string()))
}

/// Convert 0-based column index to column letters
/// 0=A, 1=B, ... 25=Z, 26=AA, 27=AB, ...
pub fn column_index_to_letters(col: ColIndex) -> String {
    let mut result = String::new();
    let mut col = u32::from(col) + 1;

    while col > 0 {
        col -= 1;
        result.insert(0, ((col % 26) as u8 + b'A') as char);
        col /= 26;
    }

    result
}

/// Convert (row, col) to A1 notation
/// (0, 0) = "A1", (0, 1) = "B1", etc.
pub fn to_a1_notation(row: RowIndex, col: ColIndex) -> String {
    format!("{}{}", column_index_to_letters(col), u64::from(row) + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_a1() {
        assert_eq!(parse_a1("A1").unwrap(), (0, 0));
        assert_eq!(parse_a1("B1").unwrap(), (0, 1));
        assert_eq!(parse_a1("A2").unwrap(), (1, 0));
        assert_eq!(parse_a1("E19").unwrap(), (18, 4));
        assert_eq!(parse_a1("F11").unwrap(), (10, 5));
        assert_eq!(parse_a1("AA1").unwrap(), (0, 26));
        assert_eq!(parse_a1("ZZ1").unwrap(), (0, 701));
        assert_eq!(parse_a1("$B$3").unwrap(), (2, 1));

        // Test case insensitive
        assert_eq!(parse_a1("a1").unwrap(), (0, 0));
    }

    #[test]
    fn test_parse_a1_errors() {
        assert!(parse_a1("").is_err());
        assert!(parse_a1("A").is_err());
        assert!(parse_a1("1").is_err());
        assert!(parse_a1("A0").is_err()); // Row must be >= 1
        assert!(parse_a1("ABC").is_err());
        assert!(parse_a1("XFE1").is_err()); // Past the last column
        assert!(parse_a1("A1048577").is_err());
    }

    #[test]
    fn test_parse_a1_range() {
        let range: CellRange = "C3:A1".parse().unwrap();
        assert_eq!(range.first, CellRef::new(0, 0));
        assert_eq!(range.last, CellRef::new(2, 2));
        assert_eq!(range.to_string(), "A1:C3");

        // Single cell (no colon)
        let single: CellRange = "B2".parse().unwrap();
        assert!(single.is_single_cell());
        assert_eq!(single.to_string(), "B2");
    }

    #[test]
    fn test_range_contains() {
        let range: CellRange = "B2:D4".parse().unwrap();
        assert!(range.contains(CellRef::new(1, 1)));
        assert!(range.contains(CellRef::new(3, 3)));
        assert!(!range.contains(CellRef::new(0, 1)));
        assert!(!range.contains(CellRef::new(2, 4)));
    }

    #[test]
    fn test_column_index_to_letters() {
        assert_eq!(column_index_to_letters(0), "A");
        assert_eq!(column_index_to_letters(25), "Z");
        assert_eq!(column_index_to_letters(26), "AA");
        assert_eq!(column_index_to_letters(701), "ZZ");
        assert_eq!(column_index_to_letters(702), "AAA");
        assert_eq!(column_index_to_letters(MAX_COLS - 1), "XFD");
    }

    #[test]
    fn test_to_a1_notation() {
        assert_eq!(to_a1_notation(0, 0), "A1");
        assert_eq!(to_a1_notation(99, 25), "Z100");
        assert_eq!(CellRef::new(18, 5).to_string(), "F19");
    }
}
