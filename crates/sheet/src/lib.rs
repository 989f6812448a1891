//! Workbook model for transcript generation
//!
//! Provides an in-memory, styled view of xlsx workbooks: sparse sheets whose
//! cells carry both a value and an optional owned style, plus merged ranges,
//! column widths and row heights. Workbooks are read with their formatting
//! intact and written back with the same formatting.
//!
//! # Examples
//!
//! ## Building a sheet from data
//!
//! ```
//! use transcripts_sheet::{Sheet, CellValue};
//!
//! let sheet = Sheet::from_data(vec![
//!     vec!["Student No", "Intake"],
//!     vec!["1001", "BM01"],
//! ]);
//!
//! assert_eq!(sheet.row_count(), 2);
//! assert_eq!(sheet.get(1, 1), &CellValue::from("BM01"));
//! ```
//!
//! ## Cloning a template
//!
//! ```
//! use transcripts_sheet::{clone_sheet, Cell, CellStyle, Sheet};
//!
//! let mut template = Sheet::with_name("BM01");
//! let mut bold = CellStyle::default();
//! bold.font.bold = true;
//! template.set_cell(0, 0, Cell::styled("Transcript", bold));
//! template.merge("A1:F1".parse().unwrap());
//!
//! let copy = clone_sheet(&template, "1001");
//! assert_eq!(copy.name(), "1001");
//! assert_eq!(copy.cell(0, 0), template.cell(0, 0));
//! assert_eq!(copy.merged_ranges(), template.merged_ranges());
//! ```
//!
//! ## Working with books
//!
//! ```no_run
//! use transcripts_sheet::Book;
//!
//! let book = Book::from_xlsx("students.xlsx").unwrap();
//! for name in book.sheet_names() {
//!     println!("{name}");
//! }
//! book.save_as_xlsx("copy.xlsx").unwrap();
//! ```

mod a1_notation;
mod book;
mod cell;
mod clone;
mod error;
mod ooxml;
mod sheet;
mod style;
mod xlsx;

/// Re-export cell addressing helpers.
pub use a1_notation::{
    column_index_to_letters, parse_a1, parse_a1_range, to_a1_notation, CellRange, CellRef,
    ColIndex, RowIndex,
};
/// Re-export book type.
pub use book::Book;
/// Re-export cell types.
pub use cell::{Cell, CellValue};
/// Re-export template cloning.
pub use clone::{clone_into, clone_sheet, copy_cell};
/// Re-export sheet error types.
pub use error::{Result, SheetError};
/// Re-export sheet type.
pub use sheet::Sheet;
/// Re-export style records.
pub use style::{
    Alignment, Border, BorderSide, CellStyle, Fill, Font, NumberFormat, Protection, StyleColor,
};
/// Re-export the style-to-writer-format mapping.
pub use xlsx::style_to_format;
