//! Template cloning.
//!
//! [`copy_cell`] is the per-cell style copy; [`clone_sheet`] applies it to
//! every populated cell of a template and then recreates merged ranges and
//! explicit column widths and row heights.

use crate::cell::Cell;
use crate::sheet::Sheet;
use crate::style::CellStyle;

/// Copy a source cell onto a destination cell.
///
/// The value is always copied. Font, border, fill, number format,
/// protection and alignment are copied as owned snapshots when the source
/// has an explicit style; an unstyled source leaves the destination
/// without a style.
pub fn copy_cell(src: &Cell, dst: &mut Cell) {
    dst.value = src.value.clone();
    dst.style = src.style.as_ref().map(|style| CellStyle {
        font: style.font.clone(),
        border: style.border.clone(),
        fill: style.fill.clone(),
        number_format: style.number_format.clone(),
        protection: style.protection,
        alignment: style.alignment.clone(),
    });
}

/// Copy every cell, merged range, column width and row height of
/// `template` into `dest`. Each destination address mirrors its source
/// address exactly.
pub fn clone_into(template: &Sheet, dest: &mut Sheet) {
    for (at, src) in template.cells() {
        let mut cell = Cell::default();
        copy_cell(src, &mut cell);
        dest.set_cell(at.row, at.col, cell);
    }

    for range in template.merged_ranges() {
        dest.merge(*range);
    }
    for (&col, &width) in template.column_widths() {
        dest.set_column_width(col, width);
    }
    for (&row, &height) in template.row_heights() {
        dest.set_row_height(row, height);
    }
}

/// Build a new sheet called `name` as a full copy of `template`.
#[must_use]
pub fn clone_sheet(template: &Sheet, name: &str) -> Sheet {
    let mut dest = Sheet::with_name(name);
    clone_into(template, &mut dest);
    dest
}
