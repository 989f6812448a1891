use crate::a1_notation::{ColIndex, RowIndex};
use crate::book::Book;
use crate::cell::{Cell, CellValue};
use crate::error::Result;
use crate::ooxml::Package;
use crate::sheet::Sheet;
use crate::style::{BorderSide, CellStyle, StyleColor};
use calamine::{Data, Reader, Xlsx};
use rust_xlsxwriter::{
    Color, Format, FormatAlign, FormatBorder, FormatPattern, FormatUnderline, Workbook, Worksheet,
};
use std::io::Cursor;
use std::path::Path;

/// Character-width padding Excel adds to stored column widths (5px at 7px per digit).
const COLUMN_PADDING: f64 = 5.0 / 7.0;

/// Convert calamine Data to CellValue
fn data_to_cell_value(data: &Data) -> CellValue {
    match data {
        Data::Empty => CellValue::Null,
        Data::Bool(b) => CellValue::Bool(*b),
        Data::Int(i) => CellValue::Int(*i),
        Data::Float(f) => CellValue::Float(*f),
        Data::String(s) => CellValue::String(s.clone()),
        // Excel serial date: days since 1899-12-30
        Data::DateTime(dt) => CellValue::DateTime(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::String(s.clone()),
        Data::Error(e) => CellValue::String(format!("#ERROR: {e:?}")),
    }
}

impl Book {
    /// Load every sheet of an xlsx workbook with values, cell styles,
    /// merged ranges, column widths and row heights.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or is not a valid xlsx package.
    pub fn from_xlsx<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let mut book = Self::from_xlsx_bytes(&bytes)?;
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            book.set_name(stem);
        }
        Ok(book)
    }

    /// Load a workbook from in-memory xlsx bytes.
    ///
    /// # Errors
    ///
    /// Returns error if the bytes are not a valid xlsx package.
    pub fn from_xlsx_bytes(bytes: &[u8]) -> Result<Self> {
        let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes))?;
        let mut package = Package::open(Cursor::new(bytes))?;
        let stylesheet = package.stylesheet()?;

        let sheet_names = workbook.sheet_names();
        let mut book = Book::new();

        for sheet_name in sheet_names {
            let mut sheet = Sheet::with_name(&sheet_name);

            let layout = package.sheet_layout(&sheet_name)?;
            for (&(row, col), &xf) in &layout.cell_styles {
                if let Some(style) = stylesheet.style(xf) {
                    sheet.set_style(row, col, style.clone());
                }
            }
            for range in layout.merged {
                sheet.merge(range);
            }
            for (col, width) in layout.col_widths {
                sheet.set_column_width(col, width);
            }
            for (row, height) in layout.row_heights {
                sheet.set_row_height(row, height);
            }

            let range = workbook.worksheet_range(&sheet_name)?;
            let (row_offset, col_offset) = range.start().unwrap_or((0, 0));
            for (r, c, data) in range.used_cells() {
                let row = row_offset + r as RowIndex;
                let col = (col_offset as usize + c) as ColIndex;
                sheet.set(row, col, data_to_cell_value(data));
            }

            book.add_sheet(&sheet_name, sheet)?;
        }

        Ok(book)
    }

    /// Save the book to an xlsx file, one worksheet per sheet in order.
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be created or written.
    pub fn save_as_xlsx<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut workbook = Workbook::new();

        for (name, sheet) in self.sheets() {
            let worksheet = workbook.add_worksheet();
            worksheet.set_name(name)?;
            write_sheet(sheet, worksheet)?;
        }

        workbook.save(path.as_ref())?;
        Ok(())
    }
}

fn write_sheet(sheet: &Sheet, worksheet: &mut Worksheet) -> Result<()> {
    for (&col, &width) in sheet.column_widths() {
        worksheet.set_column_width(col, display_width(width))?;
    }
    for (&row, &height) in sheet.row_heights() {
        worksheet.set_row_height(row, height)?;
    }

    // Merges go first so the individual cell writes below win
    let blank = Format::new();
    for range in sheet.merged_ranges() {
        if range.is_single_cell() {
            continue;
        }
        worksheet.merge_range(
            range.first.row,
            range.first.col,
            range.last.row,
            range.last.col,
            "",
            &blank,
        )?;
    }

    for (at, cell) in sheet.cells() {
        write_cell(worksheet, at.row, at.col, cell)?;
    }

    Ok(())
}

fn write_cell(worksheet: &mut Worksheet, row: RowIndex, col: ColIndex, cell: &Cell) -> Result<()> {
    let format = cell.style.as_ref().map(style_to_format);

    match (&cell.value, format.as_ref()) {
        (CellValue::Null, Some(format)) => {
            worksheet.write_blank(row, col, format)?;
        }
        (CellValue::Null, None) => {}
        (CellValue::Bool(b), Some(format)) => {
            worksheet.write_boolean_with_format(row, col, *b, format)?;
        }
        (CellValue::Bool(b), None) => {
            worksheet.write_boolean(row, col, *b)?;
        }
        (CellValue::String(s), Some(format)) => {
            worksheet.write_string_with_format(row, col, s, format)?;
        }
        (CellValue::String(s), None) => {
            worksheet.write_string(row, col, s)?;
        }
        // Note: Excel stores all numbers as f64, so integers > 2^53 may lose precision
        (CellValue::Int(i), format) => write_number(worksheet, row, col, *i as f64, format)?,
        (CellValue::Float(f) | CellValue::DateTime(f), format) => {
            write_number(worksheet, row, col, *f, format)?;
        }
    }

    Ok(())
}

fn write_number(
    worksheet: &mut Worksheet,
    row: RowIndex,
    col: ColIndex,
    number: f64,
    format: Option<&Format>,
) -> Result<()> {
    match format {
        Some(format) => worksheet.write_number_with_format(row, col, number, format)?,
        None => worksheet.write_number(row, col, number)?,
    };
    Ok(())
}

/// Stored `<col width>` values include padding; the writer expects the
/// width Excel displays and adds the padding back.
fn display_width(stored: f64) -> f64 {
    if stored >= 1.0 + COLUMN_PADDING {
        stored - COLUMN_PADDING
    } else {
        stored * 7.0 / 12.0
    }
}

// ===== Style to Format =====

/// Legacy indexed palette, slots 0-63.
const INDEXED_PALETTE: [u32; 64] = [
    0x000000, 0xFFFFFF, 0xFF0000, 0x00FF00, 0x0000FF, 0xFFFF00, 0xFF00FF, 0x00FFFF, // 0-7
    0x000000, 0xFFFFFF, 0xFF0000, 0x00FF00, 0x0000FF, 0xFFFF00, 0xFF00FF, 0x00FFFF, // 8-15
    0x800000, 0x008000, 0x000080, 0x808000, 0x800080, 0x008080, 0xC0C0C0, 0x808080, // 16-23
    0x9999FF, 0x993366, 0xFFFFCC, 0xCCFFFF, 0x660066, 0xFF8080, 0x0066CC, 0xCCCCFF, // 24-31
    0x000080, 0xFF00FF, 0xFFFF00, 0x00FFFF, 0x800080, 0x800000, 0x008080, 0x0000FF, // 32-39
    0x00CCFF, 0xCCFFFF, 0xCCFFCC, 0xFFFF99, 0x99CCFF, 0xFF99CC, 0xCC99FF, 0xFFCC99, // 40-47
    0x3366FF, 0x33CCCC, 0x99CC00, 0xFFCC00, 0xFF9900, 0xFF6600, 0x666699, 0x969696, // 48-55
    0x003366, 0x339966, 0x003300, 0x333300, 0x993300, 0x993366, 0x333399, 0x333333, // 56-63
];

fn map_color(color: StyleColor) -> Color {
    match color {
        StyleColor::Rgb(rgb) => Color::RGB(rgb),
        StyleColor::Theme(slot) => Color::Theme(slot.min(9), 0),
        StyleColor::Indexed(slot) => INDEXED_PALETTE
            .get(usize::from(slot))
            .map_or(Color::Automatic, |&rgb| Color::RGB(rgb)),
        StyleColor::Automatic => Color::Automatic,
    }
}

fn map_h_align(s: &str) -> Option<FormatAlign> {
    match s {
        "left" => Some(FormatAlign::Left),
        "center" => Some(FormatAlign::Center),
        "right" => Some(FormatAlign::Right),
        "fill" => Some(FormatAlign::Fill),
        "justify" => Some(FormatAlign::Justify),
        "centerContinuous" => Some(FormatAlign::CenterAcross),
        "distributed" => Some(FormatAlign::Distributed),
        _ => None,
    }
}

fn map_v_align(s: &str) -> Option<FormatAlign> {
    match s {
        "top" => Some(FormatAlign::Top),
        "center" => Some(FormatAlign::VerticalCenter),
        "justify" => Some(FormatAlign::VerticalJustify),
        "distributed" => Some(FormatAlign::VerticalDistributed),
        // Bottom is the default
        _ => None,
    }
}

fn map_border_style(s: &str) -> FormatBorder {
    match s {
        "thin" => FormatBorder::Thin,
        "medium" => FormatBorder::Medium,
        "thick" => FormatBorder::Thick,
        "double" => FormatBorder::Double,
        "dashed" => FormatBorder::Dashed,
        "dotted" => FormatBorder::Dotted,
        "hair" => FormatBorder::Hair,
        "mediumDashed" => FormatBorder::MediumDashed,
        "dashDot" => FormatBorder::DashDot,
        "mediumDashDot" => FormatBorder::MediumDashDot,
        "dashDotDot" => FormatBorder::DashDotDot,
        "mediumDashDotDot" => FormatBorder::MediumDashDotDot,
        "slantDashDot" => FormatBorder::SlantDashDot,
        _ => FormatBorder::None,
    }
}

fn map_underline(s: &str) -> FormatUnderline {
    match s {
        "double" => FormatUnderline::Double,
        "singleAccounting" => FormatUnderline::SingleAccounting,
        "doubleAccounting" => FormatUnderline::DoubleAccounting,
        _ => FormatUnderline::Single,
    }
}

fn map_pattern(s: &str) -> Option<FormatPattern> {
    let pattern = match s {
        "solid" => FormatPattern::Solid,
        "mediumGray" => FormatPattern::MediumGray,
        "darkGray" => FormatPattern::DarkGray,
        "lightGray" => FormatPattern::LightGray,
        "darkHorizontal" => FormatPattern::DarkHorizontal,
        "darkVertical" => FormatPattern::DarkVertical,
        "darkDown" => FormatPattern::DarkDown,
        "darkUp" => FormatPattern::DarkUp,
        "darkGrid" => FormatPattern::DarkGrid,
        "darkTrellis" => FormatPattern::DarkTrellis,
        "lightHorizontal" => FormatPattern::LightHorizontal,
        "lightVertical" => FormatPattern::LightVertical,
        "lightDown" => FormatPattern::LightDown,
        "lightUp" => FormatPattern::LightUp,
        "lightGrid" => FormatPattern::LightGrid,
        "lightTrellis" => FormatPattern::LightTrellis,
        "gray125" => FormatPattern::Gray125,
        "gray0625" => FormatPattern::Gray0625,
        _ => return None,
    };
    Some(pattern)
}

/// Stored rotation is 0-90 counterclockwise, 91-180 clockwise, 255 stacked.
fn map_rotation(stored: i16) -> i16 {
    match stored {
        91..=180 => 90 - stored,
        255 => 270,
        other => other,
    }
}

fn apply_border(
    format: Format,
    side: &BorderSide,
    set_style: fn(Format, FormatBorder) -> Format,
    set_color: fn(Format, Color) -> Format,
) -> Format {
    let Some(style) = side.style.as_deref().filter(|_| side.is_set()) else {
        return format;
    };
    let format = set_style(format, map_border_style(style));
    match side.color {
        Some(color) => set_color(format, map_color(color)),
        None => format,
    }
}

/// Build the writer format equivalent to a cell style.
#[must_use]
pub fn style_to_format(style: &CellStyle) -> Format {
    let mut f = Format::new();

    let font = &style.font;
    if let Some(name) = &font.name {
        f = f.set_font_name(name);
    }
    if let Some(size) = font.size {
        f = f.set_font_size(size);
    }
    if let Some(color) = font.color {
        f = f.set_font_color(map_color(color));
    }
    if font.bold {
        f = f.set_bold();
    }
    if font.italic {
        f = f.set_italic();
    }
    if font.strikethrough {
        f = f.set_font_strikethrough();
    }
    if let Some(underline) = &font.underline {
        f = f.set_underline(map_underline(underline));
    }

    let border = &style.border;
    f = apply_border(f, &border.left, Format::set_border_left, |f, c| {
        f.set_border_left_color(c)
    });
    f = apply_border(f, &border.right, Format::set_border_right, |f, c| {
        f.set_border_right_color(c)
    });
    f = apply_border(f, &border.top, Format::set_border_top, |f, c| {
        f.set_border_top_color(c)
    });
    f = apply_border(f, &border.bottom, Format::set_border_bottom, |f, c| {
        f.set_border_bottom_color(c)
    });

    if let Some(pattern) = style.fill.pattern.as_deref().and_then(map_pattern) {
        f = f.set_pattern(pattern);
        if matches!(pattern, FormatPattern::Solid) {
            // A solid fill shows its foreground color
            if let Some(color) = style.fill.fg_color {
                f = f.set_background_color(map_color(color));
            }
        } else {
            if let Some(color) = style.fill.fg_color {
                f = f.set_foreground_color(map_color(color));
            }
            if let Some(color) = style.fill.bg_color {
                f = f.set_background_color(map_color(color));
            }
        }
    }

    let number_format = &style.number_format;
    match &number_format.code {
        Some(code) => f = f.set_num_format(code),
        None if !number_format.is_general() => {
            if let Ok(index) = u8::try_from(number_format.id) {
                f = f.set_num_format_index(index);
            }
        }
        None => {}
    }

    let alignment = &style.alignment;
    if let Some(align) = alignment.horizontal.as_deref().and_then(map_h_align) {
        f = f.set_align(align);
    }
    if let Some(align) = alignment.vertical.as_deref().and_then(map_v_align) {
        f = f.set_align(align);
    }
    if alignment.wrap_text {
        f = f.set_text_wrap();
    }
    if alignment.shrink_to_fit {
        f = f.set_shrink();
    }
    if alignment.indent > 0 {
        f = f.set_indent(alignment.indent);
    }
    if alignment.rotation != 0 {
        f = f.set_rotation(map_rotation(alignment.rotation));
    }

    if !style.protection.locked {
        f = f.set_unlocked();
    }
    if style.protection.hidden {
        f = f.set_hidden();
    }

    f
}
