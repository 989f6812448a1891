//! Direct reads of the xlsx package parts that carry formatting and layout.
//!
//! Cell values come from calamine; this module supplies what calamine does
//! not expose: the per-cell format index (`s` attribute), the resolved
//! `cellXfs` table from `xl/styles.xml`, merged ranges, column widths and
//! row heights.

use crate::a1_notation::{CellRange, CellRef, ColIndex, RowIndex, MAX_COLS};
use crate::error::{Result, SheetError};
use crate::style::{
    Alignment, Border, BorderSide, CellStyle, Fill, Font, NumberFormat, Protection, StyleColor,
};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::{BTreeMap, HashMap};
use std::io::{Read, Seek};
use zip::result::ZipError;
use zip::ZipArchive;

const WORKBOOK_PART: &str = "xl/workbook.xml";
const WORKBOOK_RELS_PART: &str = "xl/_rels/workbook.xml.rels";
const STYLES_PART: &str = "xl/styles.xml";

/// Formatting and layout of one worksheet, as stored in its XML part.
#[derive(Debug, Default)]
pub(crate) struct SheetLayout {
    /// Non-default `cellXfs` index per cell.
    pub cell_styles: BTreeMap<(RowIndex, ColIndex), usize>,
    pub merged: Vec<CellRange>,
    pub col_widths: BTreeMap<ColIndex, f64>,
    pub row_heights: BTreeMap<RowIndex, f64>,
}

/// The resolved `cellXfs` table.
#[derive(Debug, Default)]
pub(crate) struct Stylesheet {
    xfs: Vec<CellStyle>,
}

impl Stylesheet {
    /// Style for an xf index. Index 0 is the workbook default and yields `None`.
    pub fn style(&self, xf: usize) -> Option<&CellStyle> {
        if xf == 0 {
            return None;
        }
        self.xfs.get(xf)
    }
}

/// Read access to the raw parts of an xlsx package.
pub(crate) struct Package<R: Read + Seek> {
    archive: ZipArchive<R>,
    sheet_parts: HashMap<String, String>,
}

impl<R: Read + Seek> Package<R> {
    pub fn open(reader: R) -> Result<Self> {
        let mut archive = ZipArchive::new(reader)?;
        let workbook = read_part(&mut archive, WORKBOOK_PART)?
            .ok_or_else(|| SheetError::xml(WORKBOOK_PART, "part missing"))?;
        let rels = read_part(&mut archive, WORKBOOK_RELS_PART)?.unwrap_or_default();

        let targets = parse_relationship_targets(&rels)?;
        let mut sheet_parts = HashMap::new();
        for (name, rid) in parse_workbook_sheets(&workbook)? {
            if let Some(target) = targets.get(&rid) {
                sheet_parts.insert(name, resolve_target(target));
            }
        }

        Ok(Package {
            archive,
            sheet_parts,
        })
    }

    /// Parse `xl/styles.xml`; a package without one has only default styles.
    pub fn stylesheet(&mut self) -> Result<Stylesheet> {
        match read_part(&mut self.archive, STYLES_PART)? {
            Some(xml) => parse_stylesheet(&xml),
            None => Ok(Stylesheet::default()),
        }
    }

    /// Parse the layout of a worksheet by its display name.
    pub fn sheet_layout(&mut self, sheet_name: &str) -> Result<SheetLayout> {
        let part = self
            .sheet_parts
            .get(sheet_name)
            .cloned()
            .ok_or_else(|| SheetError::SheetNotFound {
                name: sheet_name.to_string(),
            })?;
        let xml = read_part(&mut self.archive, &part)?
            .ok_or_else(|| SheetError::xml(&part, "part missing"))?;
        parse_sheet_layout(&part, &xml)
    }
}

fn read_part<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> Result<Option<String>> {
    let mut file = match archive.by_name(name) {
        Ok(file) => file,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let mut xml = String::new();
    file.read_to_string(&mut xml)?;
    Ok(Some(xml))
}

/// Relationship targets are relative to `xl/` unless absolute.
fn resolve_target(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("xl/{target}"),
    }
}

fn attr(e: &BytesStart<'_>, name: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == name)
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

fn attr_parse<T: std::str::FromStr>(e: &BytesStart<'_>, name: &[u8]) -> Option<T> {
    attr(e, name).and_then(|v| v.trim().parse().ok())
}

fn attr_bool(e: &BytesStart<'_>, name: &[u8]) -> Option<bool> {
    attr(e, name).map(|v| matches!(v.as_str(), "1" | "true"))
}

/// Walk every element of a document, reporting opens and closes.
/// Self-closing elements produce an open immediately followed by a close.
fn walk<F, G>(part: &str, xml: &str, mut open: F, mut close: G) -> Result<()>
where
    F: FnMut(&[u8], &BytesStart<'_>) -> Result<()>,
    G: FnMut(&[u8]),
{
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => open(e.local_name().as_ref(), &e)?,
            Ok(Event::Empty(e)) => {
                open(e.local_name().as_ref(), &e)?;
                close(e.local_name().as_ref());
            }
            Ok(Event::End(e)) => close(e.local_name().as_ref()),
            Ok(Event::Eof) => break,
            Err(e) => return Err(SheetError::xml(part, e)),
            _ => {}
        }
    }
    Ok(())
}

/// `(sheet name, relationship id)` pairs in workbook order.
fn parse_workbook_sheets(xml: &str) -> Result<Vec<(String, String)>> {
    let mut sheets = Vec::new();
    walk(
        WORKBOOK_PART,
        xml,
        |name, e| {
            if name == b"sheet" {
                let rid = e
                    .attributes()
                    .flatten()
                    .find(|a| a.key.local_name().as_ref() == b"id" && a.key.prefix().is_some())
                    .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()));
                if let (Some(sheet), Some(rid)) = (attr(e, b"name"), rid) {
                    sheets.push((sheet, rid));
                }
            }
            Ok(())
        },
        |_| {},
    )?;
    Ok(sheets)
}

fn parse_relationship_targets(xml: &str) -> Result<HashMap<String, String>> {
    let mut targets = HashMap::new();
    if xml.is_empty() {
        return Ok(targets);
    }
    walk(
        WORKBOOK_RELS_PART,
        xml,
        |name, e| {
            if name == b"Relationship" {
                if let (Some(id), Some(target)) = (attr(e, b"Id"), attr(e, b"Target")) {
                    targets.insert(id, target);
                }
            }
            Ok(())
        },
        |_| {},
    )?;
    Ok(targets)
}

fn parse_sheet_layout(part: &str, xml: &str) -> Result<SheetLayout> {
    let mut layout = SheetLayout::default();
    let mut row: Option<RowIndex> = None;
    let mut next_col: ColIndex = 0;

    walk(
        part,
        xml,
        |name, e| {
            match name {
                b"row" => {
                    let r = attr_parse::<RowIndex>(e, b"r")
                        .and_then(|r| r.checked_sub(1))
                        .unwrap_or_else(|| row.map_or(0, |prev| prev + 1));
                    row = Some(r);
                    next_col = 0;
                    if let Some(height) = attr_parse::<f64>(e, b"ht") {
                        layout.row_heights.insert(r, height);
                    }
                }
                b"c" => {
                    let at = match attr(e, b"r") {
                        Some(r) => r.parse::<CellRef>()?,
                        None => CellRef::new(row.unwrap_or(0), next_col),
                    };
                    next_col = at.col.saturating_add(1);
                    if let Some(xf) = attr_parse::<usize>(e, b"s").filter(|&xf| xf != 0) {
                        layout.cell_styles.insert((at.row, at.col), xf);
                    }
                }
                b"col" => {
                    let min = attr_parse::<u32>(e, b"min").unwrap_or(1).max(1);
                    let max = attr_parse::<u32>(e, b"max").unwrap_or(min).min(u32::from(MAX_COLS));
                    if let Some(width) = attr_parse::<f64>(e, b"width") {
                        for col in min..=max {
                            layout.col_widths.insert((col - 1) as ColIndex, width);
                        }
                    }
                }
                b"mergeCell" => {
                    if let Some(range) = attr(e, b"ref") {
                        layout.merged.push(range.parse()?);
                    }
                }
                _ => {}
            }
            Ok(())
        },
        |_| {},
    )?;

    Ok(layout)
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Section {
    Outside,
    NumFmts,
    Fonts,
    Fills,
    Borders,
    CellXfs,
    /// Inside a container whose children are not cell formats (`dxfs`, `cellStyleXfs`, ...).
    Ignored,
}

#[derive(Debug, Clone, Copy)]
enum Edge {
    Left,
    Right,
    Top,
    Bottom,
    Other,
}

#[derive(Debug, Default)]
struct RawXf {
    num_fmt_id: u16,
    font_id: usize,
    fill_id: usize,
    border_id: usize,
    alignment: Alignment,
    protection: Protection,
}

fn parse_color(e: &BytesStart<'_>) -> Option<StyleColor> {
    if let Some(rgb) = attr(e, b"rgb") {
        return StyleColor::from_hex(&rgb);
    }
    if let Some(theme) = attr_parse::<u8>(e, b"theme") {
        return Some(StyleColor::Theme(theme));
    }
    if let Some(indexed) = attr_parse::<u8>(e, b"indexed") {
        return Some(StyleColor::Indexed(indexed));
    }
    attr_bool(e, b"auto")
        .filter(|&auto| auto)
        .map(|_| StyleColor::Automatic)
}

fn parse_stylesheet(xml: &str) -> Result<Stylesheet> {
    let mut section = Section::Outside;
    let mut ignored_container: Vec<u8> = Vec::new();

    let mut num_fmts: HashMap<u16, String> = HashMap::new();
    let mut fonts: Vec<Font> = Vec::new();
    let mut fills: Vec<Fill> = Vec::new();
    let mut borders: Vec<Border> = Vec::new();
    let mut xfs: Vec<RawXf> = Vec::new();

    let mut font = Font::default();
    let mut fill = Fill::default();
    let mut border = Border::default();
    let mut edge: Option<Edge> = None;
    let mut xf = RawXf::default();

    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    loop {
        let (name, start, is_empty) = match reader.read_event() {
            Ok(Event::Start(e)) => (e.local_name().as_ref().to_vec(), Some(e), false),
            Ok(Event::Empty(e)) => (e.local_name().as_ref().to_vec(), Some(e), true),
            Ok(Event::End(e)) => (e.local_name().as_ref().to_vec(), None, false),
            Ok(Event::Eof) => break,
            Err(e) => return Err(SheetError::xml(STYLES_PART, e)),
            _ => continue,
        };

        if let Some(e) = start.as_ref() {
            match (section, name.as_slice()) {
                (Section::Outside, b"numFmts") => section = Section::NumFmts,
                (Section::Outside, b"fonts") => section = Section::Fonts,
                (Section::Outside, b"fills") => section = Section::Fills,
                (Section::Outside, b"borders") => section = Section::Borders,
                (Section::Outside, b"cellXfs") => section = Section::CellXfs,
                (Section::Outside, b"styleSheet") => {}
                (Section::Outside, other) => {
                    if !is_empty {
                        section = Section::Ignored;
                        ignored_container = other.to_vec();
                    }
                }

                (Section::NumFmts, b"numFmt") => {
                    if let (Some(id), Some(code)) =
                        (attr_parse::<u16>(e, b"numFmtId"), attr(e, b"formatCode"))
                    {
                        num_fmts.insert(id, code);
                    }
                }

                (Section::Fonts, b"font") => font = Font::default(),
                (Section::Fonts, b"b") => font.bold = attr_bool(e, b"val").unwrap_or(true),
                (Section::Fonts, b"i") => font.italic = attr_bool(e, b"val").unwrap_or(true),
                (Section::Fonts, b"strike") => {
                    font.strikethrough = attr_bool(e, b"val").unwrap_or(true);
                }
                (Section::Fonts, b"u") => {
                    let kind = attr(e, b"val").unwrap_or_else(|| "single".to_string());
                    font.underline = (kind != "none").then_some(kind);
                }
                (Section::Fonts, b"sz") => font.size = attr_parse(e, b"val"),
                (Section::Fonts, b"name") => font.name = attr(e, b"val"),
                (Section::Fonts, b"color") => font.color = parse_color(e),

                (Section::Fills, b"fill") => fill = Fill::default(),
                (Section::Fills, b"patternFill") => fill.pattern = attr(e, b"patternType"),
                (Section::Fills, b"fgColor") => fill.fg_color = parse_color(e),
                (Section::Fills, b"bgColor") => fill.bg_color = parse_color(e),

                (Section::Borders, b"border") => border = Border::default(),
                (Section::Borders, b"left" | b"start") => {
                    edge = Some(Edge::Left);
                    border.left.style = attr(e, b"style");
                }
                (Section::Borders, b"right" | b"end") => {
                    edge = Some(Edge::Right);
                    border.right.style = attr(e, b"style");
                }
                (Section::Borders, b"top") => {
                    edge = Some(Edge::Top);
                    border.top.style = attr(e, b"style");
                }
                (Section::Borders, b"bottom") => {
                    edge = Some(Edge::Bottom);
                    border.bottom.style = attr(e, b"style");
                }
                (Section::Borders, b"diagonal" | b"vertical" | b"horizontal") => {
                    edge = Some(Edge::Other);
                }
                (Section::Borders, b"color") => {
                    let color = parse_color(e);
                    let side: Option<&mut BorderSide> = match edge {
                        Some(Edge::Left) => Some(&mut border.left),
                        Some(Edge::Right) => Some(&mut border.right),
                        Some(Edge::Top) => Some(&mut border.top),
                        Some(Edge::Bottom) => Some(&mut border.bottom),
                        Some(Edge::Other) | None => None,
                    };
                    if let Some(side) = side {
                        side.color = color;
                    }
                }

                (Section::CellXfs, b"xf") => {
                    xf = RawXf {
                        num_fmt_id: attr_parse(e, b"numFmtId").unwrap_or(0),
                        font_id: attr_parse(e, b"fontId").unwrap_or(0),
                        fill_id: attr_parse(e, b"fillId").unwrap_or(0),
                        border_id: attr_parse(e, b"borderId").unwrap_or(0),
                        ..RawXf::default()
                    };
                }
                (Section::CellXfs, b"alignment") => {
                    xf.alignment = Alignment {
                        horizontal: attr(e, b"horizontal"),
                        vertical: attr(e, b"vertical"),
                        wrap_text: attr_bool(e, b"wrapText").unwrap_or(false),
                        shrink_to_fit: attr_bool(e, b"shrinkToFit").unwrap_or(false),
                        indent: attr_parse(e, b"indent").unwrap_or(0),
                        rotation: attr_parse(e, b"textRotation").unwrap_or(0),
                    };
                }
                (Section::CellXfs, b"protection") => {
                    xf.protection = Protection {
                        locked: attr_bool(e, b"locked").unwrap_or(true),
                        hidden: attr_bool(e, b"hidden").unwrap_or(false),
                    };
                }
                _ => {}
            }
        }

        // Closing half: explicit end tags and self-closing elements.
        if start.is_none() || is_empty {
            match (section, name.as_slice()) {
                (Section::NumFmts, b"numFmts")
                | (Section::Fonts, b"fonts")
                | (Section::Fills, b"fills")
                | (Section::Borders, b"borders")
                | (Section::CellXfs, b"cellXfs") => section = Section::Outside,
                (Section::Ignored, closing) if closing == ignored_container.as_slice() => {
                    section = Section::Outside;
                }
                (Section::Fonts, b"font") => fonts.push(std::mem::take(&mut font)),
                (Section::Fills, b"fill") => fills.push(std::mem::take(&mut fill)),
                (Section::Borders, b"border") => borders.push(std::mem::take(&mut border)),
                (
                    Section::Borders,
                    b"left" | b"start" | b"right" | b"end" | b"top" | b"bottom" | b"diagonal"
                    | b"vertical" | b"horizontal",
                ) => edge = None,
                (Section::CellXfs, b"xf") => xfs.push(std::mem::take(&mut xf)),
                _ => {}
            }
        }
    }

    let xfs = xfs
        .into_iter()
        .map(|raw| CellStyle {
            font: fonts.get(raw.font_id).cloned().unwrap_or_default(),
            border: borders.get(raw.border_id).cloned().unwrap_or_default(),
            fill: fills.get(raw.fill_id).cloned().unwrap_or_default(),
            number_format: NumberFormat {
                id: raw.num_fmt_id,
                code: num_fmts.get(&raw.num_fmt_id).cloned(),
            },
            protection: raw.protection,
            alignment: raw.alignment,
        })
        .collect();

    Ok(Stylesheet { xfs })
}

#[cfg(test)]
mod tests {
    use super::*;

    const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <numFmts count="1"><numFmt numFmtId="164" formatCode="0.00%"/></numFmts>
  <fonts count="2">
    <font><sz val="11"/><color theme="1"/><name val="Calibri"/></font>
    <font><b/><i val="0"/><u/><sz val="14"/><color rgb="FF1F4E79"/><name val="Arial"/></font>
  </fonts>
  <fills count="3">
    <fill><patternFill patternType="none"/></fill>
    <fill><patternFill patternType="gray125"/></fill>
    <fill><patternFill patternType="solid"><fgColor rgb="FFDDEBF7"/><bgColor indexed="64"/></patternFill></fill>
  </fills>
  <borders count="2">
    <border><left/><right/><top/><bottom/><diagonal/></border>
    <border><left style="thin"><color indexed="64"/></left><right/><top/><bottom style="medium"><color rgb="FF000000"/></bottom><diagonal/></border>
  </borders>
  <cellStyleXfs count="1"><xf numFmtId="0" fontId="1" fillId="2" borderId="1"/></cellStyleXfs>
  <cellXfs count="3">
    <xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/>
    <xf numFmtId="164" fontId="1" fillId="2" borderId="1" xfId="0" applyFont="1">
      <alignment horizontal="center" vertical="top" wrapText="1" textRotation="45"/>
      <protection locked="0" hidden="1"/>
    </xf>
    <xf numFmtId="14" fontId="0" fillId="0" borderId="0" xfId="0"/>
  </cellXfs>
  <dxfs count="1"><dxf><font><b/></font><fill><patternFill><bgColor rgb="FFFF0000"/></patternFill></fill></dxf></dxfs>
</styleSheet>"#;

    #[test]
    fn test_parse_stylesheet() {
        let sheet = parse_stylesheet(STYLES).unwrap();
        assert_eq!(sheet.xfs.len(), 3);
        assert!(sheet.style(0).is_none());

        let style = sheet.style(1).unwrap();
        assert!(style.font.bold);
        assert!(!style.font.italic);
        assert_eq!(style.font.underline.as_deref(), Some("single"));
        assert_eq!(style.font.size, Some(14.0));
        assert_eq!(style.font.name.as_deref(), Some("Arial"));
        assert_eq!(style.font.color, Some(StyleColor::Rgb(0x1F4E79)));

        assert_eq!(style.fill.pattern.as_deref(), Some("solid"));
        assert_eq!(style.fill.fg_color, Some(StyleColor::Rgb(0xDDEBF7)));
        assert_eq!(style.fill.bg_color, Some(StyleColor::Indexed(64)));

        assert_eq!(style.border.left.style.as_deref(), Some("thin"));
        assert_eq!(style.border.bottom.style.as_deref(), Some("medium"));
        assert_eq!(style.border.bottom.color, Some(StyleColor::Rgb(0)));
        assert!(!style.border.top.is_set());

        assert_eq!(style.number_format.id, 164);
        assert_eq!(style.number_format.code.as_deref(), Some("0.00%"));
        assert_eq!(style.alignment.horizontal.as_deref(), Some("center"));
        assert_eq!(style.alignment.vertical.as_deref(), Some("top"));
        assert!(style.alignment.wrap_text);
        assert_eq!(style.alignment.rotation, 45);
        assert!(!style.protection.locked);
        assert!(style.protection.hidden);

        let date = sheet.style(2).unwrap();
        assert_eq!(date.number_format.id, 14);
        assert!(date.number_format.code.is_none());
        assert!(!date.font.bold);
        assert!(date.protection.locked);
    }

    #[test]
    fn test_parse_sheet_layout() {
        let xml = r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <cols><col min="1" max="1" width="14.5" customWidth="1"/><col min="5" max="6" width="9" customWidth="1"/></cols>
  <sheetData>
    <row r="1" ht="28" customHeight="1"><c r="A1" s="1" t="s"><v>0</v></c><c r="B1" s="1"/></row>
    <row r="5"><c r="A5" t="s"><v>1</v></c><c r="E5" s="2"/><c s="1"/></row>
  </sheetData>
  <mergeCells count="1"><mergeCell ref="A1:F1"/></mergeCells>
</worksheet>"#;
        let layout = parse_sheet_layout("xl/worksheets/sheet2.xml", xml).unwrap();

        assert_eq!(layout.row_heights.get(&0), Some(&28.0));
        assert_eq!(layout.row_heights.len(), 1);
        assert_eq!(layout.col_widths.get(&0), Some(&14.5));
        assert_eq!(layout.col_widths.get(&4), Some(&9.0));
        assert_eq!(layout.col_widths.get(&5), Some(&9.0));
        assert_eq!(layout.col_widths.len(), 3);

        assert_eq!(layout.cell_styles.get(&(0, 0)), Some(&1));
        assert_eq!(layout.cell_styles.get(&(0, 1)), Some(&1));
        assert_eq!(layout.cell_styles.get(&(4, 0)), None);
        assert_eq!(layout.cell_styles.get(&(4, 4)), Some(&2));
        // Cell without an `r` attribute follows its predecessor
        assert_eq!(layout.cell_styles.get(&(4, 5)), Some(&1));

        assert_eq!(layout.merged, vec!["A1:F1".parse::<CellRange>().unwrap()]);
    }

    #[test]
    fn test_workbook_sheet_mapping() {
        let workbook = r#"<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
  <sheets><sheet name="Raw" sheetId="1" r:id="rId1"/><sheet name="BM01" sheetId="2" r:id="rId2"/></sheets>
</workbook>"#;
        let rels = r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
  <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="/xl/worksheets/sheet2.xml"/>
</Relationships>"#;

        let sheets = parse_workbook_sheets(workbook).unwrap();
        assert_eq!(
            sheets,
            vec![
                ("Raw".to_string(), "rId1".to_string()),
                ("BM01".to_string(), "rId2".to_string())
            ]
        );

        let targets = parse_relationship_targets(rels).unwrap();
        assert_eq!(resolve_target(&targets["rId1"]), "xl/worksheets/sheet1.xml");
        assert_eq!(resolve_target(&targets["rId2"]), "xl/worksheets/sheet2.xml");
    }
}
