//! Cell formatting records.
//!
//! Every type here is a plain owned value. Cloning a [`CellStyle`] yields a
//! fully independent snapshot, so a style copied into one sheet can never be
//! observed through another.

use serde::{Deserialize, Serialize};

/// A color reference as stored in `xl/styles.xml`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum StyleColor {
    #[default]
    Automatic,
    /// 24-bit RGB, alpha dropped.
    Rgb(u32),
    /// Theme palette slot.
    Theme(u8),
    /// Legacy indexed palette slot.
    Indexed(u8),
}

impl StyleColor {
    /// Parse an `ARGB` or `RGB` hex string such as `FF1F4E79`.
    #[must_use]
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim_start_matches('#');
        let rgb = match hex.len() {
            8 => &hex[2..],
            6 => hex,
            _ => return None,
        };
        u32::from_str_radix(rgb, 16).ok().map(StyleColor::Rgb)
    }
}

/// Font attributes.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Font {
    pub name: Option<String>,
    pub size: Option<f64>,
    pub bold: bool,
    pub italic: bool,
    pub strikethrough: bool,
    /// Underline kind (`single`, `double`, `singleAccounting`, ...).
    pub underline: Option<String>,
    pub color: Option<StyleColor>,
}

/// One edge of a cell border.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BorderSide {
    /// Line style name (`thin`, `medium`, `dashed`, ...); `None` means no line.
    pub style: Option<String>,
    pub color: Option<StyleColor>,
}

impl BorderSide {
    #[must_use]
    pub fn is_set(&self) -> bool {
        self.style.as_deref().is_some_and(|s| s != "none")
    }
}

/// Cell border.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Border {
    pub left: BorderSide,
    pub right: BorderSide,
    pub top: BorderSide,
    pub bottom: BorderSide,
}

/// Pattern fill.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Fill {
    /// Pattern name (`solid`, `gray125`, ...); `None` or `none` means no fill.
    pub pattern: Option<String>,
    pub fg_color: Option<StyleColor>,
    pub bg_color: Option<StyleColor>,
}

/// Number format: the `numFmtId` plus the format code for custom ids.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NumberFormat {
    pub id: u16,
    pub code: Option<String>,
}

impl NumberFormat {
    /// The `General` format.
    #[must_use]
    pub fn is_general(&self) -> bool {
        self.id == 0 && self.code.is_none()
    }
}

/// Cell protection flags. Excel locks cells by default.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Protection {
    pub locked: bool,
    pub hidden: bool,
}

impl Default for Protection {
    fn default() -> Self {
        Protection {
            locked: true,
            hidden: false,
        }
    }
}

/// Text alignment.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Alignment {
    pub horizontal: Option<String>,
    pub vertical: Option<String>,
    pub wrap_text: bool,
    pub shrink_to_fit: bool,
    pub indent: u8,
    pub rotation: i16,
}

/// Complete formatting of a cell.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CellStyle {
    pub font: Font,
    pub border: Border,
    pub fill: Fill,
    pub number_format: NumberFormat,
    pub protection: Protection,
    pub alignment: Alignment,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_from_hex() {
        assert_eq!(StyleColor::from_hex("FF1F4E79"), Some(StyleColor::Rgb(0x1F4E79)));
        assert_eq!(StyleColor::from_hex("#00FF00"), Some(StyleColor::Rgb(0x00FF00)));
        assert_eq!(StyleColor::from_hex("xyz"), None);
    }

    #[test]
    fn test_clone_is_independent() {
        let mut original = CellStyle::default();
        original.font.name = Some("Calibri".to_string());

        let mut copy = original.clone();
        copy.font.name = Some("Arial".to_string());
        copy.border.top.style = Some("thin".to_string());

        assert_eq!(original.font.name.as_deref(), Some("Calibri"));
        assert!(!original.border.top.is_set());
    }

    #[test]
    fn test_defaults() {
        let style = CellStyle::default();
        assert!(style.protection.locked);
        assert!(style.number_format.is_general());
    }
}
