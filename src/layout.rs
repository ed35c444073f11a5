//! Page geometry and SVG page documents.
//!
//! A page is 11in × 8.5in at 96 DPI, split into a 3 × 5 grid with 8px
//! gaps. Each occupied cell holds a dashed 346 × 147 box with the item's QR
//! symbol (100px) over its code on the left and the wrapped label on the
//! right. Unused cells are left blank.

use crate::item::Item;
use crate::paginate::CAPACITY;
use base64::{engine::general_purpose, Engine as _};
use quick_xml::escape::escape;
use std::fmt::Write as _;

pub const PAGE_WIDTH: u32 = 1056;
pub const PAGE_HEIGHT: u32 = 816;
pub const COLUMNS: usize = 3;
pub const ROWS: usize = 5;

const GAP: f32 = 8.0;
const ITEM_WIDTH: f32 = 346.0;
const ITEM_HEIGHT: f32 = 147.0;
const RADIUS: f32 = 8.0;
// 1px border + 4px padding
const INSET: f32 = 5.0;
const QR_SIZE: f32 = 100.0;
const CODE_FONT: f32 = 12.8;
const LABEL_FONT: f32 = 14.4;
const LABEL_MARGIN: f32 = 8.0;
const LINE_HEIGHT: f32 = LABEL_FONT * 1.2;
// Rough advance of an average glyph, used for wrapping.
const CHAR_WIDTH: f32 = LABEL_FONT * 0.5;
const FONT_FAMILY: &str = "Arial, Helvetica, sans-serif";

/// Top-left corner of grid cell `index`, filled row by row.
pub fn cell_origin(index: usize) -> (f32, f32) {
    let cell_width = (PAGE_WIDTH as f32 - GAP * (COLUMNS - 1) as f32) / COLUMNS as f32;
    let cell_height = (PAGE_HEIGHT as f32 - GAP * (ROWS - 1) as f32) / ROWS as f32;
    let column = index % COLUMNS;
    let row = index / COLUMNS;
    (
        column as f32 * (cell_width + GAP),
        row as f32 * (cell_height + GAP),
    )
}

/// Size of the box drawn in an occupied cell.
pub fn item_box() -> (f32, f32) {
    (ITEM_WIDTH, ITEM_HEIGHT)
}

/// Where the QR symbol of the item in cell `index` is drawn: `(x, y, size)`.
pub fn qr_rect(index: usize) -> (f32, f32, f32) {
    let (x, y) = cell_origin(index);
    let column_height = QR_SIZE + CODE_FONT * 1.2;
    (x + INSET, y + (ITEM_HEIGHT - column_height) / 2.0, QR_SIZE)
}

/// Self-contained SVG document for one page.
///
/// Used as-is by the rasterizer and embedded inline by the print document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageFragment {
    svg: String,
    items: usize,
}

impl PageFragment {
    /// Lays out `items` with their resolved `markups`, one cell each in order.
    ///
    /// Only the first [`CAPACITY`] items are placed. A missing or empty
    /// markup leaves the symbol area blank but still draws code and label.
    pub fn build(items: &[Item], markups: &[String]) -> Self {
        let placed = items.len().min(CAPACITY);
        let mut svg = String::with_capacity(4096 + markups.iter().map(|m| m.len() * 2).sum::<usize>());
        let _ = write!(
            svg,
            "<svg xmlns=\"http://www.w3.org/2000/svg\" xmlns:xlink=\"http://www.w3.org/1999/xlink\" \
             version=\"1.1\" width=\"{0}\" height=\"{1}\" viewBox=\"0 0 {0} {1}\">\n",
            PAGE_WIDTH, PAGE_HEIGHT
        );
        let _ = writeln!(
            svg,
            "\t<rect width=\"{PAGE_WIDTH}\" height=\"{PAGE_HEIGHT}\" fill=\"#FFFFFF\"/>"
        );
        for (index, item) in items.iter().take(placed).enumerate() {
            let markup = markups.get(index).map(String::as_str).unwrap_or("");
            write_cell(&mut svg, index, item, markup);
        }
        svg.push_str("</svg>\n");
        Self { svg, items: placed }
    }

    pub fn as_svg(&self) -> &str {
        &self.svg
    }

    /// Number of occupied cells.
    pub fn len(&self) -> usize {
        self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items == 0
    }
}

fn write_cell(svg: &mut String, index: usize, item: &Item, markup: &str) {
    let (x, y) = cell_origin(index);
    let _ = writeln!(
        svg,
        "\t<g class=\"item\">\n\t\t<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" rx=\"{RADIUS}\" \
         fill=\"none\" stroke=\"#000000\" stroke-width=\"1\" stroke-dasharray=\"3 3\"/>",
        x + 0.5,
        y + 0.5,
        ITEM_WIDTH - 1.0,
        ITEM_HEIGHT - 1.0
    );

    let (qx, qy, size) = qr_rect(index);
    if !markup.trim().is_empty() {
        let _ = writeln!(
            svg,
            "\t\t<image x=\"{qx:.2}\" y=\"{qy:.2}\" width=\"{size}\" height=\"{size}\" \
             preserveAspectRatio=\"xMidYMid meet\" xlink:href=\"data:image/svg+xml;base64,{}\"/>",
            general_purpose::STANDARD.encode(markup.as_bytes())
        );
    }
    let _ = writeln!(
        svg,
        "\t\t<text x=\"{:.2}\" y=\"{:.2}\" font-family=\"{FONT_FAMILY}\" font-size=\"{CODE_FONT}\" \
         text-anchor=\"middle\" fill=\"#000000\">{}</text>",
        qx + size / 2.0,
        qy + size + CODE_FONT,
        escape(item.code.as_str())
    );

    let label_x = x + INSET + QR_SIZE + LABEL_MARGIN;
    let label_width = ITEM_WIDTH - INSET * 2.0 - QR_SIZE - LABEL_MARGIN;
    let max_chars = (label_width / CHAR_WIDTH).floor() as usize;
    let max_lines = ((ITEM_HEIGHT - INSET * 2.0) / LINE_HEIGHT).floor() as usize;
    let lines = wrap_label(&item.label, max_chars, max_lines);
    if !lines.is_empty() {
        let block = lines.len() as f32 * LINE_HEIGHT;
        let first_baseline = y + (ITEM_HEIGHT - block) / 2.0 + LABEL_FONT;
        let _ = write!(
            svg,
            "\t\t<text font-family=\"{FONT_FAMILY}\" font-size=\"{LABEL_FONT}\" fill=\"#000000\">"
        );
        for (i, line) in lines.iter().enumerate() {
            let _ = write!(
                svg,
                "<tspan x=\"{label_x:.2}\" y=\"{:.2}\">{}</tspan>",
                first_baseline + i as f32 * LINE_HEIGHT,
                escape(line.as_str())
            );
        }
        svg.push_str("</text>\n");
    }
    svg.push_str("\t</g>\n");
}

/// Greedy word wrap to at most `max_lines` lines of `max_chars` characters.
///
/// Words longer than a line are broken. Text that does not fit ends with an
/// ellipsis on the last line.
pub fn wrap_label(text: &str, max_chars: usize, max_lines: usize) -> Vec<String> {
    if max_chars == 0 || max_lines == 0 {
        return Vec::new();
    }
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;
    let mut overflow = false;

    'words: for word in text.split_whitespace() {
        let mut chars: Vec<char> = word.chars().collect();
        while !chars.is_empty() {
            let sep = usize::from(current_len > 0);
            if current_len + sep + chars.len() <= max_chars {
                if sep == 1 {
                    current.push(' ');
                }
                current.extend(chars.iter());
                current_len += sep + chars.len();
                break;
            }
            if current_len > 0 {
                lines.push(std::mem::take(&mut current));
                current_len = 0;
            } else {
                let rest = chars.split_off(max_chars);
                lines.push(chars.into_iter().collect());
                chars = rest;
            }
            if lines.len() == max_lines {
                overflow = true;
                break 'words;
            }
        }
    }
    if !overflow && current_len > 0 {
        if lines.len() == max_lines {
            overflow = true;
        } else {
            lines.push(current);
        }
    }

    if overflow {
        if let Some(last) = lines.last_mut() {
            let keep = max_chars.saturating_sub(1);
            if last.chars().count() > keep {
                *last = last.chars().take(keep).collect();
            }
            last.push('…');
        }
    }
    lines
}
