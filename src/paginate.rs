//! Fixed-capacity pagination of a sheet's items.

use crate::item::Item;

/// Items per page: a 3 × 5 grid.
pub const CAPACITY: usize = 15;

/// A run of at most [`CAPACITY`] consecutive items from one sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page<'a> {
    /// 1-based position of the page within its sheet.
    pub number: usize,
    pub items: &'a [Item],
}

impl Page<'_> {
    /// Output file name for this page.
    pub fn file_name(&self) -> String {
        format!("cheat-sheet-{}.png", self.number)
    }
}

/// Splits `items` into pages of [`CAPACITY`], keeping input order.
///
/// Returns `ceil(items.len() / CAPACITY)` pages. Only the last page can be
/// short, and no page is ever empty.
pub fn paginate(items: &[Item]) -> Vec<Page<'_>> {
    items
        .chunks(CAPACITY)
        .enumerate()
        .map(|(index, items)| Page {
            number: index + 1,
            items,
        })
        .collect()
}
