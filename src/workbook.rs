//! Spreadsheet input.
//!
//! The first row of a worksheet is its header row. `UPC` and `DESCRIPTION`
//! columns fill [`Item::code`] and [`Item::label`]; every other column is
//! carried through untouched.

use crate::error::{SheetError, SheetResult};
use crate::item::{Item, Sheet};
use calamine::{open_workbook_auto, Data, Range, Reader};
use std::path::Path;
use tracing::{debug, warn};

pub const CODE_COLUMN: &str = "UPC";
pub const LABEL_COLUMN: &str = "DESCRIPTION";

/// Source of sheet names and rows.
#[allow(async_fn_in_trait)]
pub trait SpreadsheetReader {
    async fn sheet_names(&self, path: &Path) -> SheetResult<Vec<String>>;

    /// Rows of one sheet in order. Empty when the sheet cannot be read.
    async fn read_sheet(&self, path: &Path, name: &str) -> Vec<Item>;
}

/// Reads xlsx, xlsm, xlsb, xls and ods files through calamine.
#[derive(Debug, Clone, Copy, Default)]
pub struct CalamineReader;

impl CalamineReader {
    fn names_blocking(path: &Path) -> SheetResult<Vec<String>> {
        let workbook = open_workbook_auto(path)?;
        Ok(workbook.sheet_names())
    }

    fn sheet_blocking(path: &Path, name: &str) -> SheetResult<Vec<Item>> {
        let mut workbook = open_workbook_auto(path)?;
        let range = workbook.worksheet_range(name)?;
        items_from_range(&range)
    }
}

impl SpreadsheetReader for CalamineReader {
    async fn sheet_names(&self, path: &Path) -> SheetResult<Vec<String>> {
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || Self::names_blocking(&path))
            .await
            .map_err(|e| SheetError::Io(std::io::Error::other(e)))?
    }

    async fn read_sheet(&self, path: &Path, name: &str) -> Vec<Item> {
        let owned_path = path.to_path_buf();
        let sheet = name.to_string();
        let result = match tokio::task::spawn_blocking(move || Self::sheet_blocking(&owned_path, &sheet)).await {
            Ok(result) => result,
            Err(e) => Err(SheetError::Io(std::io::Error::other(e))),
        };

        match result {
            Ok(items) => {
                debug!(sheet = name, items = items.len(), "Sheet read");
                items
            }
            Err(e) => {
                warn!(sheet = name, error = %e, "Could not read sheet");
                Vec::new()
            }
        }
    }
}

/// Converts a worksheet range into items, skipping blank rows.
pub fn items_from_range(range: &Range<Data>) -> SheetResult<Vec<Item>> {
    let mut rows = range.rows();
    let headers: Vec<String> = rows
        .next()
        .map(|row| row.iter().map(|cell| cell.to_string().trim().to_string()).collect())
        .ok_or_else(|| SheetError::MissingHeader("worksheet is empty".to_string()))?;

    if !headers
        .iter()
        .any(|h| h.eq_ignore_ascii_case(CODE_COLUMN))
    {
        return Err(SheetError::MissingHeader(format!(
            "no {} column in {:?}",
            CODE_COLUMN, headers
        )));
    }

    let items = rows
        .filter(|row| row.iter().any(|cell| !matches!(cell, Data::Empty)))
        .map(|row| {
            let mut item = Item::default();
            for (header, cell) in headers.iter().zip(row.iter()) {
                let value = cell.to_string();
                if header.eq_ignore_ascii_case(CODE_COLUMN) {
                    item.code = value;
                } else if header.eq_ignore_ascii_case(LABEL_COLUMN) {
                    item.label = value;
                } else if !header.is_empty() {
                    item.extra.insert(header.clone(), value);
                }
            }
            item
        })
        .collect();
    Ok(items)
}

/// Reads the requested sheets in order, or every sheet when `names` is empty.
pub async fn load_sheets<R: SpreadsheetReader>(
    reader: &R,
    path: &Path,
    names: &[String],
) -> SheetResult<Vec<Sheet>> {
    let names = if names.is_empty() {
        reader.sheet_names(path).await?
    } else {
        names.to_vec()
    };

    let mut sheets = Vec::with_capacity(names.len());
    for name in names {
        let items = reader.read_sheet(path, &name).await;
        sheets.push(Sheet::new(name, items));
    }
    Ok(sheets)
}
