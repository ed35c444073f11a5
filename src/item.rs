//! Records and sheets consumed by the pipeline.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One row of a worksheet.
///
/// Only `code` and `label` are read by the renderer. Every other column is
/// kept in `extra` exactly as it was read and is never inspected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Value encoded into the QR symbol and printed under it.
    #[serde(rename = "UPC", default)]
    pub code: String,

    /// Free text printed beside the symbol.
    #[serde(rename = "DESCRIPTION", default)]
    pub label: String,

    /// Passthrough columns.
    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
}

impl Item {
    pub fn new(code: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            label: label.into(),
            extra: BTreeMap::new(),
        }
    }
}

/// A named, ordered list of items.
///
/// The name is optional; unnamed sheets get a positional directory name
/// when exported (see [`crate::sanitize::directory_name`]).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sheet {
    pub name: Option<String>,
    pub items: Vec<Item>,
}

impl Sheet {
    pub fn new(name: impl Into<String>, items: Vec<Item>) -> Self {
        Self {
            name: Some(name.into()),
            items,
        }
    }

    pub fn unnamed(items: Vec<Item>) -> Self {
        Self { name: None, items }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
