//! # qrsheets
//!
//! A Rust library for turning spreadsheet rows into printable and exportable sheets of labeled
//! QR codes.
//!
//! `qrsheets` splits each worksheet into pages of 15 items, lays every page out as a 3 × 5 grid
//! on an 11in × 8.5in landscape canvas (1056 × 816 px at 96 DPI), and either rasterizes the pages
//! to PNG files or collects them into one print document. A page that fails to render or save is
//! logged and skipped; the rest of the batch carries on.
//!
//! ## Features
//!
//! - Fixed-capacity pagination with 1-based page numbers per sheet.
//! - Filesystem-safe directory names derived from sheet names.
//! - PNG export to `{root}/{sheet}/cheat-sheet-{page}.png`.
//! - Multi-sheet print document with a page break after every page.
//! - Pluggable capabilities: markup provider, rasterizer, destination picker, persistence sink,
//!   print surface and spreadsheet reader.
//! - Timeouts on markup requests and rasterization, and cooperative cancellation.
//!
//! ## Installation
//!
//! Add to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! qrsheets = "0.1" # Replace with the latest version
//! ```
//!
//! ## Example
//!
//! Export two sheets into `output/`:
//!
//! ```no_run
//! use qrsheets::{
//!     config::Config,
//!     export::{ExportCoordinator, FixedDestination, FsSink},
//!     item::{Item, Sheet},
//!     markup::QrMarkup,
//!     render::{PageRenderer, SvgRasterizer},
//! };
//!
//! # async fn run() {
//! let config = Config::default();
//! let renderer = PageRenderer::new(QrMarkup::default(), SvgRasterizer::new(&config), config);
//! let exporter = ExportCoordinator::new(
//!     renderer,
//!     FixedDestination(Some("output".into())),
//!     FsSink,
//! );
//!
//! let sheets = vec![
//!     Sheet::new("Fasteners", vec![Item::new("0001", "Hex bolt M4")]),
//!     Sheet::new("Q1/Sales", vec![Item::new("0002", "Washer")]),
//! ];
//! let report = exporter.export_all(&sheets).await;
//! assert!(report.failures.is_empty());
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`sanitize`]: Sheet name to directory segment mapping.
//! - [`paginate`]: Fixed-capacity pages.
//! - [`layout`]: Page geometry and SVG page documents.
//! - [`render`]: Markup resolution and rasterization.
//! - [`export`]: PNG export coordinator.
//! - [`print`]: Print document coordinator.
//! - [`markup`], [`workbook`]: Default QR markup provider and spreadsheet reader.

pub mod config;
pub mod error;
pub mod export;
pub mod item;
pub mod layout;
pub mod markup;
pub mod paginate;
pub mod print;
pub mod render;
pub mod sanitize;
pub mod workbook;

pub use error::{SheetError, SheetResult};
pub use item::{Item, Sheet};
