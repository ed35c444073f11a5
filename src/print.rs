//! Print path: one multi-page document for all sheets.
//!
//! The print surface is acquired before any markup is requested and is held
//! by a [`SurfaceGuard`], so it is closed on every return path. A document
//! is presented only once it is complete.

use crate::error::SheetResult;
use crate::item::Sheet;
use crate::layout::{PageFragment, PAGE_HEIGHT, PAGE_WIDTH};
use crate::markup::MarkupProvider;
use crate::paginate::paginate;
use crate::render::PageRenderer;
use crate::sanitize::directory_name;
use quick_xml::escape::escape;
use std::fmt::Write as _;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Trait for print surfaces
#[allow(async_fn_in_trait)]
pub trait PrintSurface {
    /// Hand a finished document to the surface
    async fn present(&mut self, document: &PrintDocument) -> SheetResult<()>;

    /// Release the surface. Called exactly once, by [`SurfaceGuard`].
    fn close(&mut self);
}

/// Opens print surfaces. `None` means no surface is available.
#[allow(async_fn_in_trait)]
pub trait PrintSurfaceProvider {
    type Surface: PrintSurface;

    async fn acquire(&self) -> Option<Self::Surface>;
}

/// Closes the wrapped surface when dropped.
pub struct SurfaceGuard<S: PrintSurface> {
    surface: S,
}

impl<S: PrintSurface> SurfaceGuard<S> {
    pub fn new(surface: S) -> Self {
        Self { surface }
    }

    pub async fn present(&mut self, document: &PrintDocument) -> SheetResult<()> {
        self.surface.present(document).await
    }
}

impl<S: PrintSurface> Drop for SurfaceGuard<S> {
    fn drop(&mut self) {
        self.surface.close();
    }
}

/// One printed page.
#[derive(Debug, Clone)]
pub struct PrintPage {
    /// Directory-style sheet name, used for page titles.
    pub sheet: String,
    pub number: usize,
    pub fragment: PageFragment,
}

/// Pages in print order. Every page is followed by a page break.
#[derive(Debug, Clone, Default)]
pub struct PrintDocument {
    pages: Vec<PrintPage>,
}

impl PrintDocument {
    pub fn push(&mut self, page: PrintPage) {
        self.pages.push(page);
    }

    pub fn pages(&self) -> &[PrintPage] {
        &self.pages
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Landscape HTML with each page inlined as SVG.
    pub fn to_html(&self) -> String {
        let mut html = String::new();
        html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
        html.push_str("<title>Print Sheets</title>\n<style>\n");
        html.push_str("@page { size: landscape; margin: 10mm; }\n");
        html.push_str("body { font-family: Arial, sans-serif; margin: 0; padding: 0; }\n");
        let _ = writeln!(
            html,
            ".sheet {{ width: {PAGE_WIDTH}px; height: {PAGE_HEIGHT}px; margin-bottom: 8px; \
             background-color: white; page-break-after: always; break-after: page; }}"
        );
        html.push_str("</style>\n</head>\n<body>\n");
        for page in &self.pages {
            let _ = writeln!(
                html,
                "<div class=\"sheet\" title=\"{} - page {}\">",
                escape(page.sheet.as_str()),
                page.number
            );
            html.push_str(page.fragment.as_svg());
            html.push_str("</div>\n");
        }
        html.push_str("</body>\n</html>\n");
        html
    }
}

/// Result of [`PrintCoordinator::print_all`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrintOutcome {
    /// The document was handed to the surface.
    Presented { pages: usize },
    /// Every sheet was empty.
    Empty,
    /// No print surface could be acquired.
    Unavailable,
    Cancelled,
    /// The surface rejected the document.
    Failed(String),
}

pub struct PrintCoordinator<M, R, V> {
    renderer: PageRenderer<M, R>,
    provider: V,
    cancel: CancellationToken,
}

impl<M, R, V> PrintCoordinator<M, R, V>
where
    M: MarkupProvider,
    V: PrintSurfaceProvider,
{
    pub fn new(renderer: PageRenderer<M, R>, provider: V) -> Self {
        Self {
            renderer,
            provider,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Prints every non-empty sheet into one document.
    ///
    /// Each sheet starts on a new page; sheets longer than one page continue
    /// on further pages in item order.
    #[instrument(skip_all, fields(sheets = sheets.len()))]
    pub async fn print_all(&self, sheets: &[Sheet]) -> PrintOutcome {
        if sheets.iter().all(Sheet::is_empty) {
            info!("Nothing to print");
            return PrintOutcome::Empty;
        }

        let Some(surface) = self.provider.acquire().await else {
            warn!("Failed to open print surface");
            return PrintOutcome::Unavailable;
        };
        let mut surface = SurfaceGuard::new(surface);

        let mut document = PrintDocument::default();
        for (index, sheet) in sheets.iter().enumerate() {
            if sheet.is_empty() {
                continue;
            }
            let name = directory_name(sheet.name.as_deref(), index);
            for page in paginate(&sheet.items) {
                if self.cancel.is_cancelled() {
                    warn!(sheet = %name, "Print cancelled");
                    return PrintOutcome::Cancelled;
                }
                let fragment = self.renderer.fragment(page.items).await;
                document.push(PrintPage {
                    sheet: name.clone(),
                    number: page.number,
                    fragment,
                });
            }
        }

        let pages = document.pages().len();
        debug!(pages, "Print document ready");
        match surface.present(&document).await {
            Ok(()) => {
                info!(pages, "Print document sent");
                PrintOutcome::Presented { pages }
            }
            Err(e) => {
                warn!(error = %e, "Print surface rejected document");
                PrintOutcome::Failed(e.to_string())
            }
        }
    }
}

/// Print surface that spools the document to an HTML file for the system
/// browser's print dialog.
#[derive(Debug, Clone, Default)]
pub struct HtmlSpool {
    pub path: Option<PathBuf>,
}

impl HtmlSpool {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }
}

impl PrintSurfaceProvider for HtmlSpool {
    type Surface = HtmlSpoolSurface;

    async fn acquire(&self) -> Option<HtmlSpoolSurface> {
        let path = self.path.clone()?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                warn!(path = %parent.display(), error = %e, "Spool directory unavailable");
                return None;
            }
        }
        Some(HtmlSpoolSurface { path })
    }
}

#[derive(Debug)]
pub struct HtmlSpoolSurface {
    path: PathBuf,
}

impl PrintSurface for HtmlSpoolSurface {
    async fn present(&mut self, document: &PrintDocument) -> SheetResult<()> {
        tokio::fs::write(&self.path, document.to_html()).await?;
        info!(path = %self.path.display(), "Print document spooled");
        Ok(())
    }

    fn close(&mut self) {
        debug!(path = %self.path.display(), "Spool closed");
    }
}
