//! PNG export of every page of every sheet.
//!
//! Layout on disk:
//!
//! ```text
//! {root}/{sanitized sheet name | sheet-N}/cheat-sheet-{page}.png
//! ```
//!
//! A failed page is logged, recorded in the [`ExportReport`] and skipped.
//! Nothing is retried; only cancellation stops the batch early.

use crate::error::{SheetError, SheetResult};
use crate::item::Sheet;
use crate::markup::MarkupProvider;
use crate::paginate::paginate;
use crate::render::{PageRenderer, Rasterizer};
use crate::sanitize::directory_name;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Chooses the export root. `None` means the user cancelled.
#[allow(async_fn_in_trait)]
pub trait DestinationPicker {
    async fn choose_directory(&self) -> Option<PathBuf>;
}

/// Writes encoded images, creating the directory when missing.
#[allow(async_fn_in_trait)]
pub trait PersistenceSink {
    async fn write_image(&self, directory: &Path, filename: &str, png: &[u8]) -> SheetResult<PathBuf>;
}

/// Picker with a destination decided up front, e.g. from the command line.
#[derive(Debug, Clone, Default)]
pub struct FixedDestination(pub Option<PathBuf>);

impl DestinationPicker for FixedDestination {
    async fn choose_directory(&self) -> Option<PathBuf> {
        self.0.clone()
    }
}

/// Local filesystem sink.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsSink;

impl PersistenceSink for FsSink {
    async fn write_image(&self, directory: &Path, filename: &str, png: &[u8]) -> SheetResult<PathBuf> {
        tokio::fs::create_dir_all(directory).await?;
        let path = directory.join(filename);
        tokio::fs::write(&path, png).await?;
        Ok(path)
    }
}

/// One encoded page on its way to the sink.
#[derive(Debug, Clone)]
pub struct ExportTarget {
    pub directory: PathBuf,
    pub file_name: String,
    pub png: Vec<u8>,
}

/// A page that produced no file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageFailure {
    pub sheet: String,
    pub page: usize,
    pub reason: String,
}

/// Outcome of [`ExportCoordinator::export_all`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExportReport {
    pub written: Vec<PathBuf>,
    pub failures: Vec<PageFailure>,
    /// No destination was chosen; nothing was written.
    pub aborted: bool,
    /// The batch was cancelled between pages.
    pub cancelled: bool,
}

pub struct ExportCoordinator<M, R, P, S> {
    renderer: PageRenderer<M, R>,
    picker: P,
    sink: S,
    cancel: CancellationToken,
}

impl<M, R, P, S> ExportCoordinator<M, R, P, S>
where
    M: MarkupProvider,
    R: Rasterizer,
    P: DestinationPicker,
    S: PersistenceSink,
{
    pub fn new(renderer: PageRenderer<M, R>, picker: P, sink: S) -> Self {
        Self {
            renderer,
            picker,
            sink,
            cancel: CancellationToken::new(),
        }
    }

    /// Stops the batch at the next page boundary once `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Exports every non-empty sheet as numbered PNG pages.
    ///
    /// The destination is requested once, before any page is rendered. If
    /// the picker returns `None` the call returns with zero writes.
    #[instrument(skip_all, fields(sheets = sheets.len()))]
    pub async fn export_all(&self, sheets: &[Sheet]) -> ExportReport {
        let mut report = ExportReport::default();
        if sheets.iter().all(Sheet::is_empty) {
            info!("Nothing to export");
            return report;
        }

        let Some(root) = self.picker.choose_directory().await else {
            warn!("Directory selection cancelled");
            report.aborted = true;
            return report;
        };
        info!(root = %root.display(), "Exporting sheets");

        let mut used = HashSet::new();
        for (index, sheet) in sheets.iter().enumerate() {
            if sheet.is_empty() {
                debug!(index, "Skipping empty sheet");
                continue;
            }
            let dir_name =
                claim_directory(&mut used, directory_name(sheet.name.as_deref(), index), index);
            let directory = root.join(&dir_name);
            if !self.export_sheet(&directory, &dir_name, sheet, &mut report).await {
                break;
            }
        }

        info!(
            written = report.written.len(),
            failed = report.failures.len(),
            cancelled = report.cancelled,
            "Export finished"
        );
        report
    }

    // Returns false when the batch was cancelled.
    async fn export_sheet(
        &self,
        directory: &Path,
        dir_name: &str,
        sheet: &Sheet,
        report: &mut ExportReport,
    ) -> bool {
        let pages = paginate(&sheet.items);
        info!(sheet = %dir_name, items = sheet.items.len(), pages = pages.len(), "Exporting sheet");

        let concurrency = self.renderer.config().render_concurrency.max(1);
        // `buffered` yields in input order, so numbering stays positional.
        let rendered = stream::iter(pages)
            .map(|page| async move { (page, self.renderer.render_page(page).await) })
            .buffered(concurrency);
        let mut rendered = std::pin::pin!(rendered);

        loop {
            if self.cancel.is_cancelled() {
                warn!(sheet = %dir_name, "Export cancelled");
                report.cancelled = true;
                return false;
            }
            let Some((page, result)) = rendered.next().await else {
                return true;
            };

            let target = result.and_then(|done| {
                Ok(ExportTarget {
                    directory: directory.to_path_buf(),
                    file_name: page.file_name(),
                    png: done.png()?,
                })
            });
            let outcome = match target {
                Ok(target) => self.persist(&target).await,
                Err(e) => Err(e),
            };

            match outcome {
                Ok(path) => {
                    debug!(path = %path.display(), "Page written");
                    report.written.push(path);
                }
                Err(e) => {
                    warn!(sheet = %dir_name, page = page.number, error = %e, "Page skipped");
                    report.failures.push(PageFailure {
                        sheet: dir_name.to_string(),
                        page: page.number,
                        reason: e.to_string(),
                    });
                }
            }
        }
    }

    async fn persist(&self, target: &ExportTarget) -> SheetResult<PathBuf> {
        if self.cancel.is_cancelled() {
            return Err(SheetError::Cancelled);
        }
        self.sink
            .write_image(&target.directory, &target.file_name, &target.png)
            .await
    }
}

/// Reserves a directory segment no earlier sheet of the batch uses.
///
/// Segments are compared case-insensitively. A taken segment gets the
/// sheet's 1-based position appended, then a counter if that is taken too.
fn claim_directory(used: &mut HashSet<String>, dir_name: String, index: usize) -> String {
    if used.insert(dir_name.to_lowercase()) {
        return dir_name;
    }
    let base = format!("{}-{}", dir_name, index + 1);
    let mut candidate = base.clone();
    let mut n = 2;
    while !used.insert(candidate.to_lowercase()) {
        candidate = format!("{}-{}", base, n);
        n += 1;
    }
    warn!(directory = %dir_name, renamed = %candidate, "Sheet directory already used in this export");
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fs_sink_creates_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("a").join("b");
        let path = FsSink.write_image(&dir, "x.png", b"data").await.unwrap();

        assert_eq!(path, dir.join("x.png"));
        assert_eq!(std::fs::read(&path).unwrap(), b"data");
    }

    #[tokio::test]
    async fn test_fixed_destination() {
        assert_eq!(FixedDestination(None).choose_directory().await, None);
        let root = PathBuf::from("/tmp/out");
        assert_eq!(
            FixedDestination(Some(root.clone())).choose_directory().await,
            Some(root)
        );
    }

    #[test]
    fn test_claim_directory_never_repeats() {
        let mut used = HashSet::new();
        let names: Vec<String> = [("A_B", 0), ("A_B", 1), ("a_b", 2), ("A_B-2", 3), ("A_B", 1)]
            .into_iter()
            .map(|(name, index)| claim_directory(&mut used, name.to_string(), index))
            .collect();

        assert_eq!(names, vec!["A_B", "A_B-2", "a_b-3", "A_B-2-4", "A_B-2-2"]);
    }
}
