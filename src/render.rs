//! Page rendering: markup resolution, page documents and rasterization.

use crate::config::Config;
use crate::error::{SheetError, SheetResult};
use crate::item::Item;
use crate::layout::{PageFragment, PAGE_HEIGHT, PAGE_WIDTH};
use crate::markup::MarkupProvider;
use crate::paginate::Page;
use image::{ImageFormat, RgbaImage};
use resvg::{tiny_skia, usvg};
use std::io::Cursor;
use std::sync::Arc;
use tracing::{debug, warn};

/// Turns an SVG page document into a bitmap.
#[allow(async_fn_in_trait)]
pub trait Rasterizer {
    async fn rasterize(&self, svg: &str, width: u32, height: u32) -> SheetResult<RgbaImage>;
}

/// Rasterizer backed by resvg.
///
/// A fresh pixmap is allocated for every call and dropped when the call
/// returns. Drawing runs on tokio's blocking pool.
#[derive(Clone)]
pub struct SvgRasterizer {
    fontdb: Arc<usvg::fontdb::Database>,
}

impl SvgRasterizer {
    pub fn new(config: &Config) -> Self {
        let mut fontdb = usvg::fontdb::Database::new();
        if config.system_fonts {
            fontdb.load_system_fonts();
        }
        if let Some(dir) = &config.font_dir {
            fontdb.load_fonts_dir(dir);
        }
        debug!(faces = fontdb.len(), "Font database ready");
        Self {
            fontdb: Arc::new(fontdb),
        }
    }

    /// Rasterizer without any fonts. Text is skipped, everything else is drawn.
    pub fn without_fonts() -> Self {
        Self {
            fontdb: Arc::new(usvg::fontdb::Database::new()),
        }
    }

    fn draw(
        fontdb: Arc<usvg::fontdb::Database>,
        svg: &str,
        width: u32,
        height: u32,
    ) -> SheetResult<RgbaImage> {
        let mut options = usvg::Options::default();
        options.fontdb = fontdb;
        let tree = usvg::Tree::from_str(svg, &options)
            .map_err(|e| SheetError::Rasterize(format!("Invalid page document: {}", e)))?;

        let mut pixmap = tiny_skia::Pixmap::new(width, height).ok_or_else(|| {
            SheetError::Rasterize(format!("Cannot allocate {}x{} surface", width, height))
        })?;
        pixmap.fill(tiny_skia::Color::WHITE);

        let size = tree.size();
        let transform = tiny_skia::Transform::from_scale(
            width as f32 / size.width(),
            height as f32 / size.height(),
        );
        resvg::render(&tree, transform, &mut pixmap.as_mut());

        // Opaque white background, so premultiplied and straight RGBA agree.
        RgbaImage::from_raw(width, height, pixmap.take())
            .ok_or_else(|| SheetError::Rasterize("Surface capture size mismatch".to_string()))
    }
}

impl Rasterizer for SvgRasterizer {
    async fn rasterize(&self, svg: &str, width: u32, height: u32) -> SheetResult<RgbaImage> {
        let fontdb = Arc::clone(&self.fontdb);
        let svg = svg.to_owned();
        tokio::task::spawn_blocking(move || Self::draw(fontdb, &svg, width, height))
            .await
            .map_err(|e| SheetError::Rasterize(format!("Render task failed: {}", e)))?
    }
}

/// A page with its resolved markup and bitmap, ready to persist.
#[derive(Debug, Clone)]
pub struct RenderedPage<'a> {
    pub page: Page<'a>,
    /// One entry per item of `page`, empty where the request failed.
    pub markups: Vec<String>,
    pub bitmap: RgbaImage,
}

impl RenderedPage<'_> {
    /// Encodes the bitmap as PNG bytes.
    pub fn png(&self) -> SheetResult<Vec<u8>> {
        encode_png(&self.bitmap)
    }
}

pub fn encode_png(bitmap: &RgbaImage) -> SheetResult<Vec<u8>> {
    let mut buf = Vec::new();
    bitmap.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)?;
    Ok(buf)
}

/// Builds page documents and bitmaps for up to 15 items.
///
/// The print path only needs documents, so `R` may be `()` there.
pub struct PageRenderer<M, R> {
    markup: M,
    rasterizer: R,
    config: Config,
}

impl<M: MarkupProvider, R> PageRenderer<M, R> {
    pub fn new(markup: M, rasterizer: R, config: Config) -> Self {
        Self {
            markup,
            rasterizer,
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Requests markup for each item, one at a time and in item order.
    ///
    /// A request that exceeds the markup timeout yields empty markup for
    /// that item only.
    pub async fn resolve_markup(&self, items: &[Item]) -> Vec<String> {
        let mut markups = Vec::with_capacity(items.len());
        for item in items {
            let markup = match tokio::time::timeout(
                self.config.markup_timeout,
                self.markup.markup(&item.code),
            )
            .await
            {
                Ok(markup) => markup,
                Err(_) => {
                    warn!(code = %item.code, timeout = ?self.config.markup_timeout, "Markup request timed out");
                    String::new()
                }
            };
            markups.push(markup);
        }
        markups
    }

    /// Document fragment for the print path.
    pub async fn fragment(&self, items: &[Item]) -> PageFragment {
        let markups = self.resolve_markup(items).await;
        PageFragment::build(items, &markups)
    }
}

impl<M: MarkupProvider, R: Rasterizer> PageRenderer<M, R> {
    /// Bitmap for the export path. Always exactly 1056 × 816.
    pub async fn render(&self, items: &[Item]) -> SheetResult<RgbaImage> {
        let markups = self.resolve_markup(items).await;
        self.draw_page(items, &markups).await
    }

    pub async fn render_page<'a>(&self, page: Page<'a>) -> SheetResult<RenderedPage<'a>> {
        let markups = self.resolve_markup(page.items).await;
        let bitmap = self.draw_page(page.items, &markups).await?;
        Ok(RenderedPage {
            page,
            markups,
            bitmap,
        })
    }

    async fn draw_page(&self, items: &[Item], markups: &[String]) -> SheetResult<RgbaImage> {
        let fragment = PageFragment::build(items, markups);
        let timeout = self.config.render_timeout;
        match tokio::time::timeout(
            timeout,
            self.rasterizer
                .rasterize(fragment.as_svg(), PAGE_WIDTH, PAGE_HEIGHT),
        )
        .await
        {
            Ok(Ok(bitmap)) if bitmap.dimensions() == (PAGE_WIDTH, PAGE_HEIGHT) => Ok(bitmap),
            Ok(Ok(bitmap)) => Err(SheetError::Rasterize(format!(
                "Expected {}x{} bitmap, got {}x{}",
                PAGE_WIDTH,
                PAGE_HEIGHT,
                bitmap.width(),
                bitmap.height()
            ))),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(SheetError::Timeout {
                what: "page rasterization".to_string(),
                elapsed: timeout,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{cell_origin, item_box, qr_rect};
    use crate::markup::QrMarkup;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Records requested codes and returns real QR markup.
    #[derive(Default)]
    struct Recording {
        seen: Mutex<Vec<String>>,
    }

    impl MarkupProvider for Recording {
        async fn markup(&self, code: &str) -> String {
            self.seen.lock().unwrap().push(code.to_string());
            QrMarkup::default().markup(code).await
        }
    }

    struct Stalled;

    impl MarkupProvider for Stalled {
        async fn markup(&self, _code: &str) -> String {
            std::future::pending::<()>().await;
            unreachable!()
        }
    }

    struct Broken;

    impl Rasterizer for Broken {
        async fn rasterize(&self, _svg: &str, _w: u32, _h: u32) -> SheetResult<RgbaImage> {
            Err(SheetError::Rasterize("no surface".to_string()))
        }
    }

    struct Hung;

    impl Rasterizer for Hung {
        async fn rasterize(&self, _svg: &str, _w: u32, _h: u32) -> SheetResult<RgbaImage> {
            std::future::pending::<()>().await;
            unreachable!()
        }
    }

    fn is_dark(bitmap: &RgbaImage, x: u32, y: u32) -> bool {
        let p = bitmap.get_pixel(x, y);
        p[0] < 96 && p[1] < 96 && p[2] < 96
    }

    fn region_is_blank(bitmap: &RgbaImage, index: usize) -> bool {
        let (x, y) = cell_origin(index);
        let (w, h) = item_box();
        (x as u32..(x + w) as u32)
            .flat_map(|px| (y as u32..(y + h) as u32).map(move |py| (px, py)))
            .all(|(px, py)| bitmap.get_pixel(px, py).0 == [255, 255, 255, 255])
    }

    #[tokio::test]
    async fn test_bitmap_has_fixed_size_and_blank_unused_cells() {
        let renderer = PageRenderer::new(
            QrMarkup::default(),
            SvgRasterizer::without_fonts(),
            Config::default(),
        );
        let items = vec![Item::new("A", "only item")];
        let bitmap = renderer.render(&items).await.unwrap();

        assert_eq!(bitmap.dimensions(), (1056, 816));

        // Center of the top-left finder pattern of the symbol.
        let (qx, qy, size) = qr_rect(0);
        let module = size / 29.0;
        assert!(is_dark(&bitmap, (qx + module * 7.5) as u32, (qy + module * 7.5) as u32));

        for index in 1..15 {
            assert!(region_is_blank(&bitmap, index), "cell {index} not blank");
        }
    }

    #[tokio::test]
    async fn test_markup_requested_once_per_item_in_order() {
        let renderer = PageRenderer::new(
            Recording::default(),
            SvgRasterizer::without_fonts(),
            Config::default(),
        );
        let items: Vec<Item> = ["3", "1", "2", "1"].iter().map(|c| Item::new(*c, "")).collect();
        let fragment = renderer.fragment(&items).await;

        assert_eq!(fragment.len(), 4);
        assert_eq!(*renderer.markup.seen.lock().unwrap(), vec!["3", "1", "2", "1"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_markup_timeout_degrades_to_empty() {
        let config = Config {
            markup_timeout: Duration::from_millis(50),
            ..Config::default()
        };
        let renderer = PageRenderer::new(Stalled, SvgRasterizer::without_fonts(), config);
        let markups = renderer
            .resolve_markup(&[Item::new("1", "a"), Item::new("2", "b")])
            .await;

        assert_eq!(markups, vec![String::new(), String::new()]);
    }

    #[tokio::test]
    async fn test_rasterize_failure_is_returned() {
        let renderer = PageRenderer::new(QrMarkup::default(), Broken, Config::default());
        let result = renderer.render(&[Item::new("1", "a")]).await;

        assert!(matches!(result, Err(SheetError::Rasterize(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rasterize_timeout_is_a_page_failure() {
        let config = Config {
            render_timeout: Duration::from_millis(10),
            ..Config::default()
        };
        let renderer = PageRenderer::new(QrMarkup::default(), Hung, config);
        let result = renderer.render(&[Item::new("1", "a")]).await;

        match result {
            Err(SheetError::Timeout { what, elapsed }) => {
                assert_eq!(what, "page rasterization");
                assert_eq!(elapsed, Duration::from_millis(10));
            }
            other => panic!("expected timeout, got {:?}", other.map(|b| b.dimensions())),
        }
    }

    #[tokio::test]
    async fn test_rendered_page_keeps_markup_per_item() {
        let renderer = PageRenderer::new(
            Recording::default(),
            SvgRasterizer::without_fonts(),
            Config::default(),
        );
        let items = vec![Item::new("A", "first"), Item::new("B", "second")];
        let page = crate::paginate::paginate(&items)[0];
        let rendered = renderer.render_page(page).await.unwrap();

        assert_eq!(rendered.markups.len(), 2);
        assert_eq!(rendered.markups[0], QrMarkup::default().markup("A").await);
        assert_eq!(rendered.markups[1], QrMarkup::default().markup("B").await);
        assert_eq!(rendered.bitmap.dimensions(), (1056, 816));
    }

    #[test]
    fn test_png_encoding() {
        let bitmap = RgbaImage::from_pixel(4, 3, image::Rgba([255, 255, 255, 255]));
        let png = encode_png(&bitmap).unwrap();

        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (4, 3));
    }
}
