//! QR markup for item codes.
//!
//! The renderer only needs an SVG string per code. [`QrMarkup`] is the
//! default provider; any other [`MarkupProvider`] can be plugged into
//! [`crate::render::PageRenderer`].

use qrcode::{Color, EcLevel, QrCode};
use tracing::warn;

/// Source of vector markup for an item code.
///
/// Implementations return an empty string when no markup can be produced.
/// They never fail past this boundary.
#[allow(async_fn_in_trait)]
pub trait MarkupProvider {
    async fn markup(&self, code: &str) -> String;
}

/// Encodes codes with the `qrcode` crate and emits one SVG path.
#[derive(Debug, Clone, Copy)]
pub struct QrMarkup {
    /// Quiet zone in modules.
    pub border: u32,
    pub ec_level: EcLevel,
}

impl Default for QrMarkup {
    fn default() -> Self {
        Self {
            border: 4,
            ec_level: EcLevel::L,
        }
    }
}

impl QrMarkup {
    /// Synchronous form of [`MarkupProvider::markup`].
    pub fn svg(&self, code: &str) -> Result<String, qrcode::types::QrError> {
        let qr = QrCode::with_error_correction_level(code.as_bytes(), self.ec_level)?;
        Ok(to_svg_string(&qr, self.border))
    }
}

impl MarkupProvider for QrMarkup {
    async fn markup(&self, code: &str) -> String {
        match self.svg(code) {
            Ok(svg) => svg,
            Err(e) => {
                warn!(code, error = %e, "QR encoding failed, using empty markup");
                String::new()
            }
        }
    }
}

// Returns SVG code for an image depicting the given QR Code, with the
// given number of border modules. Always uses Unix newlines.
fn to_svg_string(qr: &QrCode, border: u32) -> String {
    let size = qr.width();
    let dimension = size as u32 + border * 2;
    let mut result = String::new();
    result += "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";
    result += &format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" version=\"1.1\" viewBox=\"0 0 {0} {0}\" stroke=\"none\">\n",
        dimension
    );
    result += "\t<rect width=\"100%\" height=\"100%\" fill=\"#FFFFFF\"/>\n";
    result += "\t<path d=\"";
    let mut first = true;
    for (i, color) in qr.to_colors().iter().enumerate() {
        if *color != Color::Dark {
            continue;
        }
        if !first {
            result += " ";
        }
        first = false;
        let x = (i % size) as u32 + border;
        let y = (i / size) as u32 + border;
        result += &format!("M{},{}h1v1h-1z", x, y);
    }
    result += "\" fill=\"#000000\"/>\n";
    result += "</svg>\n";
    result
}
