//! Error types for the sheet pipeline

use std::time::Duration;
use thiserror::Error;

/// Sheet pipeline error types
#[derive(Debug, Error)]
pub enum SheetError {
    /// Workbook could not be opened or a worksheet could not be read
    #[error("Workbook error: {0}")]
    Workbook(#[from] calamine::Error),

    /// Worksheet has no usable header row
    #[error("Missing header: {0}")]
    MissingHeader(String),

    /// QR markup could not be produced for a code
    #[error("Markup failed: {0}")]
    Markup(String),

    /// Page document could not be parsed or drawn
    #[error("Rasterization failed: {0}")]
    Rasterize(String),

    /// Bitmap could not be encoded as PNG
    #[error("Image encoding failed: {0}")]
    Image(#[from] image::ImageError),

    /// IO error while persisting output
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A suspension point did not complete in time
    #[error("Timeout after {elapsed:?}: {what}")]
    Timeout { what: String, elapsed: Duration },

    /// The batch was cancelled before this step ran
    #[error("Cancelled")]
    Cancelled,

    /// Invalid configuration value
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}

/// Result type for sheet operations
pub type SheetResult<T> = Result<T, SheetError>;
