//! OCR boundary: a black-box image-to-text function plus the enhancement
//! pipeline that prepares page rasters for it.

mod preprocessing;

pub use preprocessing::ImagePreprocessor;

use image::GrayImage;

use crate::error::OcrError;

/// Result type for OCR operations.
pub type Result<T> = std::result::Result<T, OcrError>;

/// A pure image-to-text function.
///
/// Implementations take `&self` and must not retain state across calls;
/// each call stands alone. Page numbering, confidence and retries are the
/// caller's concern.
pub trait OcrEngine {
    /// Recognize text in a preprocessed bitmap.
    fn recognize(&self, image: &GrayImage) -> Result<String>;
}

impl<F> OcrEngine for F
where
    F: Fn(&GrayImage) -> Result<String>,
{
    fn recognize(&self, image: &GrayImage) -> Result<String> {
        self(image)
    }
}
