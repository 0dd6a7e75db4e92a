//! Document access: the collaborator contract the channels extract from.

pub mod pdf;

pub use pdf::PdfDocument;

use image::DynamicImage;

use crate::error::PageError;
use crate::models::parameter::BoundingBox;

/// Result type for page-scoped document operations.
pub type Result<T> = std::result::Result<T, PageError>;

/// Kind of drawing document, by what it contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// Native vector content with extractable text.
    Vector,
    /// Raster-only content (a scanned drawing).
    Scanned,
    /// Both extractable text and raster content.
    Hybrid,
    /// Neither.
    Empty,
}

/// Structured text layout of one page: lines with bounding boxes.
#[derive(Debug, Clone, Default)]
pub struct TextLayout {
    pub lines: Vec<LayoutLine>,
}

/// One positioned line of text.
#[derive(Debug, Clone)]
pub struct LayoutLine {
    pub text: String,
    pub bbox: BoundingBox,
}

/// A drawing document opened for one extraction run.
///
/// Both channels read through this trait; the handle is immutable for the
/// duration of the run and released when dropped, on every exit path.
/// Every page operation is fallible per page so a bad page never takes the
/// run down with it.
pub trait DrawingDocument {
    /// Number of pages in the document.
    fn page_count(&self) -> u32;

    /// Plain extractable text of a page (1-based).
    fn page_text(&self, page: u32) -> Result<String>;

    /// Structured line layout of a page, used for coordinate recovery.
    fn page_layout(&self, page: u32) -> Result<TextLayout>;

    /// Rasterize a page at the given upscale factor.
    fn render_page(&self, page: u32, upscale: f32) -> Result<DynamicImage>;

    /// Classify the document by its content.
    fn kind(&self) -> DocumentKind;
}
