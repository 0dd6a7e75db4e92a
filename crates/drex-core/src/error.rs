//! Error types for the drex-core library.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the drex library.
#[derive(Error, Debug)]
pub enum DrexError {
    /// Document source error.
    #[error("source error: {0}")]
    Source(#[from] SourceError),

    /// Page-scoped processing error.
    #[error("page error: {0}")]
    Page(#[from] PageError),

    /// OCR engine error.
    #[error("OCR error: {0}")]
    Ocr(#[from] OcrError),

    /// Image processing error.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors that make the source document unusable.
///
/// These are the only fatal errors in a run: if the document cannot be
/// opened at all there is nothing to extract from. Everything below this
/// level is recoverable.
#[derive(Error, Debug)]
pub enum SourceError {
    /// The document file does not exist.
    #[error("document not found: {0}")]
    NotFound(PathBuf),

    /// The document exists but could not be parsed.
    #[error("document unreadable: {0}")]
    Unreadable(String),

    /// The document is encrypted and could not be decrypted.
    #[error("document is encrypted")]
    Encrypted,

    /// The document has no pages.
    #[error("document has no pages")]
    NoPages,
}

/// Errors scoped to a single page of the document.
///
/// A page failure empties that page's contribution from the failing
/// channel; it never aborts the run. Channels record these in
/// [`RunStats`](crate::extract::RunStats) and continue with the next page.
#[derive(Error, Debug)]
pub enum PageError {
    /// Plain text extraction failed for the page.
    #[error("page {page}: text extraction failed: {reason}")]
    Text { page: u32, reason: String },

    /// Structured layout extraction failed for the page.
    #[error("page {page}: layout extraction failed: {reason}")]
    Layout { page: u32, reason: String },

    /// The page could not be rasterized.
    #[error("page {page}: rasterization failed: {reason}")]
    Raster { page: u32, reason: String },

    /// The OCR engine failed on the page's bitmap.
    #[error("page {page}: OCR failed: {reason}")]
    Ocr { page: u32, reason: String },
}

impl PageError {
    /// The page this error is scoped to.
    pub fn page(&self) -> u32 {
        match self {
            Self::Text { page, .. }
            | Self::Layout { page, .. }
            | Self::Raster { page, .. }
            | Self::Ocr { page, .. } => *page,
        }
    }
}

/// Errors from an OCR engine implementation.
#[derive(Error, Debug)]
pub enum OcrError {
    /// The engine itself failed.
    #[error("OCR engine failure: {0}")]
    Engine(String),

    /// The input bitmap could not be handed to the engine.
    #[error("invalid image: {0}")]
    InvalidImage(String),
}

/// A regex match that could not be converted into a typed parameter.
///
/// Candidate-scoped: the match is logged, counted and skipped; extraction
/// of the remaining matches continues.
#[derive(Error, Debug)]
pub enum MatchError {
    /// The pattern produced no value capture group.
    #[error("pattern for `{kind}` has no value capture group")]
    MissingGroup { kind: String },

    /// The value capture group matched an empty string.
    #[error("empty value matched for `{kind}`")]
    EmptyValue { kind: String },

    /// A component that must be numeric failed to parse.
    #[error("cannot parse `{raw}` as a number for `{kind}`")]
    Numeric { kind: String, raw: String },
}

/// Result type for the drex library.
pub type Result<T> = std::result::Result<T, DrexError>;
