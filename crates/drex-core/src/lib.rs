//! Core library for structural drawing parameter extraction.
//!
//! This crate provides:
//! - PDF drawing access (per-page text, line layout, raster rendering)
//! - A pattern catalog for engineering parameters (dimensions, bar
//!   diameters, spacings, material grades, loads)
//! - Two independent extraction channels: native document text and OCR of
//!   enhanced page rasters
//! - A deterministic merger reconciling both channels into one
//!   confidence-ranked parameter set, plus report rendering

pub mod document;
pub mod error;
pub mod extract;
pub mod models;
pub mod ocr;

pub use document::{DocumentKind, DrawingDocument, LayoutLine, PdfDocument, TextLayout};
pub use error::{DrexError, MatchError, OcrError, PageError, Result, SourceError};
pub use extract::{
    ChannelKind, ExtractionOutcome, ExtractionReport, OcrChannel, ParameterMerger, PatternCatalog,
    ReportBuilder, RunStats, TextChannel,
};
pub use models::config::DrexConfig;
pub use models::parameter::{
    BoundingBox, ExtractedParameter, MergedSet, ParamKey, ParameterValue,
};
pub use ocr::{ImagePreprocessor, OcrEngine};
