//! Dual-channel parameter extraction and reconciliation.

mod matcher;
mod merger;
mod ocr_channel;
pub mod patterns;
mod report;
mod text_channel;

pub use matcher::CatalogMatcher;
pub use merger::ParameterMerger;
pub use ocr_channel::OcrChannel;
pub use patterns::PatternCatalog;
pub use report::{ExtractionReport, ReportBuilder};
pub use text_channel::TextChannel;

use serde::Serialize;

use crate::models::parameter::{ExtractedParameter, MergedSet};

/// One of the two independent extraction paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    Text,
    Ocr,
}

/// A page whose contribution from one channel was lost.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageFailureRecord {
    pub channel: ChannelKind,
    pub page: u32,
    pub reason: String,
}

/// Per-run counters: what was dropped, and why.
///
/// One instance is threaded through both channels and the merger for the
/// lifetime of a single extraction run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunStats {
    /// Candidates produced by the text channel.
    pub text_candidates: usize,

    /// Candidates produced by the OCR channel.
    pub ocr_candidates: usize,

    /// Regex matches that could not be converted into typed parameters.
    pub match_failures: u32,

    /// Text candidates shadowed by an earlier catalog-order match for the
    /// same key.
    pub shadowed_text: u32,

    /// OCR candidates discarded because the text channel holds their key.
    pub superseded_ocr: u32,

    /// OCR candidates discarded as numeric restatements of an already
    /// admitted OCR value.
    pub near_duplicates: u32,

    /// OCR candidates discarded because an OCR value already holds their
    /// key.
    pub duplicate_keys: u32,

    /// Pages that contributed nothing from one channel.
    pub page_failures: Vec<PageFailureRecord>,
}

impl RunStats {
    pub(crate) fn record_page_failure(&mut self, channel: ChannelKind, page: u32, reason: String) {
        self.page_failures.push(PageFailureRecord {
            channel,
            page,
            reason,
        });
    }

    /// Total candidates dropped during the merge.
    pub fn dropped_candidates(&self) -> u32 {
        self.shadowed_text + self.superseded_ocr + self.near_duplicates + self.duplicate_keys
    }
}

/// Everything one extraction run produced.
///
/// The merged set is the reconciled result; the raw per-channel lists are
/// kept for export and diagnostics. The report builder consumes this
/// without altering any parameter.
#[derive(Debug, Clone)]
pub struct ExtractionOutcome {
    /// The reconciled, deduplicated parameter set.
    pub merged: MergedSet,

    /// Raw text channel candidates, in emission order.
    pub text_parameters: Vec<ExtractedParameter>,

    /// Raw OCR channel candidates, in emission order.
    pub ocr_parameters: Vec<ExtractedParameter>,

    /// Drop counters and page failures for the run.
    pub stats: RunStats,

    /// Wall-clock duration of the run in milliseconds.
    pub processing_time_ms: u64,
}

#[cfg(test)]
pub(crate) mod fixtures {
    use image::{DynamicImage, GrayImage, Luma};

    use crate::document::{DocumentKind, DrawingDocument, TextLayout};
    use crate::error::PageError;

    /// In-memory document with canned per-page content.
    pub struct FakeDocument {
        pub pages: Vec<FakePage>,
    }

    #[derive(Default)]
    pub struct FakePage {
        /// `None` simulates a text extraction failure.
        pub text: Option<String>,
        pub layout: TextLayout,
        /// `false` simulates a rasterization failure.
        pub has_raster: bool,
    }

    impl FakePage {
        pub fn with_text(text: &str) -> Self {
            Self {
                text: Some(text.to_string()),
                layout: TextLayout::default(),
                has_raster: true,
            }
        }
    }

    impl FakeDocument {
        pub fn new(pages: Vec<FakePage>) -> Self {
            Self { pages }
        }

        fn page(&self, page: u32) -> Option<&FakePage> {
            self.pages.get((page as usize).checked_sub(1)?)
        }
    }

    impl DrawingDocument for FakeDocument {
        fn page_count(&self) -> u32 {
            self.pages.len() as u32
        }

        fn page_text(&self, page: u32) -> Result<String, PageError> {
            self.page(page)
                .and_then(|p| p.text.clone())
                .ok_or_else(|| PageError::Text {
                    page,
                    reason: "simulated text failure".to_string(),
                })
        }

        fn page_layout(&self, page: u32) -> Result<TextLayout, PageError> {
            self.page(page)
                .map(|p| p.layout.clone())
                .ok_or_else(|| PageError::Layout {
                    page,
                    reason: "no such page".to_string(),
                })
        }

        fn render_page(&self, page: u32, _upscale: f32) -> Result<DynamicImage, PageError> {
            match self.page(page) {
                Some(p) if p.has_raster => {
                    // Encode the page number in the bitmap width so a fake
                    // engine can tell pages apart.
                    Ok(DynamicImage::ImageLuma8(GrayImage::from_pixel(
                        page,
                        1,
                        Luma([255]),
                    )))
                }
                _ => Err(PageError::Raster {
                    page,
                    reason: "simulated raster failure".to_string(),
                }),
            }
        }

        fn kind(&self) -> DocumentKind {
            DocumentKind::Hybrid
        }
    }

    /// An OCR engine returning canned text per page, keyed by bitmap width.
    pub fn canned_ocr(pages: Vec<&str>) -> impl Fn(&GrayImage) -> crate::ocr::Result<String> {
        let texts: Vec<String> = pages.into_iter().map(str::to_string).collect();
        move |image: &GrayImage| {
            let index = (image.width() as usize).saturating_sub(1);
            Ok(texts.get(index).cloned().unwrap_or_default())
        }
    }
}
