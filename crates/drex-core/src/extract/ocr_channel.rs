//! Extraction channel over OCR of rasterized pages.

use tracing::{debug, warn};

use super::matcher::CatalogMatcher;
use super::{ChannelKind, RunStats};
use crate::document::DrawingDocument;
use crate::models::config::DrexConfig;
use crate::models::parameter::ExtractedParameter;
use crate::ocr::{ImagePreprocessor, OcrEngine};

/// Rasterizes each page, enhances the bitmap, runs the OCR engine and the
/// catalog, then discounts every confidence uniformly.
///
/// No coordinate recovery is attempted: raster-space coordinates are not
/// comparable to page-space layout boxes without a reverse transform.
pub struct OcrChannel {
    matcher: CatalogMatcher,
    preprocessor: ImagePreprocessor,
    upscale_factor: f32,
    confidence_discount: f32,
}

impl OcrChannel {
    pub fn new(config: &DrexConfig) -> Self {
        Self {
            matcher: CatalogMatcher::new(config.extraction.context_window),
            preprocessor: ImagePreprocessor::new(),
            upscale_factor: config.document.upscale_factor,
            confidence_discount: config.extraction.ocr_confidence_discount,
        }
    }

    /// Extract candidates from every page. Rasterization or OCR failure is
    /// page-scoped: it is recorded and the run continues.
    pub fn extract<D: DrawingDocument, E: OcrEngine>(
        &self,
        document: &D,
        engine: &E,
        stats: &mut RunStats,
    ) -> Vec<ExtractedParameter> {
        let mut parameters = Vec::new();

        for page in 1..=document.page_count() {
            let rendered = match document.render_page(page, self.upscale_factor) {
                Ok(image) => image,
                Err(e) => {
                    warn!("OCR channel skipping page {}: {}", page, e);
                    stats.record_page_failure(ChannelKind::Ocr, page, e.to_string());
                    continue;
                }
            };

            let processed = self.preprocessor.enhance(&rendered);
            let text = match engine.recognize(&processed) {
                Ok(text) => text,
                Err(e) => {
                    warn!("OCR channel skipping page {}: {}", page, e);
                    stats.record_page_failure(ChannelKind::Ocr, page, e.to_string());
                    continue;
                }
            };

            let page_parameters = self.matcher.extract(&text, page, stats);
            debug!(
                "OCR channel: {} candidates on page {}",
                page_parameters.len(),
                page
            );

            parameters.extend(
                page_parameters
                    .into_iter()
                    .map(|parameter| parameter.discounted(self.confidence_discount)),
            );
        }

        parameters
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::fixtures::{FakeDocument, FakePage, canned_ocr};
    use crate::models::parameter::ParameterValue;
    use pretty_assertions::assert_eq;

    #[test]
    fn discount_is_exact_and_uniform() {
        let document = FakeDocument::new(vec![FakePage::with_text("")]);
        let engine = canned_ocr(vec!["thickness: 150 mm, 300 x 500 mm"]);
        let mut stats = RunStats::default();
        let parameters =
            OcrChannel::new(&DrexConfig::default()).extract(&document, &engine, &mut stats);

        assert_eq!(parameters.len(), 3);
        for p in &parameters {
            assert_eq!(p.confidence, 0.9 * 0.8);
            assert!((0.0..=1.0).contains(&p.confidence));
        }
    }

    #[test]
    fn no_coordinates_are_attached() {
        let document = FakeDocument::new(vec![FakePage::with_text("")]);
        let engine = canned_ocr(vec!["spacing: 150 mm"]);
        let mut stats = RunStats::default();
        let parameters =
            OcrChannel::new(&DrexConfig::default()).extract(&document, &engine, &mut stats);

        assert_eq!(parameters.len(), 1);
        assert_eq!(parameters[0].coordinates, None);
        assert_eq!(parameters[0].value, ParameterValue::Number(150.0));
    }

    #[test]
    fn raster_failure_is_page_scoped() {
        let failing = FakePage {
            text: Some(String::new()),
            has_raster: false,
            ..FakePage::default()
        };
        let document = FakeDocument::new(vec![failing, FakePage::with_text("")]);
        let engine = canned_ocr(vec!["ignored", "cover: 25 mm"]);
        let mut stats = RunStats::default();
        let parameters =
            OcrChannel::new(&DrexConfig::default()).extract(&document, &engine, &mut stats);

        assert_eq!(parameters.len(), 1);
        assert_eq!(parameters[0].page_number, 2);
        assert_eq!(stats.page_failures.len(), 1);
        assert_eq!(stats.page_failures[0].channel, ChannelKind::Ocr);
        assert_eq!(stats.page_failures[0].page, 1);
    }

    #[test]
    fn engine_failure_is_page_scoped() {
        let document = FakeDocument::new(vec![
            FakePage::with_text(""),
            FakePage::with_text(""),
        ]);
        let engine = |image: &image::GrayImage| {
            if image.width() == 1 {
                Err(crate::error::OcrError::Engine("glyph soup".to_string()))
            } else {
                Ok("span: 6.0 m".to_string())
            }
        };
        let mut stats = RunStats::default();
        let parameters =
            OcrChannel::new(&DrexConfig::default()).extract(&document, &engine, &mut stats);

        assert_eq!(parameters.len(), 1);
        assert_eq!(parameters[0].page_number, 2);
        assert_eq!(stats.page_failures.len(), 1);
    }
}
