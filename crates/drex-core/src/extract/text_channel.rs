//! Extraction channel over the document's native text.

use tracing::{debug, warn};

use super::matcher::CatalogMatcher;
use super::{ChannelKind, RunStats};
use crate::document::{DrawingDocument, TextLayout};
use crate::models::config::ExtractionConfig;
use crate::models::parameter::{BoundingBox, ExtractedParameter};

/// Runs the catalog over each page's extractable text and attempts
/// best-effort coordinate recovery against the page's line layout.
pub struct TextChannel {
    matcher: CatalogMatcher,
}

impl TextChannel {
    pub fn new(config: &ExtractionConfig) -> Self {
        Self {
            matcher: CatalogMatcher::new(config.context_window),
        }
    }

    /// Extract candidates from every page. A page whose text or layout
    /// cannot be read contributes nothing from this channel; the run
    /// continues with the next page.
    pub fn extract<D: DrawingDocument>(
        &self,
        document: &D,
        stats: &mut RunStats,
    ) -> Vec<ExtractedParameter> {
        let mut parameters = Vec::new();

        for page in 1..=document.page_count() {
            let text = match document.page_text(page) {
                Ok(text) => text,
                Err(e) => {
                    warn!("text channel skipping page {}: {}", page, e);
                    stats.record_page_failure(ChannelKind::Text, page, e.to_string());
                    continue;
                }
            };
            let layout = match document.page_layout(page) {
                Ok(layout) => layout,
                Err(e) => {
                    warn!("text channel skipping page {}: {}", page, e);
                    stats.record_page_failure(ChannelKind::Text, page, e.to_string());
                    continue;
                }
            };

            let page_parameters = self.matcher.extract(&text, page, stats);
            debug!(
                "text channel: {} candidates on page {}",
                page_parameters.len(),
                page
            );

            parameters.extend(page_parameters.into_iter().map(|parameter| {
                match recover_coordinates(&parameter.context, &layout) {
                    Some(bbox) => parameter.with_coordinates(bbox),
                    None => parameter,
                }
            }));
        }

        parameters
    }
}

/// Best-effort coordinate recovery: the first layout line whose lowercase
/// text contains any of the first three words of the parameter's context.
/// A miss simply leaves the coordinates absent.
fn recover_coordinates(context: &str, layout: &TextLayout) -> Option<BoundingBox> {
    let words: Vec<String> = context
        .split_whitespace()
        .take(3)
        .map(|w| w.to_lowercase())
        .collect();
    if words.is_empty() {
        return None;
    }

    layout
        .lines
        .iter()
        .find(|line| {
            let line_text = line.text.to_lowercase();
            words.iter().any(|word| line_text.contains(word.as_str()))
        })
        .map(|line| line.bbox)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::LayoutLine;
    use crate::extract::fixtures::{FakeDocument, FakePage};
    use crate::models::parameter::ParameterValue;
    use pretty_assertions::assert_eq;

    fn layout_with(lines: &[(&str, f32, f32)]) -> TextLayout {
        TextLayout {
            lines: lines
                .iter()
                .map(|(text, x, y)| LayoutLine {
                    text: text.to_string(),
                    bbox: BoundingBox::new(*x, *y, *x + 100.0, *y + 12.0),
                })
                .collect(),
        }
    }

    #[test]
    fn extracts_with_page_numbers() {
        let document = FakeDocument::new(vec![
            FakePage::with_text("thickness: 150 mm"),
            FakePage::with_text("spacing: 200 mm"),
        ]);
        let mut stats = RunStats::default();
        let parameters =
            TextChannel::new(&ExtractionConfig::default()).extract(&document, &mut stats);

        assert_eq!(parameters.len(), 2);
        assert_eq!(parameters[0].name, "thickness");
        assert_eq!(parameters[0].page_number, 1);
        assert_eq!(parameters[1].name, "spacing");
        assert_eq!(parameters[1].page_number, 2);
        assert_eq!(parameters[0].confidence, 0.9);
    }

    #[test]
    fn recovers_coordinates_from_layout() {
        let mut page = FakePage::with_text("thickness: 150 mm");
        page.layout = layout_with(&[
            ("general notes", 72.0, 740.0),
            ("thickness: 150 mm", 72.0, 720.0),
        ]);
        let document = FakeDocument::new(vec![page]);
        let mut stats = RunStats::default();
        let parameters =
            TextChannel::new(&ExtractionConfig::default()).extract(&document, &mut stats);

        let bbox = parameters[0].coordinates.expect("coordinates recovered");
        assert_eq!(bbox.y1, 720.0);
    }

    #[test]
    fn coordinate_miss_leaves_field_absent() {
        let mut page = FakePage::with_text("thickness: 150 mm");
        page.layout = layout_with(&[("unrelated title block", 10.0, 10.0)]);
        let document = FakeDocument::new(vec![page]);
        let mut stats = RunStats::default();
        let parameters =
            TextChannel::new(&ExtractionConfig::default()).extract(&document, &mut stats);

        assert_eq!(parameters.len(), 1);
        assert_eq!(parameters[0].coordinates, None);
    }

    #[test]
    fn page_failure_skips_only_that_page() {
        let failing = FakePage {
            text: None,
            ..FakePage::default()
        };
        let document = FakeDocument::new(vec![failing, FakePage::with_text("cover: 25 mm")]);
        let mut stats = RunStats::default();
        let parameters =
            TextChannel::new(&ExtractionConfig::default()).extract(&document, &mut stats);

        assert_eq!(parameters.len(), 1);
        assert_eq!(parameters[0].page_number, 2);
        assert_eq!(parameters[0].value, ParameterValue::Number(25.0));
        assert_eq!(stats.page_failures.len(), 1);
        assert_eq!(stats.page_failures[0].page, 1);
        assert_eq!(stats.page_failures[0].channel, ChannelKind::Text);
    }
}
