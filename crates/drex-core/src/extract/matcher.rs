//! Runs the pattern catalog over a page's text.

use regex::Captures;
use tracing::{trace, warn};

use super::RunStats;
use super::patterns::PatternCatalog;
use crate::error::MatchError;
use crate::models::parameter::{ExtractedParameter, ParameterValue};

/// Confidence assigned to a catalog match before any channel discount.
pub(crate) const BASE_CONFIDENCE: f32 = 0.9;

/// Converts catalog matches into typed parameters.
///
/// Emits every match of every pattern, in catalog order (kind order, then
/// pattern order, then match position). A match that cannot be converted
/// is logged, counted and skipped; it never aborts the remaining matches.
pub struct CatalogMatcher {
    context_window: usize,
}

impl CatalogMatcher {
    pub fn new(context_window: usize) -> Self {
        Self { context_window }
    }

    /// Extract every candidate parameter from one page's text.
    pub fn extract(
        &self,
        text: &str,
        page_number: u32,
        stats: &mut RunStats,
    ) -> Vec<ExtractedParameter> {
        let mut parameters = Vec::new();

        for kind in PatternCatalog::kinds() {
            for pattern in &kind.patterns {
                for caps in pattern.captures_iter(text) {
                    match self.scalar_parameter(kind.name, &caps, text, page_number) {
                        Ok(parameter) => parameters.push(parameter),
                        Err(e) => {
                            warn!("dropping candidate on page {}: {}", page_number, e);
                            stats.match_failures += 1;
                        }
                    }
                }
            }
        }

        for caps in PatternCatalog::dimensions().captures_iter(text) {
            match self.dimension_parameters(&caps, text, page_number) {
                Ok([length, width]) => {
                    parameters.push(length);
                    parameters.push(width);
                }
                Err(e) => {
                    warn!("dropping dimensions candidate on page {}: {}", page_number, e);
                    stats.match_failures += 1;
                }
            }
        }

        trace!("page {}: {} candidates", page_number, parameters.len());
        parameters
    }

    fn scalar_parameter(
        &self,
        kind: &str,
        caps: &Captures<'_>,
        text: &str,
        page_number: u32,
    ) -> Result<ExtractedParameter, MatchError> {
        let full = caps.get(0).ok_or_else(|| MatchError::MissingGroup {
            kind: kind.to_string(),
        })?;
        let group = caps.get(1).ok_or_else(|| MatchError::MissingGroup {
            kind: kind.to_string(),
        })?;
        let raw = group.as_str().trim();
        if raw.is_empty() {
            return Err(MatchError::EmptyValue {
                kind: kind.to_string(),
            });
        }

        let mut parameter = ExtractedParameter::new(
            kind,
            ParameterValue::parse(raw),
            BASE_CONFIDENCE,
            page_number,
        )
        .with_context(context_window(
            text,
            full.start(),
            full.end(),
            self.context_window,
        ));
        if let Some(unit) = caps.get(2) {
            parameter = parameter.with_unit(unit.as_str());
        }
        Ok(parameter)
    }

    /// A single `A x B <unit>` match yields two derived parameters sharing
    /// context, page and unit.
    fn dimension_parameters(
        &self,
        caps: &Captures<'_>,
        text: &str,
        page_number: u32,
    ) -> Result<[ExtractedParameter; 2], MatchError> {
        let kind = PatternCatalog::DIMENSIONS_KIND;
        let full = caps.get(0).ok_or_else(|| MatchError::MissingGroup {
            kind: kind.to_string(),
        })?;
        let length = numeric_group(caps, 1, kind)?;
        let width = numeric_group(caps, 2, kind)?;
        let unit = caps.get(3).map(|m| m.as_str());
        let context = context_window(text, full.start(), full.end(), self.context_window);

        let build = |name: &str, value: f64| {
            let mut parameter = ExtractedParameter::new(
                name,
                ParameterValue::Number(value),
                BASE_CONFIDENCE,
                page_number,
            )
            .with_context(context.clone());
            if let Some(unit) = unit {
                parameter = parameter.with_unit(unit);
            }
            parameter
        };

        Ok([
            build("dimensions_length", length),
            build("dimensions_width", width),
        ])
    }
}

fn numeric_group(caps: &Captures<'_>, index: usize, kind: &str) -> Result<f64, MatchError> {
    let raw = caps
        .get(index)
        .ok_or_else(|| MatchError::MissingGroup {
            kind: kind.to_string(),
        })?
        .as_str();
    raw.trim().parse().map_err(|_| MatchError::Numeric {
        kind: kind.to_string(),
        raw: raw.to_string(),
    })
}

/// Slice a char-boundary-safe window of text around a match.
pub(crate) fn context_window(text: &str, start: usize, end: usize, window: usize) -> String {
    let mut from = start.saturating_sub(window);
    while from > 0 && !text.is_char_boundary(from) {
        from -= 1;
    }
    let mut to = (end + window).min(text.len());
    while to < text.len() && !text.is_char_boundary(to) {
        to += 1;
    }
    text[from..to].trim().to_string()
}
