//! Merges the two channels' candidate lists into one parameter set.

use std::time::Instant;

use tracing::{debug, info};

use super::ocr_channel::OcrChannel;
use super::text_channel::TextChannel;
use super::{ExtractionOutcome, RunStats};
use crate::document::DrawingDocument;
use crate::models::config::DrexConfig;
use crate::models::parameter::{ExtractedParameter, MergedSet, ParamKey};
use crate::ocr::OcrEngine;

/// Orchestrates the two extraction channels and folds their output.
///
/// This is an evidence-reconciliation policy, not statistical fusion: ties
/// are broken deterministically by source priority (text over OCR) and by
/// list order, never by comparing confidence values. The output is the
/// same for the same two input lists regardless of how the channels were
/// scheduled, so callers are free to run them concurrently.
pub struct ParameterMerger {
    config: DrexConfig,
}

impl ParameterMerger {
    pub fn new(config: DrexConfig) -> Self {
        Self { config }
    }

    /// Run both channels over the document and merge their output.
    pub fn extract<D: DrawingDocument, E: OcrEngine>(
        &self,
        document: &D,
        engine: &E,
    ) -> ExtractionOutcome {
        let start = Instant::now();
        let mut stats = RunStats::default();

        let text_parameters =
            TextChannel::new(&self.config.extraction).extract(document, &mut stats);
        let ocr_parameters = OcrChannel::new(&self.config).extract(document, engine, &mut stats);

        self.finish(start, text_parameters, ocr_parameters, stats)
    }

    /// Run only the text channel (no OCR engine available or wanted).
    pub fn extract_text_only<D: DrawingDocument>(&self, document: &D) -> ExtractionOutcome {
        let start = Instant::now();
        let mut stats = RunStats::default();

        let text_parameters =
            TextChannel::new(&self.config.extraction).extract(document, &mut stats);

        self.finish(start, text_parameters, Vec::new(), stats)
    }

    fn finish(
        &self,
        start: Instant,
        text_parameters: Vec<ExtractedParameter>,
        ocr_parameters: Vec<ExtractedParameter>,
        mut stats: RunStats,
    ) -> ExtractionOutcome {
        stats.text_candidates = text_parameters.len();
        stats.ocr_candidates = ocr_parameters.len();

        let merged = self.merge(&text_parameters, &ocr_parameters, &mut stats);
        info!(
            "merged {} parameters from {} text and {} OCR candidates ({} dropped)",
            merged.len(),
            stats.text_candidates,
            stats.ocr_candidates,
            stats.dropped_candidates()
        );

        ExtractionOutcome {
            merged,
            text_parameters,
            ocr_parameters,
            stats,
            processing_time_ms: start.elapsed().as_millis() as u64,
        }
    }

    /// Fold the two candidate lists into a [`MergedSet`].
    ///
    /// Text evidence seeds the set and is never displaced by OCR evidence,
    /// regardless of confidence values. An OCR candidate whose key is free
    /// is first checked against the OCR values already admitted for the
    /// same name and page: a numeric difference below the tolerance is a
    /// restatement of the same fact and is discarded instead of becoming a
    /// second entry. Non-numeric values are deduplicated purely by key.
    ///
    /// Known limitation, kept from the reference behavior: the tolerance
    /// is absolute and unit-unaware, so it is applied even when the two
    /// candidates carry different units.
    pub fn merge(
        &self,
        text_parameters: &[ExtractedParameter],
        ocr_parameters: &[ExtractedParameter],
        stats: &mut RunStats,
    ) -> MergedSet {
        let tolerance = self.config.extraction.near_duplicate_tolerance;
        let mut merged = MergedSet::new();
        let mut text_keys: Vec<ParamKey> = Vec::new();

        for parameter in text_parameters {
            let key = parameter.key();
            if merged.contains_key(&key) {
                // First match wins by catalog order.
                stats.shadowed_text += 1;
                continue;
            }
            text_keys.push(key.clone());
            merged.insert(key, parameter.clone());
        }

        let mut ocr_admitted: Vec<(ParamKey, Option<f64>)> = Vec::new();
        for parameter in ocr_parameters {
            let key = parameter.key();

            if text_keys.contains(&key) {
                debug!("text channel wins key {}", key);
                stats.superseded_ocr += 1;
                continue;
            }

            if let Some(value) = parameter.value.as_number() {
                let restated = ocr_admitted.iter().any(|(admitted_key, admitted)| {
                    admitted_key.name == key.name
                        && admitted_key.page == key.page
                        && admitted.is_some_and(|a| (a - value).abs() < tolerance)
                });
                if restated {
                    debug!("near-duplicate OCR restatement of {} dropped", key);
                    stats.near_duplicates += 1;
                    continue;
                }
            }

            if merged.contains_key(&key) {
                stats.duplicate_keys += 1;
                continue;
            }

            ocr_admitted.push((key.clone(), parameter.value.as_number()));
            merged.insert(key, parameter.clone());
        }

        merged
    }
}

impl Default for ParameterMerger {
    fn default() -> Self {
        Self::new(DrexConfig::default())
    }
}
