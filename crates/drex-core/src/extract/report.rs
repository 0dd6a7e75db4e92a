//! Report rendering for a completed extraction run.

use chrono::Utc;
use serde::Serialize;
use std::collections::BTreeMap;

use super::{ExtractionOutcome, RunStats};
use crate::models::config::ReportConfig;
use crate::models::parameter::{ExtractedParameter, MergedSet};

/// Serializable record of one extraction run, suitable for export.
///
/// Carries the raw per-channel lists alongside the merged set so a
/// consumer can audit what each channel saw. Absent `unit`/`coordinates`
/// fields serialize as explicit nulls.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionReport {
    /// Path or label of the source document.
    pub source: String,

    /// ISO-8601 timestamp of report generation.
    pub generated_at: String,

    /// The reconciled parameter set, keyed `{name}_p{page}`.
    pub merged: MergedSet,

    /// Raw text channel candidates.
    pub text_parameters: Vec<ExtractedParameter>,

    /// Raw OCR channel candidates.
    pub ocr_parameters: Vec<ExtractedParameter>,

    /// Drop counters and page failures.
    pub stats: RunStats,
}

/// Renders an [`ExtractionOutcome`] without altering any parameter.
pub struct ReportBuilder {
    excerpt_len: usize,
}

impl ReportBuilder {
    pub fn new(config: &ReportConfig) -> Self {
        Self {
            excerpt_len: config.context_excerpt_len,
        }
    }

    /// Build the serializable export record.
    pub fn record(&self, source: impl Into<String>, outcome: &ExtractionOutcome) -> ExtractionReport {
        ExtractionReport {
            source: source.into(),
            generated_at: Utc::now().to_rfc3339(),
            merged: outcome.merged.clone(),
            text_parameters: outcome.text_parameters.clone(),
            ocr_parameters: outcome.ocr_parameters.clone(),
            stats: outcome.stats.clone(),
        }
    }

    /// Render the merged set as a grouped plain-text report.
    ///
    /// Parameters group by the name prefix before the first `_`, so
    /// `dimensions_length` and `dimensions_width` land in one section.
    pub fn plain_text(&self, outcome: &ExtractionOutcome) -> String {
        let mut groups: BTreeMap<&str, Vec<&ExtractedParameter>> = BTreeMap::new();
        for parameter in outcome.merged.parameters() {
            groups.entry(group_key(&parameter.name)).or_default().push(parameter);
        }

        let mut output = String::new();
        output.push_str("EXTRACTED DRAWING PARAMETERS\n");
        output.push_str("============================\n");

        if groups.is_empty() {
            output.push_str("\nNo parameters extracted.\n");
        }

        for (group, parameters) in &groups {
            output.push_str(&format!("\n{}\n", group.to_uppercase()));
            for p in parameters {
                let unit = p.unit.as_deref().unwrap_or("");
                output.push_str(&format!(
                    "  {}: {} {} (page {}, confidence {:.2})\n",
                    p.name, p.value, unit, p.page_number, p.confidence
                ));
                if !p.context.is_empty() {
                    output.push_str(&format!(
                        "    context: {}\n",
                        excerpt(&p.context, self.excerpt_len)
                    ));
                }
            }
        }

        let stats = &outcome.stats;
        output.push_str(&format!(
            "\n{} parameters from {} text and {} OCR candidates\n",
            outcome.merged.len(),
            stats.text_candidates,
            stats.ocr_candidates
        ));
        output.push_str(&format!(
            "{} candidates dropped ({} superseded by text, {} near-duplicates, {} duplicate keys, {} shadowed)\n",
            stats.dropped_candidates(),
            stats.superseded_ocr,
            stats.near_duplicates,
            stats.duplicate_keys,
            stats.shadowed_text
        ));
        if !stats.page_failures.is_empty() {
            output.push_str(&format!("{} page failures:\n", stats.page_failures.len()));
            for failure in &stats.page_failures {
                output.push_str(&format!(
                    "  page {} ({:?}): {}\n",
                    failure.page, failure.channel, failure.reason
                ));
            }
        }

        output
    }
}

impl Default for ReportBuilder {
    fn default() -> Self {
        Self::new(&ReportConfig::default())
    }
}

/// Group label: the name prefix before the first separator.
fn group_key(name: &str) -> &str {
    name.split('_').next().unwrap_or(name)
}

/// Char-boundary-safe truncation of a context excerpt.
fn excerpt(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut truncated: String = text.chars().take(max_chars).collect();
    truncated.push_str("...");
    truncated
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::parameter::{MergedSet, ParamKey, ParameterValue};

    fn outcome_with(parameters: Vec<ExtractedParameter>) -> ExtractionOutcome {
        let mut merged = MergedSet::new();
        for p in &parameters {
            merged.insert(p.key(), p.clone());
        }
        ExtractionOutcome {
            merged,
            text_parameters: parameters,
            ocr_parameters: Vec::new(),
            stats: RunStats::default(),
            processing_time_ms: 0,
        }
    }

    #[test]
    fn dimensions_share_one_group() {
        let outcome = outcome_with(vec![
            ExtractedParameter::new(
                "dimensions_length",
                ParameterValue::Number(300.0),
                0.9,
                1,
            )
            .with_unit("mm"),
            ExtractedParameter::new(
                "dimensions_width",
                ParameterValue::Number(500.0),
                0.9,
                1,
            )
            .with_unit("mm"),
        ]);

        let report = ReportBuilder::default().plain_text(&outcome);
        assert_eq!(report.matches("DIMENSIONS").count(), 1);
        assert!(report.contains("dimensions_length: 300 mm"));
        assert!(report.contains("dimensions_width: 500 mm"));
    }

    #[test]
    fn confidence_renders_with_two_decimals() {
        let outcome = outcome_with(vec![
            ExtractedParameter::new("spacing", ParameterValue::Number(150.0), 0.72, 2)
                .with_unit("mm"),
        ]);

        let report = ReportBuilder::default().plain_text(&outcome);
        assert!(report.contains("confidence 0.72"));
        assert!(report.contains("page 2"));
    }

    #[test]
    fn long_context_is_truncated() {
        let long_context = "x".repeat(200);
        let outcome = outcome_with(vec![
            ExtractedParameter::new("cover", ParameterValue::Number(25.0), 0.9, 1)
                .with_context(long_context),
        ]);

        let report = ReportBuilder::new(&ReportConfig {
            context_excerpt_len: 60,
        })
        .plain_text(&outcome);

        let context_line = report
            .lines()
            .find(|l| l.trim_start().starts_with("context:"))
            .unwrap();
        assert!(context_line.len() < 80);
        assert!(context_line.ends_with("..."));
    }

    #[test]
    fn record_names_every_field() {
        let outcome = outcome_with(vec![ExtractedParameter::new(
            "steel_grade",
            ParameterValue::Text("Fe415".to_string()),
            0.9,
            1,
        )]);

        let record = ReportBuilder::default().record("plan.pdf", &outcome);
        let json = serde_json::to_value(&record).unwrap();

        let parameter = &json["merged"]["steel_grade_p1"];
        for field in [
            "name",
            "value",
            "unit",
            "context",
            "confidence",
            "page_number",
            "coordinates",
        ] {
            assert!(
                parameter.get(field).is_some(),
                "missing field `{}`",
                field
            );
        }
        assert_eq!(parameter["unit"], serde_json::Value::Null);
        assert_eq!(json["source"], serde_json::json!("plan.pdf"));
        assert!(json["stats"].get("page_failures").is_some());
    }

    #[test]
    fn formatting_does_not_alter_parameters() {
        let outcome = outcome_with(vec![
            ExtractedParameter::new("span", ParameterValue::Number(4.5), 0.9, 1).with_unit("m"),
        ]);
        let before = outcome.merged.clone();

        let _ = ReportBuilder::default().plain_text(&outcome);
        let _ = ReportBuilder::default().record("plan.pdf", &outcome);

        assert_eq!(outcome.merged, before);
    }
}
