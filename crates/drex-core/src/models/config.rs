//! Configuration structures for the extraction pipeline.

use serde::{Deserialize, Serialize};

/// Main configuration for the drex pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DrexConfig {
    /// Document access configuration.
    pub document: DocumentConfig,

    /// Extraction and merge configuration.
    pub extraction: ExtractionConfig,

    /// Report formatting configuration.
    pub report: ReportConfig,
}

impl Default for DrexConfig {
    fn default() -> Self {
        Self {
            document: DocumentConfig::default(),
            extraction: ExtractionConfig::default(),
            report: ReportConfig::default(),
        }
    }
}

/// Document rasterization configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentConfig {
    /// Upscale factor applied when rasterizing a page for OCR.
    /// Values below 2.0 degrade glyph resolution noticeably.
    pub upscale_factor: f32,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            upscale_factor: 2.0,
        }
    }
}

/// Extraction and merge configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Multiplier applied to every OCR-derived confidence.
    pub ocr_confidence_discount: f32,

    /// Absolute numeric tolerance below which two same-name, same-page OCR
    /// candidates are treated as restatements of one fact.
    pub near_duplicate_tolerance: f64,

    /// Characters of surrounding text kept on each side of a match.
    pub context_window: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            ocr_confidence_discount: 0.8,
            near_duplicate_tolerance: 0.1,
            context_window: 50,
        }
    }
}

/// Report formatting configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Maximum length of the context excerpt shown per parameter.
    pub context_excerpt_len: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            context_excerpt_len: 60,
        }
    }
}

impl DrexConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;
        std::fs::write(path, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_carry_reference_constants() {
        let config = DrexConfig::default();
        assert_eq!(config.extraction.ocr_confidence_discount, 0.8);
        assert_eq!(config.extraction.near_duplicate_tolerance, 0.1);
        assert_eq!(config.document.upscale_factor, 2.0);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let config: DrexConfig =
            serde_json::from_str(r#"{"document": {"upscale_factor": 3.0}}"#).unwrap();
        assert_eq!(config.document.upscale_factor, 3.0);
        assert_eq!(config.extraction.near_duplicate_tolerance, 0.1);
    }
}
