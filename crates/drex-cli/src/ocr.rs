//! Tesseract subprocess adapter for the core's OCR boundary.

use std::io::{Cursor, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};

use image::{DynamicImage, GrayImage, ImageFormat};
use tracing::debug;

use drex_core::error::OcrError;
use drex_core::ocr::{OcrEngine, Result};

/// OCR engine backed by the `tesseract` binary.
///
/// Each call pipes a PNG through stdin and reads the recognized text from
/// stdout; no state survives between calls. A missing binary surfaces as
/// an engine error on first use, which the OCR channel treats as a
/// page-scoped failure.
pub struct TesseractOcr {
    binary: PathBuf,
    language: String,
}

impl TesseractOcr {
    pub fn new() -> Self {
        Self {
            binary: PathBuf::from("tesseract"),
            language: "eng".to_string(),
        }
    }

    /// Use a specific tesseract binary.
    pub fn with_binary(mut self, binary: PathBuf) -> Self {
        self.binary = binary;
        self
    }

    /// Set the recognition language.
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }
}

impl Default for TesseractOcr {
    fn default() -> Self {
        Self::new()
    }
}

impl OcrEngine for TesseractOcr {
    fn recognize(&self, image: &GrayImage) -> Result<String> {
        let mut png = Vec::new();
        DynamicImage::ImageLuma8(image.clone())
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .map_err(|e| OcrError::InvalidImage(e.to_string()))?;

        let mut child = Command::new(&self.binary)
            .args(["stdin", "stdout", "-l", &self.language, "--psm", "6"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                OcrError::Engine(format!("failed to launch {}: {}", self.binary.display(), e))
            })?;

        {
            let mut stdin = child
                .stdin
                .take()
                .ok_or_else(|| OcrError::Engine("tesseract stdin unavailable".to_string()))?;
            stdin
                .write_all(&png)
                .map_err(|e| OcrError::Engine(e.to_string()))?;
        }

        let output = child
            .wait_with_output()
            .map_err(|e| OcrError::Engine(e.to_string()))?;
        if !output.status.success() {
            return Err(OcrError::Engine(format!(
                "tesseract exited with {}",
                output.status
            )));
        }

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        debug!("tesseract returned {} characters", text.len());
        Ok(text)
    }
}
