//! Image enhancement for OCR of rasterized drawing pages.

use image::{DynamicImage, GrayImage, Luma};
use imageproc::distance_transform::Norm;
use imageproc::morphology::{close, dilate, open};
use tracing::debug;

/// Enhancement pipeline applied to a page raster before OCR.
///
/// The steps run in a fixed order, each on the previous step's output:
/// grayscale conversion, adaptive thresholding against locally varying
/// illumination, a morphological close then open to remove speckle noise,
/// and a light dilation to reconnect thinned strokes.
pub struct ImagePreprocessor {
    /// Side length of the local-mean window for adaptive thresholding.
    block_size: u32,
    /// Constant subtracted from the local mean.
    threshold_offset: i32,
    /// Structuring element radius for the morphological steps.
    kernel_radius: u8,
}

impl ImagePreprocessor {
    /// Create a preprocessor with default settings.
    pub fn new() -> Self {
        Self {
            block_size: 15,
            threshold_offset: 5,
            kernel_radius: 1,
        }
    }

    /// Set the adaptive threshold window size.
    pub fn with_block_size(mut self, size: u32) -> Self {
        self.block_size = size;
        self
    }

    /// Run the full enhancement pipeline.
    pub fn enhance(&self, image: &DynamicImage) -> GrayImage {
        let gray = image.to_luma8();
        let binary = self.adaptive_threshold(&gray);
        let despeckled = open(&close(&binary, Norm::LInf, self.kernel_radius), Norm::LInf, self.kernel_radius);
        let reconnected = dilate(&despeckled, Norm::LInf, self.kernel_radius);
        debug!(
            "enhanced {}x{} raster for OCR",
            reconnected.width(),
            reconnected.height()
        );
        reconnected
    }

    /// Binarize against the local mean of a `block_size` window.
    fn adaptive_threshold(&self, image: &GrayImage) -> GrayImage {
        let (width, height) = image.dimensions();
        let mut result = GrayImage::new(width, height);
        let half_block = self.block_size / 2;

        for y in 0..height {
            for x in 0..width {
                let mut sum = 0u32;
                let mut count = 0u32;

                let y_start = y.saturating_sub(half_block);
                let y_end = (y + half_block + 1).min(height);
                let x_start = x.saturating_sub(half_block);
                let x_end = (x + half_block + 1).min(width);

                for ly in y_start..y_end {
                    for lx in x_start..x_end {
                        sum += image.get_pixel(lx, ly)[0] as u32;
                        count += 1;
                    }
                }

                let threshold = (sum / count) as i32 - self.threshold_offset;
                let value = if (image.get_pixel(x, y)[0] as i32) > threshold {
                    255
                } else {
                    0
                };
                result.put_pixel(x, y, Luma([value]));
            }
        }

        result
    }
}

impl Default for ImagePreprocessor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_output_is_binary() {
        let gradient = GrayImage::from_fn(16, 16, |x, y| Luma([((x + y) * 8) as u8]));
        let preprocessor = ImagePreprocessor::new();
        let binary = preprocessor.adaptive_threshold(&gradient);

        assert!(binary.pixels().all(|p| p[0] == 0 || p[0] == 255));
    }

    #[test]
    fn uniform_background_stays_white() {
        let white = GrayImage::from_pixel(12, 12, Luma([255]));
        let preprocessor = ImagePreprocessor::new();
        let binary = preprocessor.adaptive_threshold(&white);

        assert!(binary.pixels().all(|p| p[0] == 255));
    }

    #[test]
    fn enhance_preserves_dimensions() {
        let image = DynamicImage::ImageLuma8(GrayImage::from_pixel(24, 18, Luma([200])));
        let enhanced = ImagePreprocessor::new().enhance(&image);

        assert_eq!(enhanced.dimensions(), (24, 18));
    }
}
