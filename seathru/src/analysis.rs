//! Summary statistics of an image, reported before and after restoration.

use serde::Serialize;

use crate::image::RgbImage;

/// Global brightness, contrast and red content of an image, in [0, 1] units.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ImageStats {
    /// Mean of the per-pixel HSV value `max(r, g, b)`.
    pub brightness: f64,
    /// Population standard deviation over every channel sample.
    pub contrast: f64,
    /// Mean red intensity.
    pub mean_red: f64,
}

impl ImageStats {
    /// Statistics of `image`; all zero for an empty image.
    pub fn compute(image: &RgbImage) -> Self {
        if image.is_empty() {
            return Self::default();
        }

        let pixel_count = image.len() as f64;
        let sample_count = pixel_count * 3.0;

        let mut value_sum = 0.0f64;
        let mut red_sum = 0.0f64;
        let mut sum = 0.0f64;
        for px in image.iter() {
            value_sum += px.max_element() as f64;
            red_sum += px.x as f64;
            sum += px.element_sum() as f64;
        }
        let mean = sum / sample_count;

        // Second pass for a stable variance.
        let squared: f64 = image
            .iter()
            .flat_map(|px| px.to_array())
            .map(|v| {
                let dv = v as f64 - mean;
                dv * dv
            })
            .sum();

        Self {
            brightness: value_sum / pixel_count,
            contrast: (squared / sample_count).sqrt(),
            mean_red: red_sum / pixel_count,
        }
    }
}
